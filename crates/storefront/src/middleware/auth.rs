//! Authentication extractors.
//!
//! Login itself is handled by the external accounts service, which writes a
//! [`CurrentUser`] into the shared session. These extractors only read it and,
//! for customer pages, check the cached customers-group capability.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Login page of the external accounts service.
pub const LOGIN_PATH: &str = "/accounts/login";

/// Extractor that requires an authenticated user.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when a request lacks the required identity or capability.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests), carrying the return path.
    RedirectToLogin(String),
    /// Unauthorized response (for API requests and missing sessions).
    Unauthorized,
    /// Logged in, but not a member of the customers group.
    Forbidden,
    /// Capability lookup failed.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => {
                let next: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
                Redirect::to(&format!("{LOGIN_PATH}?next={next}")).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "This area is only available to customers",
            )
                .into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

async fn current_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .ok_or_else(|| {
            if parts.uri.path().starts_with("/api/") {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin(parts.uri.path().to_string())
            }
        })?;

    set_sentry_user(&user.id, &user.username);
    Ok(user)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).await.map(Self)
    }
}

/// Extractor for customer-only pages: an authenticated user holding the
/// customers-group capability.
pub struct RequireCustomer(pub CurrentUser);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;

        let allowed = state
            .capabilities()
            .is_customer(&state.groups(), user.id)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, "Capability lookup failed: {e}");
                AuthRejection::Unavailable
            })?;

        if !allowed {
            tracing::info!(user_id = %user.id, "Customer capability missing");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// Used by the accounts service integration and by tests.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;
    use crate::services::fakes::test_session;
    use photostock_core::UserId;

    #[test]
    fn login_redirect_carries_encoded_return_path() {
        let response = AuthRejection::RedirectToLogin("/customers/profile".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "/accounts/login?next=%2Fcustomers%2Fprofile"
        );
    }

    #[test]
    fn forbidden_is_403() {
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn current_user_is_read_from_session() {
        let session = test_session();
        set_current_user(
            &session,
            &CurrentUser {
                id: UserId::new(9),
                username: "mei".to_string(),
            },
        )
        .await
        .unwrap();

        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/customers/profile")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(session);

        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new(9));
    }

    #[tokio::test]
    async fn anonymous_html_request_redirects() {
        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/customers/downloads")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(test_session());

        let rejection = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::RedirectToLogin(ref p) if p == "/customers/downloads"));
    }
}
