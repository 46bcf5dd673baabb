//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::payments::PaymentError;
use crate::services::{
    CartError, CheckoutError, FavouriteError, FulfillmentError, ProfileError,
};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payment provider call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Session store could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated but not allowed (missing capability, token mismatch).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) | Self::Payment(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Payment(_) => "Payment provider unavailable, please try again".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::PhotoNotFound(id) => Self::NotFound(format!("photo {id}")),
            CartError::Catalog(e) => Self::Database(e),
            CartError::Session(e) => Self::Session(e),
        }
    }
}

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Storage(e) => Self::Database(e),
            FulfillmentError::UnknownCheckout => Self::NotFound("checkout".to_string()),
            FulfillmentError::Closed(state) => {
                Self::Forbidden(format!("checkout is {state}"))
            }
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::BadRequest("cart is empty".to_string()),
            CheckoutError::UnknownPhoto(id) => Self::BadRequest(format!("photo {id} unavailable")),
            CheckoutError::NoCheckoutInProgress
            | CheckoutError::TokenMismatch
            | CheckoutError::Superseded => Self::Forbidden(err.to_string()),
            CheckoutError::InvalidTransition(e) => Self::Forbidden(e.to_string()),
            CheckoutError::Pricing(e) => Self::Internal(e.to_string()),
            CheckoutError::Payment(e) => Self::Payment(e),
            CheckoutError::Fulfillment(e) => e.into(),
            CheckoutError::Storage(e) => Self::Database(e),
            CheckoutError::Session(e) => Self::Session(e),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NoProfile => Self::NotFound("customer profile".to_string()),
            ProfileError::Storage(e) => Self::Database(e),
        }
    }
}

impl From<FavouriteError> for AppError {
    fn from(err: FavouriteError) -> Self {
        match err {
            FavouriteError::PhotoNotFound(id) => Self::NotFound(format!("photo {id}")),
            FavouriteError::Storage(e) => Self::Database(e),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
///
/// Called by the auth extractor so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}
