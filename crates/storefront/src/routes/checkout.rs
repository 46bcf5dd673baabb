//! Checkout route handlers.
//!
//! `POST /checkout` hands the cart to the payment provider; the provider sends
//! the browser back to `/checkout/success` or `/checkout/cancel` with the
//! correlation token in the query string.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use photostock_core::{CurrencyCode, Price};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::{FlashLevel, FlashMessage, LineItem, flash};
use crate::services::checkout as checkout_service;
use crate::services::{CancelOutcome, CheckoutError, ProfileStore};
use crate::state::AppState;

/// Line shown on the hand-off and receipt pages.
#[derive(Clone)]
pub struct LineItemView {
    pub name: String,
    pub size: String,
    pub amount: String,
}

fn line_views(items: &[LineItem]) -> Vec<LineItemView> {
    items
        .iter()
        .map(|item| LineItemView {
            name: item.name.clone(),
            size: item.size.label().to_string(),
            amount: format_minor(item.unit_amount, item.currency),
        })
        .collect()
}

fn format_minor(amount: i64, currency: CurrencyCode) -> String {
    Price::new(Decimal::new(amount, 2), currency).to_string()
}

/// Hand-off page: carries what the browser needs to reach the hosted checkout.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/start.html")]
pub struct CheckoutStartTemplate {
    pub provider_session_id: String,
    pub publishable_key: String,
    pub redirect_url: String,
    pub items: Vec<LineItemView>,
    pub total: String,
    pub flash: Vec<FlashMessage>,
}

/// Receipt page after a verified return.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub items: Vec<LineItemView>,
    pub flash: Vec<FlashMessage>,
}

/// Query string on the provider's return URLs.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Start a checkout for the current cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn start(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
) -> Result<Response> {
    let Some(profile) = state.customers().find_by_user(user.id).await? else {
        flash::error(&session, "Please create your customer profile before checking out.").await;
        return Ok(Redirect::to("/customers/profile/create").into_response());
    };

    let started = match checkout_service::start(
        &state.checkouts(),
        &state.photos(),
        state.stripe(),
        &session,
        profile.id,
        &state.checkout_urls(),
    )
    .await
    {
        Ok(started) => started,
        Err(CheckoutError::EmptyCart) => {
            flash::error(&session, "Your cart is empty.").await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(CheckoutError::UnknownPhoto(id)) => {
            warn!(photo_id = %id, "Checkout blocked by unavailable photo");
            flash::error(
                &session,
                "A photo in your cart is no longer available. Please remove it and try again.",
            )
            .await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let currency = state.config().stripe.currency;
    Ok(CheckoutStartTemplate {
        items: line_views(&started.session.line_items),
        total: format_minor(started.session.total_minor_units(), currency),
        provider_session_id: started.session.provider_session_id,
        publishable_key: state.config().stripe.publishable_key.clone(),
        redirect_url: started.redirect_url,
        flash: flash::take(&session).await,
    }
    .into_response())
}

/// Provider success return: verify the token, fulfil, clear the cart.
#[instrument(skip_all)]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<TokenQuery>,
) -> Result<Response> {
    // Recorded here or already recorded by the webhook: same receipt either way
    let completed =
        match checkout_service::complete(&state.checkouts(), &session, query.token.as_deref())
            .await
        {
            Ok(completed) => completed,
            Err(CheckoutError::Superseded) => {
                flash::push(
                    &session,
                    FlashLevel::Info,
                    "We are confirming the payment for your earlier checkout. \
                     Your photos will appear in your downloads shortly.",
                )
                .await;
                return Ok(Redirect::to("/customers/downloads").into_response());
            }
            Err(e) => return Err(e.into()),
        };

    flash::success(&session, "Thank you! Your photos are ready in your downloads.").await;

    Ok(CheckoutSuccessTemplate {
        items: line_views(&completed.line_items),
        flash: flash::take(&session).await,
    }
    .into_response())
}

/// Provider cancel return: close the checkout and keep the cart.
#[instrument(skip_all)]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<TokenQuery>,
) -> Result<Response> {
    let outcome =
        checkout_service::cancel(&state.checkouts(), &session, query.token.as_deref()).await?;

    if outcome == CancelOutcome::Cancelled {
        flash::push(
            &session,
            FlashLevel::Info,
            "Checkout cancelled. Your cart is still here.",
        )
        .await;
    }
    Ok(Redirect::to("/cart").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, extract::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::state::tests::test_state;
    use photostock_core::{PhotoId, PhotoSize};

    fn return_routes() -> Router {
        Router::new()
            .route("/checkout/success", get(success))
            .route("/checkout/cancel", get(cancel))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(test_state())
    }

    async fn get_status(uri: &str) -> (StatusCode, Option<String>) {
        let response = return_routes()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let location = response
            .headers()
            .get("location")
            .map(|value| value.to_str().unwrap().to_string());
        (response.status(), location)
    }

    #[tokio::test]
    async fn success_without_a_checkout_in_the_session_is_forbidden() {
        let (status, _) = get_status("/checkout/success?token=abc").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get_status("/checkout/success").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn cancel_without_a_checkout_goes_back_to_the_cart() {
        let (status, location) = get_status("/checkout/cancel?token=abc").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/cart"));
    }

    #[test]
    fn minor_units_render_as_price() {
        assert_eq!(format_minor(1250, CurrencyCode::USD), "$12.50");
        assert_eq!(format_minor(5, CurrencyCode::EUR), "€0.05");
    }

    #[test]
    fn line_views_show_size_label() {
        let views = line_views(&[LineItem {
            photo_id: PhotoId::new(1),
            size: PhotoSize::ExtraLarge,
            name: "Harbour".to_string(),
            unit_amount: 800,
            currency: CurrencyCode::USD,
        }]);
        assert_eq!(views[0].size, "Extra large");
        assert_eq!(views[0].amount, "$8.00");
    }
}
