//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Database readiness
//!
//! # Cart (session, no login needed)
//! GET  /cart                                - Cart page
//! POST /cart/add/{photo_id}                 - Add or resize (form: size)
//! POST /cart/remove/{photo_id}              - Remove line
//! POST /cart/update_size/{photo_id}         - Change size (form: size)
//! GET  /cart/count                          - Line count (text)
//!
//! # Checkout
//! POST /checkout                            - Start hosted checkout (customer)
//! GET  /checkout/success?token=             - Provider success return
//! GET  /checkout/cancel?token=              - Provider cancel return
//!
//! # Webhooks (signature only)
//! POST /webhooks/stripe                     - Provider events
//!
//! # Customer area (customers group)
//! GET  /customers/profile                   - Profile overview
//! GET|POST /customers/profile/create        - Create profile
//! GET|POST /customers/profile/update        - Update profile
//! GET  /customers/downloads                 - Download history
//! GET  /customers/favourites                - Favourites list
//! POST /customers/favourites/{photo_id}     - Toggle (form: redirect_url)
//! ```

pub mod cart;
pub mod checkout;
pub mod customers;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{checkout_rate_limiter, webhook_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{photo_id}", post(cart::add))
        .route("/remove/{photo_id}", post(cart::remove))
        .route("/update_size/{photo_id}", post(cart::update_size))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(checkout::start).layer(checkout_rate_limiter()),
        )
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create the customer area router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(customers::view_profile))
        .route(
            "/profile/create",
            get(customers::create_page).post(customers::create_profile),
        )
        .route(
            "/profile/update",
            get(customers::update_page).post(customers::update_profile),
        )
        .route("/downloads", get(customers::downloads))
        .route("/favourites", get(customers::view_favourites))
        .route("/favourites/{photo_id}", post(customers::toggle_favourite))
}

/// Create the webhook routes router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route(
        "/stripe",
        post(webhooks::stripe).layer(webhook_rate_limiter()),
    )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/customers", customer_routes())
        .nest("/webhooks", webhook_routes())
}
