//! Integration tests for Photostock.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database, migrate and seed the catalog
//! ps-cli migrate
//! ps-cli catalog seed crates/cli/seed/photos.yaml
//!
//! # Start the storefront, then run the ignored tests
//! cargo run -p photostock-storefront &
//! cargo test -p photostock-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `PHOTOSTOCK_BASE_URL` - Running storefront (default `http://localhost:3000`)
//! - `STRIPE_WEBHOOK_SECRET` - Same secret the storefront was started with

use reqwest::{Client, redirect};

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("PHOTOSTOCK_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client that keeps the session cookie and does not follow redirects, so
/// tests can assert on `Location`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Webhook secret the running storefront verifies against, if configured.
#[must_use]
pub fn webhook_secret() -> Option<String> {
    std::env::var("STRIPE_WEBHOOK_SECRET").ok()
}
