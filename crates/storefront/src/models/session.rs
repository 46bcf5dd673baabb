//! Session-related types.
//!
//! Types stored in the session for identity and shop state.

use serde::{Deserialize, Serialize};

use photostock_core::UserId;

/// Session-stored user identity.
///
/// Written by the external login flow; the storefront only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
}

/// Session keys.
pub mod keys {
    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The shopping cart.
    pub const CART: &str = "shopping_cart";

    /// The checkout in progress, if any.
    pub const CHECKOUT: &str = "checkout_session";

    /// One-shot messages shown on the next rendered page.
    pub const FLASH: &str = "flash_messages";
}
