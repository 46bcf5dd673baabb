//! Business logic for the storefront.
//!
//! Each service talks to storage through a small trait so it can be driven
//! by the Postgres repositories in production and by in-memory fakes in
//! tests.
//!
//! # Services
//!
//! - `cart` - Session cart mutations and catalog-resolved views
//! - `checkout` - Checkout start, success and cancel legs
//! - `fulfillment` - Exactly-once download entitlements
//! - `webhook` - Signed payment provider callbacks
//! - `profile` - Customer profile create/update
//! - `favourites` - Favourite toggling and safe return paths
//! - `capability` - Cached customers-group membership

pub mod capability;
pub mod cart;
pub mod checkout;
pub mod favourites;
pub mod fulfillment;
pub mod profile;
pub mod webhook;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fakes;

pub use capability::{CapabilityCache, GroupDirectory};
pub use cart::{CartError, CartView, CartViewLine, Catalog};
pub use checkout::{CancelOutcome, CheckoutError, CheckoutStore, CheckoutUrls, StartedCheckout};
pub use favourites::{FavouriteError, FavouriteStore, ToggleOutcome};
pub use fulfillment::{EntitlementStore, FulfillmentError, FulfillmentOutcome};
pub use profile::{ProfileError, ProfileOutcome, ProfileStore};
pub use webhook::{WebhookError, WebhookOutcome};
