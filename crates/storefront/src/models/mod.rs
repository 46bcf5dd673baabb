//! Domain models for the storefront.
//!
//! These types are separate from database row types; repositories convert
//! rows into them after validating stored values.

pub mod cart;
pub mod checkout;
pub mod customer;
pub mod flash;
pub mod photo;
pub mod session;

pub use cart::{Cart, CartLine};
pub use checkout::{CheckoutRecord, CheckoutSession, CorrelationToken, LineItem};
pub use customer::{
    CustomerProfile, Download, FavouritePhoto, FieldError, ProfileForm, ProfileInput,
};
pub use flash::{FlashLevel, FlashMessage};
pub use photo::Photo;
pub use session::{CurrentUser, keys as session_keys};
