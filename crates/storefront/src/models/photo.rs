//! Catalog photo as seen by the shop.

use photostock_core::{PhotoId, Price};

/// A purchasable photo resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub caption: String,
    /// Price for any size; sizes are not priced separately.
    pub price: Price,
    pub image_url: String,
}
