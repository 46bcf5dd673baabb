//! Cart operations over the session-held cart.
//!
//! The cart itself is plain data in the session; this module resolves its
//! lines against the catalog and keeps mutations read-modify-write within a
//! single request.

use std::future::Future;

use tower_sessions::Session;
use tracing::{debug, instrument};

use photostock_core::{CurrencyCode, PhotoId, PhotoSize, Price};

use crate::db::RepositoryError;
use crate::models::{Cart, CartLine, Photo, session_keys};

/// Read access to the photo catalog.
pub trait Catalog {
    /// Look up a single photo.
    fn find_photo(
        &self,
        id: PhotoId,
    ) -> impl Future<Output = Result<Option<Photo>, RepositoryError>> + Send;

    /// Look up several photos at once. Missing ids are simply absent from the result.
    fn find_photos(
        &self,
        ids: &[PhotoId],
    ) -> impl Future<Output = Result<Vec<Photo>, RepositoryError>> + Send;
}

/// Errors from cart operations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("photo {0} not found")]
    PhotoNotFound(PhotoId),

    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] RepositoryError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// A cart line joined with its catalog data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartViewLine {
    pub photo: Photo,
    pub size: PhotoSize,
}

/// Everything the cart page renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub lines: Vec<CartViewLine>,
    pub subtotal: Price,
}

impl CartView {
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn contains(&self, photo_id: PhotoId) -> bool {
        self.lines.iter().any(|line| line.photo.id == photo_id)
    }
}

/// Read the cart from the session, or an empty one.
///
/// # Errors
///
/// Returns a session error if the store cannot be read or the value is corrupt.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns a session error if the value cannot be stored.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Take paid-for lines out of the session cart.
///
/// # Errors
///
/// Returns a session error if the store cannot be read or written.
pub async fn remove_purchased(
    session: &Session,
    purchased: &[CartLine],
) -> Result<(), tower_sessions::session::Error> {
    let mut cart = load(session).await?;
    cart.remove_purchased(purchased);
    if cart.is_empty() {
        session.remove_value(session_keys::CART).await?;
        return Ok(());
    }
    save(session, &cart).await
}

/// Add a photo, or change its size if it is already in the cart.
///
/// # Errors
///
/// Returns `CartError::PhotoNotFound` if the photo is not in the catalog.
#[instrument(skip(catalog, session))]
pub async fn add<C: Catalog>(
    catalog: &C,
    session: &Session,
    photo_id: PhotoId,
    size: PhotoSize,
) -> Result<Photo, CartError> {
    let photo = catalog
        .find_photo(photo_id)
        .await?
        .ok_or(CartError::PhotoNotFound(photo_id))?;

    let mut cart = load(session).await?;
    cart.set(photo_id, size);
    save(session, &cart).await?;

    debug!(lines = cart.len(), "Photo added to cart");
    Ok(photo)
}

/// Remove a photo. Removing something that is not there is not an error.
///
/// # Errors
///
/// Returns a session error if the cart cannot be read or written.
#[instrument(skip(session))]
pub async fn remove(session: &Session, photo_id: PhotoId) -> Result<bool, CartError> {
    let mut cart = load(session).await?;
    let removed = cart.remove(photo_id);
    if removed {
        save(session, &cart).await?;
    }
    Ok(removed)
}

/// Change the size of a line already in the cart; absent photos are ignored.
///
/// # Errors
///
/// Returns a session error if the cart cannot be read or written.
#[instrument(skip(session))]
pub async fn update_size(
    session: &Session,
    photo_id: PhotoId,
    size: PhotoSize,
) -> Result<bool, CartError> {
    let mut cart = load(session).await?;
    let updated = cart.update_size(photo_id, size);
    if updated {
        save(session, &cart).await?;
    }
    Ok(updated)
}

/// Resolve the cart against the catalog.
///
/// Lines whose photo has since left the catalog are skipped.
///
/// # Errors
///
/// Returns `CartError::Catalog` if the lookup fails.
pub async fn view<C: Catalog>(
    catalog: &C,
    session: &Session,
    currency: CurrencyCode,
) -> Result<CartView, CartError> {
    let cart = load(session).await?;
    if cart.is_empty() {
        return Ok(CartView {
            lines: Vec::new(),
            subtotal: Price::zero(currency),
        });
    }

    let ids: Vec<PhotoId> = cart.lines().iter().map(|line| line.photo_id).collect();
    let photos = catalog.find_photos(&ids).await?;

    let lines: Vec<CartViewLine> = cart
        .lines()
        .iter()
        .filter_map(|line| {
            photos
                .iter()
                .find(|photo| photo.id == line.photo_id)
                .map(|photo| CartViewLine {
                    photo: photo.clone(),
                    size: line.size,
                })
        })
        .collect();

    let subtotal = lines
        .iter()
        .fold(Price::zero(currency), |total, line| total.plus(line.photo.price));

    Ok(CartView { lines, subtotal })
}

/// Number of lines in the cart, for the header badge.
///
/// # Errors
///
/// Returns a session error if the cart cannot be read.
pub async fn count(session: &Session) -> Result<usize, tower_sessions::session::Error> {
    Ok(load(session).await?.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::fakes::{InMemoryStore, photo, test_session};

    #[tokio::test]
    async fn add_then_view_has_one_line_with_size() {
        let store = InMemoryStore::with_photos([photo(1, "Harbour", "12.50")]);
        let session = test_session();

        add(&store, &session, PhotoId::new(1), PhotoSize::Small).await.unwrap();
        add(&store, &session, PhotoId::new(1), PhotoSize::Large).await.unwrap();

        let view = view(&store, &session, CurrencyCode::USD).await.unwrap();
        assert_eq!(view.item_count(), 1);
        assert_eq!(view.lines[0].size, PhotoSize::Large);
        assert_eq!(view.subtotal.to_string(), "$12.50");
    }

    #[tokio::test]
    async fn unknown_photo_is_rejected_and_cart_untouched() {
        let store = InMemoryStore::default();
        let session = test_session();

        let err = add(&store, &session, PhotoId::new(99), PhotoSize::Medium)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::PhotoNotFound(id) if id == PhotoId::new(99)));
        assert_eq!(count(&session).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn removed_item_never_appears_in_view() {
        let store = InMemoryStore::with_photos([photo(1, "A", "5"), photo(2, "B", "7.25")]);
        let session = test_session();
        add(&store, &session, PhotoId::new(1), PhotoSize::Medium).await.unwrap();
        add(&store, &session, PhotoId::new(2), PhotoSize::Medium).await.unwrap();

        assert!(remove(&session, PhotoId::new(1)).await.unwrap());
        assert!(!remove(&session, PhotoId::new(1)).await.unwrap());

        let view = view(&store, &session, CurrencyCode::USD).await.unwrap();
        assert!(!view.contains(PhotoId::new(1)));
        assert_eq!(view.subtotal.to_string(), "$7.25");
    }

    #[tokio::test]
    async fn update_size_ignores_absent_lines() {
        let store = InMemoryStore::with_photos([photo(1, "A", "5")]);
        let session = test_session();

        assert!(!update_size(&session, PhotoId::new(1), PhotoSize::Small).await.unwrap());
        assert_eq!(count(&session).await.unwrap(), 0);

        add(&store, &session, PhotoId::new(1), PhotoSize::Medium).await.unwrap();
        assert!(update_size(&session, PhotoId::new(1), PhotoSize::ExtraLarge).await.unwrap());
        assert_eq!(
            load(&session).await.unwrap().get(PhotoId::new(1)).unwrap().size,
            PhotoSize::ExtraLarge
        );
    }

    #[tokio::test]
    async fn view_skips_photos_removed_from_catalog() {
        let store = InMemoryStore::with_photos([photo(1, "A", "5"), photo(2, "B", "3")]);
        let session = test_session();
        add(&store, &session, PhotoId::new(1), PhotoSize::Medium).await.unwrap();
        add(&store, &session, PhotoId::new(2), PhotoSize::Medium).await.unwrap();

        store.delete_photo(PhotoId::new(1));

        let view = view(&store, &session, CurrencyCode::USD).await.unwrap();
        assert_eq!(view.item_count(), 1);
        assert!(view.contains(PhotoId::new(2)));
        assert_eq!(view.subtotal.to_string(), "$3.00");
    }

    #[tokio::test]
    async fn empty_cart_views_as_zero() {
        let store = InMemoryStore::default();
        let session = test_session();
        let view = view(&store, &session, CurrencyCode::GBP).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.subtotal.to_string(), "£0.00");
    }

    #[tokio::test]
    async fn removing_every_purchased_line_empties_the_cart() {
        let store = InMemoryStore::with_photos([photo(1, "A", "5")]);
        let session = test_session();
        add(&store, &session, PhotoId::new(1), PhotoSize::Medium).await.unwrap();

        let purchased = load(&session).await.unwrap().lines().to_vec();
        remove_purchased(&session, &purchased).await.unwrap();
        assert!(load(&session).await.unwrap().is_empty());
    }
}
