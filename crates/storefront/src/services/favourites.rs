//! Favourite photos.

use std::future::Future;

use tracing::{debug, instrument};

use photostock_core::{CustomerId, PhotoId};

use super::cart::Catalog;
use crate::db::RepositoryError;
use crate::models::FavouritePhoto;

/// Where the toggle lands when the caller gave no usable return path.
pub const FAVOURITES_PATH: &str = "/customers/favourites";

/// Persistence for (customer, photo) favourites.
pub trait FavouriteStore {
    /// Insert the pair. Returns `false` if it already existed.
    fn add_favourite(
        &self,
        customer_id: CustomerId,
        photo_id: PhotoId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete the pair. Returns `false` if it did not exist.
    fn remove_favourite(
        &self,
        customer_id: CustomerId,
        photo_id: PhotoId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Favourites with catalog data, newest first.
    fn list_favourites(
        &self,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<Vec<FavouritePhoto>, RepositoryError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added { caption: String },
    Removed { caption: String },
}

impl ToggleOutcome {
    /// Message shown to the customer after the toggle.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Added { caption } => format!("\"{caption}\" added to your favourites."),
            Self::Removed { caption } => format!("\"{caption}\" removed from your favourites."),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FavouriteError {
    #[error("photo {0} not found")]
    PhotoNotFound(PhotoId),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Flip whether `photo_id` is a favourite of `customer_id`.
///
/// # Errors
///
/// Returns `FavouriteError::PhotoNotFound` if the photo is not in the catalog.
#[instrument(skip(catalog, store))]
pub async fn toggle<C, S>(
    catalog: &C,
    store: &S,
    customer_id: CustomerId,
    photo_id: PhotoId,
) -> Result<ToggleOutcome, FavouriteError>
where
    C: Catalog + Sync,
    S: FavouriteStore + Sync,
{
    let photo = catalog
        .find_photo(photo_id)
        .await?
        .ok_or(FavouriteError::PhotoNotFound(photo_id))?;

    let outcome = if store.remove_favourite(customer_id, photo_id).await? {
        ToggleOutcome::Removed {
            caption: photo.caption,
        }
    } else {
        store.add_favourite(customer_id, photo_id).await?;
        ToggleOutcome::Added {
            caption: photo.caption,
        }
    };

    debug!(?outcome, "Favourite toggled");
    Ok(outcome)
}

/// Accept a caller-supplied return path only if it stays on this site.
///
/// Absolute URLs, scheme-relative `//host` paths and backslash tricks fall
/// back to the favourites page.
#[must_use]
pub fn safe_redirect(candidate: Option<&str>) -> &str {
    match candidate.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => FAVOURITES_PATH,
    }
}
