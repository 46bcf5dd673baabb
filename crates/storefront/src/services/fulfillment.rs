//! Recording download entitlements for a paid checkout.
//!
//! Both the success page and the payment webhook end up here. The store claims
//! the checkout and writes its entitlements in one transaction, so whichever
//! caller arrives second sees `AlreadyFulfilled` and writes nothing.

use std::future::Future;

use tracing::{info, instrument};

use photostock_core::{CheckoutState, CustomerId};

use crate::db::RepositoryError;
use crate::models::Download;

/// What the store found when asked to fulfil a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// The checkout was open; this many entitlements were written.
    Recorded(usize),
    /// No checkout with that token.
    NotFound,
    /// The checkout was already in a terminal state.
    NotOpen(CheckoutState),
}

/// Persistence for entitlements.
pub trait EntitlementStore {
    /// Atomically move an open checkout to `fulfilled` and insert one
    /// entitlement per line of its snapshot.
    fn claim_and_record(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<ClaimResult, RepositoryError>> + Send;

    /// Entitlements for a customer, newest first.
    fn downloads(
        &self,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<Vec<Download>, RepositoryError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Recorded(usize),
    AlreadyFulfilled,
}

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("no checkout for this token")]
    UnknownCheckout,

    #[error("checkout is {0} and cannot be fulfilled")]
    Closed(CheckoutState),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Fulfil the checkout identified by `token`.
///
/// # Errors
///
/// Returns `FulfillmentError::UnknownCheckout` for tokens that were never
/// issued, `FulfillmentError::Closed` for rejected or cancelled checkouts, and
/// `FulfillmentError::Storage` when the transaction fails.
#[instrument(skip(store, token))]
pub async fn fulfil<S>(store: &S, token: &str) -> Result<FulfillmentOutcome, FulfillmentError>
where
    S: EntitlementStore + Sync,
{
    match store.claim_and_record(token).await? {
        ClaimResult::Recorded(count) => {
            info!(entitlements = count, "Checkout fulfilled");
            Ok(FulfillmentOutcome::Recorded(count))
        }
        ClaimResult::NotOpen(CheckoutState::Fulfilled) => Ok(FulfillmentOutcome::AlreadyFulfilled),
        ClaimResult::NotOpen(state) => Err(FulfillmentError::Closed(state)),
        ClaimResult::NotFound => Err(FulfillmentError::UnknownCheckout),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CorrelationToken;
    use crate::services::checkout::CheckoutStore;
    use crate::services::fakes::{InMemoryStore, photo};
    use crate::models::CartLine;
    use photostock_core::{PhotoId, PhotoSize};

    async fn pending(store: &InMemoryStore, lines: &[CartLine]) -> String {
        let token = CorrelationToken::generate();
        store
            .insert_pending(&token, CustomerId::new(1), lines)
            .await
            .unwrap();
        token.as_str().to_string()
    }

    fn line(id: i32, size: PhotoSize) -> CartLine {
        CartLine {
            photo_id: PhotoId::new(id),
            size,
        }
    }

    #[tokio::test]
    async fn one_entitlement_per_line() {
        let store = InMemoryStore::with_photos([photo(1, "A", "1"), photo(2, "B", "2")]);
        let token = pending(&store, &[line(1, PhotoSize::Small), line(2, PhotoSize::Large)]).await;

        assert_eq!(
            fulfil(&store, &token).await.unwrap(),
            FulfillmentOutcome::Recorded(2)
        );
        assert_eq!(
            store.downloads_for_token(&token),
            vec![(PhotoId::new(1), PhotoSize::Small), (PhotoId::new(2), PhotoSize::Large)]
        );
    }

    #[tokio::test]
    async fn second_fulfilment_is_a_no_op() {
        let store = InMemoryStore::with_photos([photo(1, "A", "1")]);
        let token = pending(&store, &[line(1, PhotoSize::Medium)]).await;

        fulfil(&store, &token).await.unwrap();
        assert_eq!(
            fulfil(&store, &token).await.unwrap(),
            FulfillmentOutcome::AlreadyFulfilled
        );
        assert_eq!(store.downloads_for_token(&token).len(), 1);
    }

    #[tokio::test]
    async fn unknown_and_closed_checkouts_record_nothing() {
        let store = InMemoryStore::with_photos([photo(1, "A", "1")]);
        assert!(matches!(
            fulfil(&store, "never-issued").await,
            Err(FulfillmentError::UnknownCheckout)
        ));

        let token = pending(&store, &[line(1, PhotoSize::Medium)]).await;
        store
            .transition(&token, CheckoutState::Cancelled)
            .await
            .unwrap();
        assert!(matches!(
            fulfil(&store, &token).await,
            Err(FulfillmentError::Closed(CheckoutState::Cancelled))
        ));
        assert!(store.downloads_for_token(&token).is_empty());
    }

    #[tokio::test]
    async fn downloads_are_listed_per_customer() {
        let store = InMemoryStore::with_photos([photo(1, "Harbour", "1")]);
        let token = pending(&store, &[line(1, PhotoSize::ExtraLarge)]).await;
        fulfil(&store, &token).await.unwrap();

        let downloads = store.downloads(CustomerId::new(1)).await.unwrap();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].caption, "Harbour");
        assert_eq!(downloads[0].size, PhotoSize::ExtraLarge);
        assert!(store.downloads(CustomerId::new(2)).await.unwrap().is_empty());
    }
}
