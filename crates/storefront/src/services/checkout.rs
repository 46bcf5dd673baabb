//! Checkout orchestration.
//!
//! Starting a checkout snapshots the cart into a persisted record keyed by a
//! fresh correlation token, then asks the payment provider for a hosted
//! session whose success and cancel URLs carry that token. The return leg
//! accepts the checkout only when the presented token equals the one held in
//! this browser's session.
//!
//! ```text
//! POST /checkout          -> record(created) + provider session + session state
//! GET  /checkout/success  -> pending_verification -> fulfilled | rejected
//! GET  /checkout/cancel   -> cancelled
//! ```

use std::future::Future;

use tower_sessions::Session;
use tracing::{info, instrument, warn};

use photostock_core::{
    CheckoutEvent, CheckoutState, CurrencyCode, CustomerId, InvalidTransition, PhotoId, PriceError,
};

use super::cart::{self, Catalog};
use super::fulfillment::{self, EntitlementStore, FulfillmentError, FulfillmentOutcome};
use crate::db::RepositoryError;
use crate::models::{
    CartLine, CheckoutRecord, CheckoutSession, CorrelationToken, LineItem, session_keys,
};
use crate::payments::{PaymentError, PaymentGateway, PaymentSessionRequest};

/// Persistence for checkout records.
pub trait CheckoutStore {
    /// Persist a new record in state `created`.
    fn insert_pending(
        &self,
        token: &CorrelationToken,
        customer_id: CustomerId,
        lines: &[CartLine],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Record the provider's session id once it exists.
    fn attach_provider_session(
        &self,
        token: &CorrelationToken,
        provider_session_id: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<CheckoutRecord>, RepositoryError>> + Send;

    /// Move an open record (`created` or `pending_verification`) to `state`.
    ///
    /// Returns `false` when the record is missing or already terminal.
    fn transition(
        &self,
        token: &str,
        state: CheckoutState,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Errors from the checkout flow.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("photo {0} is no longer available")]
    UnknownPhoto(PhotoId),

    #[error("no checkout in progress")]
    NoCheckoutInProgress,

    #[error("checkout token does not match")]
    TokenMismatch,

    #[error("return for an earlier checkout")]
    Superseded,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("invalid price: {0}")]
    Pricing(#[from] PriceError),

    #[error("payment provider error: {0}")]
    Payment(#[from] PaymentError),

    #[error("fulfilment failed: {0}")]
    Fulfillment(#[from] FulfillmentError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Where the checkout pages should send the browser.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub base_url: String,
    pub currency: CurrencyCode,
}

impl CheckoutUrls {
    fn success(&self, token: &CorrelationToken) -> String {
        format!("{}/checkout/success?token={}", self.base_url, token.as_str())
    }

    fn cancel(&self, token: &CorrelationToken) -> String {
        format!("{}/checkout/cancel?token={}", self.base_url, token.as_str())
    }
}

/// A checkout handed off to the provider.
#[derive(Debug, Clone)]
pub struct StartedCheckout {
    pub session: CheckoutSession,
    /// Hosted payment page.
    pub redirect_url: String,
}

/// Result of the success callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub outcome: FulfillmentOutcome,
    pub line_items: Vec<LineItem>,
}

/// Start a checkout for the session's cart.
///
/// Every line is priced before anything is persisted, so an empty cart or a
/// photo that left the catalog creates neither a record nor a provider session.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart`, `CheckoutError::UnknownPhoto`, or the
/// storage, provider and session errors encountered along the way.
#[instrument(skip_all, fields(customer_id = %customer_id))]
pub async fn start<S, C, G>(
    store: &S,
    catalog: &C,
    gateway: &G,
    session: &Session,
    customer_id: CustomerId,
    urls: &CheckoutUrls,
) -> Result<StartedCheckout, CheckoutError>
where
    S: CheckoutStore + Sync,
    C: Catalog + Sync,
    G: PaymentGateway + Sync,
{
    let cart = cart::load(session).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut line_items = Vec::with_capacity(cart.len());
    for line in cart.lines() {
        let photo = catalog
            .find_photo(line.photo_id)
            .await?
            .ok_or(CheckoutError::UnknownPhoto(line.photo_id))?;
        line_items.push(LineItem {
            photo_id: photo.id,
            size: line.size,
            name: photo.caption,
            unit_amount: photo.price.to_minor_units()?,
            currency: urls.currency,
        });
    }

    let token = CorrelationToken::generate();
    store
        .insert_pending(&token, customer_id, cart.lines())
        .await?;

    let request = PaymentSessionRequest {
        token: token.clone(),
        line_items: line_items.clone(),
        success_url: urls.success(&token),
        cancel_url: urls.cancel(&token),
    };

    let provider = match gateway.create_session(&request).await {
        Ok(provider) => provider,
        Err(e) => {
            // The record would otherwise stay open forever.
            if let Err(close_err) = store
                .transition(token.as_str(), CheckoutState::Cancelled)
                .await
            {
                warn!("Failed to close checkout after provider error: {close_err}");
            }
            return Err(e.into());
        }
    };

    store.attach_provider_session(&token, &provider.id).await?;

    let checkout = CheckoutSession {
        token,
        provider_session_id: provider.id,
        line_items,
        state: CheckoutState::Created,
    };
    session.insert(session_keys::CHECKOUT, &checkout).await?;

    info!(
        token = ?checkout.token,
        provider_session_id = %checkout.provider_session_id,
        total = checkout.total_minor_units(),
        "Checkout started"
    );

    Ok(StartedCheckout {
        session: checkout,
        redirect_url: provider.url,
    })
}

/// Handle the browser returning from the provider's success URL.
///
/// The presented token must equal the one in this session's
/// [`CheckoutSession`]. On a match the checkout is fulfilled (or found to be
/// fulfilled already by the webhook) and the paid lines leave the cart; on a
/// mismatch the checkout is rejected and nothing is recorded.
///
/// A session holds one checkout, so a customer who starts a second checkout in
/// another tab and then pays for the first one returns with the first token.
/// That token is still an open checkout of the same customer: the current
/// checkout is left untouched and the first one is left to the webhook.
///
/// # Errors
///
/// Returns `CheckoutError::NoCheckoutInProgress` without a session checkout,
/// `CheckoutError::Superseded` for the return of an earlier checkout,
/// `CheckoutError::TokenMismatch` when the token is absent or wrong, and
/// storage or session errors otherwise.
#[instrument(skip_all)]
pub async fn complete<S>(
    store: &S,
    session: &Session,
    presented: Option<&str>,
) -> Result<CompletedCheckout, CheckoutError>
where
    S: CheckoutStore + EntitlementStore + Sync,
{
    let mut checkout = session
        .get::<CheckoutSession>(session_keys::CHECKOUT)
        .await?
        .ok_or(CheckoutError::NoCheckoutInProgress)?;

    let verified = presented.is_some_and(|token| checkout.token.matches(token));
    if let Some(presented) = presented.filter(|_| !verified) {
        if is_sibling(store, &checkout, presented).await? {
            warn!(
                token = ?checkout.token,
                "Return for an earlier checkout of this customer; current checkout kept"
            );
            return Err(CheckoutError::Superseded);
        }
    }

    checkout.state = checkout.state.apply(CheckoutEvent::Returned)?;
    store
        .transition(checkout.token.as_str(), checkout.state)
        .await?;

    if !verified {
        checkout.state = checkout.state.apply(CheckoutEvent::TokenMismatch)?;
        store
            .transition(checkout.token.as_str(), checkout.state)
            .await?;
        session
            .remove::<CheckoutSession>(session_keys::CHECKOUT)
            .await?;
        warn!(token = ?checkout.token, "Checkout rejected: token mismatch");
        return Err(CheckoutError::TokenMismatch);
    }

    checkout.state = checkout.state.apply(CheckoutEvent::TokenVerified)?;
    let outcome = fulfillment::fulfil(store, checkout.token.as_str()).await?;

    let purchased: Vec<CartLine> = checkout
        .line_items
        .iter()
        .map(|item| CartLine {
            photo_id: item.photo_id,
            size: item.size,
        })
        .collect();
    cart::remove_purchased(session, &purchased).await?;
    session
        .remove::<CheckoutSession>(session_keys::CHECKOUT)
        .await?;

    info!(token = ?checkout.token, ?outcome, "Checkout completed");

    Ok(CompletedCheckout {
        outcome,
        line_items: checkout.line_items,
    })
}

/// Whether `presented` names another open checkout owned by the same customer
/// as the session's checkout.
async fn is_sibling<S>(
    store: &S,
    checkout: &CheckoutSession,
    presented: &str,
) -> Result<bool, CheckoutError>
where
    S: CheckoutStore + Sync,
{
    let Some(other) = store.find(presented).await? else {
        return Ok(false);
    };
    if !other.state.is_open() {
        return Ok(false);
    }
    let current = store.find(checkout.token.as_str()).await?;
    Ok(current.is_some_and(|current| current.customer_id == other.customer_id))
}

/// Outcome of the cancel callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// No matching checkout in this session; nothing changed.
    NothingToCancel,
}

/// Handle the browser returning from the provider's cancel URL.
///
/// The cart is kept so the customer can try again.
///
/// # Errors
///
/// Returns storage or session errors.
#[instrument(skip_all)]
pub async fn cancel<S>(
    store: &S,
    session: &Session,
    presented: Option<&str>,
) -> Result<CancelOutcome, CheckoutError>
where
    S: CheckoutStore + Sync,
{
    let Some(mut checkout) = session
        .get::<CheckoutSession>(session_keys::CHECKOUT)
        .await?
    else {
        return Ok(CancelOutcome::NothingToCancel);
    };

    if !presented.is_some_and(|token| checkout.token.matches(token)) {
        return Ok(CancelOutcome::NothingToCancel);
    }

    checkout.state = checkout.state.apply(CheckoutEvent::Cancelled)?;
    store
        .transition(checkout.token.as_str(), checkout.state)
        .await?;
    session
        .remove::<CheckoutSession>(session_keys::CHECKOUT)
        .await?;

    info!(token = ?checkout.token, "Checkout cancelled");
    Ok(CancelOutcome::Cancelled)
}
