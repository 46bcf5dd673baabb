//! Payment provider webhook processing.
//!
//! The route hands over the raw body and signature header untouched; the
//! signature must be checked over exactly those bytes before any parsing.

use axum::http::StatusCode;
use tracing::{info, instrument, warn};

use super::fulfillment::{self, EntitlementStore, FulfillmentError, FulfillmentOutcome};
use crate::db::RepositoryError;
use crate::payments::stripe::{CompletedCheckout, verify_signature};
use crate::payments::{PaymentError, WebhookEvent};

/// What the webhook did with a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Fulfilled(usize),
    AlreadyFulfilled,
    /// The token was never issued here, or was missing from the event.
    UnknownCheckout,
    /// The checkout was rejected or cancelled before payment completed.
    ClosedCheckout,
    /// Completed but not yet paid; a later `async_payment_succeeded` event
    /// fulfils it.
    AwaitingPayment,
    Ignored(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,

    #[error(transparent)]
    InvalidSignature(PaymentError),

    #[error("malformed event: {0}")]
    MalformedPayload(PaymentError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl WebhookError {
    /// Status returned to the provider. Only storage failures ask for a retry.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingSignature | Self::InvalidSignature(_) | Self::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Verify, parse and act on one webhook delivery.
///
/// # Errors
///
/// Returns a `WebhookError` whose [`status`](WebhookError::status) tells the
/// route what to answer.
#[instrument(skip_all)]
pub async fn process<S>(
    store: &S,
    secret: &[u8],
    payload: &[u8],
    signature: Option<&str>,
    now: i64,
) -> Result<WebhookOutcome, WebhookError>
where
    S: EntitlementStore + Sync,
{
    let signature = signature.ok_or(WebhookError::MissingSignature)?;
    verify_signature(secret, payload, signature, now).map_err(WebhookError::InvalidSignature)?;

    let event = WebhookEvent::parse(payload).map_err(WebhookError::MalformedPayload)?;

    match event {
        WebhookEvent::CheckoutCompleted(completed) => checkout_completed(store, completed).await,
        WebhookEvent::Ignored {
            event_id,
            event_type,
        } => {
            info!(%event_id, %event_type, "Unhandled webhook event acknowledged");
            Ok(WebhookOutcome::Ignored(event_type))
        }
    }
}

async fn checkout_completed<S>(
    store: &S,
    completed: CompletedCheckout,
) -> Result<WebhookOutcome, WebhookError>
where
    S: EntitlementStore + Sync,
{
    if !completed.paid {
        info!(
            event_id = %completed.event_id,
            provider_session_id = %completed.provider_session_id,
            "Checkout completed without payment yet"
        );
        return Ok(WebhookOutcome::AwaitingPayment);
    }

    let Some(token) = completed.token else {
        warn!(
            event_id = %completed.event_id,
            provider_session_id = %completed.provider_session_id,
            "Completed checkout carries no correlation token"
        );
        return Ok(WebhookOutcome::UnknownCheckout);
    };

    match fulfillment::fulfil(store, &token).await {
        Ok(FulfillmentOutcome::Recorded(count)) => Ok(WebhookOutcome::Fulfilled(count)),
        Ok(FulfillmentOutcome::AlreadyFulfilled) => Ok(WebhookOutcome::AlreadyFulfilled),
        Err(FulfillmentError::UnknownCheckout) => {
            warn!(
                event_id = %completed.event_id,
                provider_session_id = %completed.provider_session_id,
                "Webhook for unknown checkout token"
            );
            Ok(WebhookOutcome::UnknownCheckout)
        }
        Err(FulfillmentError::Closed(state)) => {
            warn!(
                event_id = %completed.event_id,
                %state,
                "Paid checkout was already closed"
            );
            Ok(WebhookOutcome::ClosedCheckout)
        }
        Err(FulfillmentError::Storage(e)) => Err(WebhookError::Storage(e)),
    }
}
