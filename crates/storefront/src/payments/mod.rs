//! Payment provider integration.
//!
//! The checkout orchestrator talks to the provider only through
//! [`PaymentGateway`], so tests can swap in a recording fake and the Stripe
//! client stays the single place that knows the wire format.

pub mod stripe;

use std::future::Future;

use thiserror::Error;

use crate::models::{CorrelationToken, LineItem};

pub use stripe::{StripeClient, WebhookEvent};

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Signature header missing, malformed, stale or wrong.
    #[error("invalid webhook signature: {0}")]
    Signature(&'static str),
}

/// What the orchestrator asks the provider for.
#[derive(Debug, Clone)]
pub struct PaymentSessionRequest {
    pub token: CorrelationToken,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted payment page created by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub id: String,
    /// Where the browser should be sent to pay.
    pub url: String,
}

/// Creates hosted payment sessions.
pub trait PaymentGateway {
    /// Create a hosted payment session for the given line items.
    fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> impl Future<Output = Result<ProviderSession, PaymentError>> + Send;
}
