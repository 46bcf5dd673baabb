//! Checkout state carried in the session and mirrored in the database.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use photostock_core::{CheckoutState, CurrencyCode, CustomerId, PhotoId, PhotoSize};

use super::cart::CartLine;

/// Random token tying provider callbacks back to the checkout that started them.
///
/// 256 bits from the thread RNG, URL-safe base64 without padding so it can
/// travel in a query string untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a token read back from storage or a provider payload.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a token presented by a client.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        expected.len() == presented.len() && bool::from(expected.ct_eq(presented))
    }
}

impl fmt::Debug for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "CorrelationToken({prefix}…)")
    }
}

/// A priced line handed to the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub photo_id: PhotoId,
    pub size: PhotoSize,
    /// Shown on the provider's hosted page.
    pub name: String,
    /// Price in minor units (cents).
    pub unit_amount: i64,
    pub currency: CurrencyCode,
}

/// The checkout in progress for this browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub token: CorrelationToken,
    pub provider_session_id: String,
    pub line_items: Vec<LineItem>,
    pub state: CheckoutState,
}

impl CheckoutSession {
    /// Total in minor units across all line items.
    #[must_use]
    pub fn total_minor_units(&self) -> i64 {
        self.line_items.iter().map(|item| item.unit_amount).sum()
    }
}

/// Server-side record of a checkout, the source of truth for fulfilment.
#[derive(Debug, Clone)]
pub struct CheckoutRecord {
    pub token: CorrelationToken,
    pub customer_id: CustomerId,
    pub provider_session_id: Option<String>,
    /// Cart as it was when the customer was charged.
    pub lines: Vec<CartLine>,
    pub state: CheckoutState,
    pub created_at: DateTime<Utc>,
}
