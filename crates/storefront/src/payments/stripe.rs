//! Stripe Checkout client and webhook verification.
//!
//! Uses ad-hoc `price_data` line items: the catalog owns prices, so nothing
//! has to be mirrored into the Stripe dashboard.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use super::{PaymentError, PaymentGateway, PaymentSessionRequest, ProviderSession};
use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Oldest webhook timestamp accepted, in seconds. Stripe recommends five minutes.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Allowed clock skew for timestamps from the future.
const WEBHOOK_FUTURE_SKEW_SECS: i64 = 60;

/// Name of the header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }
}

impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(token = ?request.token, lines = request.line_items.len()))]
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<ProviderSession, PaymentError> {
        let params = checkout_form(request);

        let response = self
            .inner
            .client
            .post(format!("{}/v1/checkout/sessions", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), "Stripe rejected checkout session: {message}");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CreateCheckoutSessionResponse = serde_json::from_str(&body)?;
        debug!(provider_session_id = %session.id, "Stripe checkout session created");

        Ok(ProviderSession {
            id: session.id,
            url: session.url,
        })
    }
}

/// Build the form-encoded body for `POST /v1/checkout/sessions`.
fn checkout_form(request: &PaymentSessionRequest) -> Vec<(String, String)> {
    let token = request.token.as_str().to_string();
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), token.clone()),
        ("metadata[correlation_token]".to_string(), token),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        params.extend([
            (
                format!("{prefix}[price_data][currency]"),
                item.currency.provider_code().to_string(),
            ),
            (
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ),
            (
                format!("{prefix}[price_data][product_data][name]"),
                format!("{} ({})", item.name, item.size.label()),
            ),
            (
                format!("{prefix}[price_data][product_data][metadata][photo_id]"),
                item.photo_id.to_string(),
            ),
            (format!("{prefix}[quantity]"), "1".to_string()),
        ]);
    }

    params
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`).
///
/// The signed payload is `"{t}.{body}"`, HMAC-SHA256 with the endpoint secret.
/// Any `v1` entry may match, which keeps verification working while a secret
/// is being rolled.
///
/// # Errors
///
/// Returns `PaymentError::Signature` describing the first failed check.
pub fn verify_signature(
    secret: &[u8],
    payload: &[u8],
    header: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(sig) = part.strip_prefix("v1=") {
            candidates.push(sig);
        }
    }

    let timestamp_str = timestamp.ok_or(PaymentError::Signature("missing timestamp"))?;
    if candidates.is_empty() {
        return Err(PaymentError::Signature("missing v1 signature"));
    }

    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| PaymentError::Signature("invalid timestamp"))?;

    let age = now - timestamp;
    if age > WEBHOOK_TOLERANCE_SECS {
        warn!(age, "Stripe webhook rejected: timestamp too old");
        return Err(PaymentError::Signature("timestamp outside tolerance"));
    }
    if age < -WEBHOOK_FUTURE_SKEW_SECS {
        warn!(age, "Stripe webhook rejected: timestamp in the future");
        return Err(PaymentError::Signature("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| PaymentError::Signature("unusable signing secret"))?;
    mac.update(timestamp_str.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice compares in constant time
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(PaymentError::Signature("signature mismatch"))
    }
}

/// Build a valid signature header for a payload.
///
/// Used to produce fixtures for webhook tests and local replay tooling.
#[must_use]
pub fn signature_header(secret: &[u8], timestamp: i64, payload: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

// =============================================================================
// Webhook events
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeWebhookEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionObject {
    id: String,
    client_reference_id: Option<String>,
    payment_status: Option<String>,
    #[serde(default)]
    metadata: StripeCheckoutMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct StripeCheckoutMetadata {
    correlation_token: Option<String>,
}

/// A completed hosted checkout as reported by the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub event_id: String,
    pub provider_session_id: String,
    /// Correlation token, from `client_reference_id` or metadata.
    pub token: Option<String>,
    pub paid: bool,
}

/// Webhook events the storefront distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted(CompletedCheckout),
    /// Any other event type; acknowledged without action.
    Ignored { event_id: String, event_type: String },
}

impl WebhookEvent {
    /// Parse a verified webhook body.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Parse` if the body is not a Stripe event, or if a
    /// checkout session event carries a malformed session object.
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        let envelope: StripeWebhookEnvelope = serde_json::from_slice(payload)?;

        match envelope.event_type.as_str() {
            // Delayed payment methods complete unpaid and settle in a later event
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                let session: StripeCheckoutSessionObject =
                    serde_json::from_value(envelope.data.object)?;
                let paid = matches!(
                    session.payment_status.as_deref(),
                    Some("paid" | "no_payment_required")
                );
                Ok(Self::CheckoutCompleted(CompletedCheckout {
                    event_id: envelope.id,
                    provider_session_id: session.id,
                    token: session
                        .client_reference_id
                        .or(session.metadata.correlation_token),
                    paid,
                }))
            }
            _ => Ok(Self::Ignored {
                event_id: envelope.id,
                event_type: envelope.event_type,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use photostock_core::{CurrencyCode, PhotoId, PhotoSize};
    use serde_json::json;

    use super::*;
    use crate::models::{CorrelationToken, LineItem};

    const SECRET: &[u8] = b"whsec_test_9f8e7d6c5b4a3928";
    const NOW: i64 = 1_760_000_000;

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signature_header(SECRET, NOW, body);
        assert!(verify_signature(SECRET, body, &header, NOW + 10).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = signature_header(SECRET, NOW, br#"{"amount":100}"#);
        let result = verify_signature(SECRET, br#"{"amount":1}"#, &header, NOW);
        assert!(matches!(result, Err(PaymentError::Signature("signature mismatch"))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"{}";
        let header = signature_header(b"whsec_other", NOW, body);
        assert!(verify_signature(SECRET, body, &header, NOW).is_err());
    }

    #[test]
    fn stale_and_future_timestamps_are_rejected() {
        let body = b"{}";
        let header = signature_header(SECRET, NOW, body);
        assert!(verify_signature(SECRET, body, &header, NOW + WEBHOOK_TOLERANCE_SECS + 1).is_err());
        assert!(verify_signature(SECRET, body, &header, NOW - 120).is_err());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let body = b"{}";
        for header in ["", "v1=abcd", "t=123", "t=abc,v1=00", "t=1760000000,v1=zz"] {
            assert!(
                verify_signature(SECRET, body, header, NOW).is_err(),
                "accepted {header:?}"
            );
        }
    }

    #[test]
    fn any_v1_entry_may_match() {
        let body = b"{}";
        let good = signature_header(SECRET, NOW, body);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1={},v1={good_sig}", "00".repeat(32));
        assert!(verify_signature(SECRET, body, &header, NOW).is_ok());
    }

    #[test]
    fn parses_completed_checkout() {
        let body = json!({
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "client_reference_id": "tok_abc",
                "payment_status": "paid",
                "metadata": { "correlation_token": "tok_abc" }
            }}
        })
        .to_string();

        let event = WebhookEvent::parse(body.as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::CheckoutCompleted(CompletedCheckout {
                event_id: "evt_123".to_string(),
                provider_session_id: "cs_test_1".to_string(),
                token: Some("tok_abc".to_string()),
                paid: true,
            })
        );
    }

    #[test]
    fn token_falls_back_to_metadata_and_unpaid_is_flagged() {
        let body = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_2",
                "payment_status": "unpaid",
                "metadata": { "correlation_token": "tok_meta" }
            }}
        })
        .to_string();

        let WebhookEvent::CheckoutCompleted(done) = WebhookEvent::parse(body.as_bytes()).unwrap()
        else {
            panic!("expected a completed checkout");
        };
        assert_eq!(done.token.as_deref(), Some("tok_meta"));
        assert!(!done.paid);
    }

    #[test]
    fn settled_async_payment_counts_as_paid_completion() {
        let body = json!({
            "id": "evt_3",
            "type": "checkout.session.async_payment_succeeded",
            "data": { "object": {
                "id": "cs_test_3",
                "client_reference_id": "tok_async",
                "payment_status": "paid"
            }}
        })
        .to_string();

        let WebhookEvent::CheckoutCompleted(done) = WebhookEvent::parse(body.as_bytes()).unwrap()
        else {
            panic!("expected a completed checkout");
        };
        assert_eq!(done.token.as_deref(), Some("tok_async"));
        assert!(done.paid);
    }

    #[test]
    fn unknown_events_are_ignored_not_errors() {
        let body = json!({
            "id": "evt_3",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        })
        .to_string();

        assert!(matches!(
            WebhookEvent::parse(body.as_bytes()).unwrap(),
            WebhookEvent::Ignored { ref event_type, .. } if event_type == "customer.created"
        ));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(WebhookEvent::parse(b"not json").is_err());
        assert!(WebhookEvent::parse(br#"{"type":"checkout.session.completed"}"#).is_err());
    }

    #[test]
    fn checkout_form_encodes_every_line() {
        let request = PaymentSessionRequest {
            token: CorrelationToken::from_stored("tok".to_string()),
            line_items: vec![
                LineItem {
                    photo_id: PhotoId::new(4),
                    size: PhotoSize::Medium,
                    name: "Harbour at dusk".to_string(),
                    unit_amount: 1250,
                    currency: CurrencyCode::USD,
                },
                LineItem {
                    photo_id: PhotoId::new(9),
                    size: PhotoSize::Large,
                    name: "Rain on glass".to_string(),
                    unit_amount: 800,
                    currency: CurrencyCode::USD,
                },
            ],
            success_url: "https://shop.test/checkout/success?token=tok".to_string(),
            cancel_url: "https://shop.test/checkout/cancel?token=tok".to_string(),
        };

        let params = checkout_form(&request);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("client_reference_id"), Some("tok"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1250"));
        assert_eq!(get("line_items[1][price_data][currency]"), Some("usd"));
        assert_eq!(
            get("line_items[1][price_data][product_data][name]"),
            Some("Rain on glass (Large)")
        );
        assert_eq!(get("line_items[1][quantity]"), Some("1"));
    }
}
