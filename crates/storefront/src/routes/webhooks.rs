//! Payment provider webhook endpoint.
//!
//! No session or login: the signature over the raw body is the only
//! authentication. The body is taken as bytes so it is verified exactly as
//! sent.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info, instrument, warn};

use crate::config::secret_bytes;
use crate::payments::stripe::SIGNATURE_HEADER;
use crate::services::webhook::{self, WebhookError};
use crate::state::AppState;

/// Handle `POST /webhooks/stripe`.
///
/// 400 for unsigned or malformed deliveries, 500 when the entitlement write
/// fails so the provider retries, 200 for everything else.
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn stripe(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let result = webhook::process(
        &state.checkouts(),
        secret_bytes(&state.config().stripe.webhook_secret),
        &body,
        signature,
        chrono::Utc::now().timestamp(),
    )
    .await;

    match result {
        Ok(outcome) => {
            info!(?outcome, "Webhook processed");
            StatusCode::OK.into_response()
        }
        Err(e @ WebhookError::Storage(_)) => {
            let event_id = sentry::capture_error(&e);
            error!(error = %e, sentry_event_id = %event_id, "Webhook storage failure");
            e.status().into_response()
        }
        Err(e) => {
            warn!(error = %e, "Webhook rejected");
            (e.status(), e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, extract::Request, routing::post};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::payments::stripe::signature_header;
    use crate::state::tests::test_state;

    async fn deliver(body: Vec<u8>, signature: Option<String>) -> StatusCode {
        let state = test_state();
        let app = Router::new()
            .route("/webhooks/stripe", post(stripe))
            .with_state(state);

        let mut request = Request::builder().method("POST").uri("/webhooks/stripe");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        let response = app
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        response.status()
    }

    fn sign(body: &[u8], timestamp: i64) -> String {
        let state = test_state();
        signature_header(
            secret_bytes(&state.config().stripe.webhook_secret),
            timestamp,
            body,
        )
    }

    fn unrelated_event() -> Vec<u8> {
        json!({
            "id": "evt_route",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn signed_event_is_acknowledged() {
        let body = unrelated_event();
        let signature = sign(&body, chrono::Utc::now().timestamp());
        assert_eq!(deliver(body, Some(signature)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn unsigned_forged_and_stale_deliveries_are_bad_requests() {
        let body = unrelated_event();
        assert_eq!(deliver(body.clone(), None).await, StatusCode::BAD_REQUEST);

        let forged = signature_header(b"whsec_not_ours", chrono::Utc::now().timestamp(), &body);
        assert_eq!(
            deliver(body.clone(), Some(forged)).await,
            StatusCode::BAD_REQUEST
        );

        let stale = sign(&body, chrono::Utc::now().timestamp() - 3_600);
        assert_eq!(deliver(body, Some(stale)).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signed_garbage_is_a_bad_request() {
        let body = b"not json".to_vec();
        let signature = sign(&body, chrono::Utc::now().timestamp());
        assert_eq!(deliver(body, Some(signature)).await, StatusCode::BAD_REQUEST);
    }
}
