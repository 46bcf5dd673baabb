//! Checkout records and download entitlements.
//!
//! A checkout row is the server-held copy of the correlation token plus the
//! cart snapshot it was opened with. Fulfilment claims the row with a
//! conditional update and writes entitlements in the same transaction, so
//! concurrent success-page and webhook deliveries record each line once.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::warn;

use photostock_core::{CheckoutState, CustomerId, PhotoId, PhotoSize};

use super::RepositoryError;
use crate::models::{CartLine, CheckoutRecord, CorrelationToken, Download};
use crate::services::fulfillment::ClaimResult;
use crate::services::{CheckoutStore, EntitlementStore};

#[derive(Debug, sqlx::FromRow)]
struct CheckoutRow {
    token: String,
    customer_id: CustomerId,
    provider_session_id: Option<String>,
    lines: Json<Vec<CartLine>>,
    state: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CheckoutRow> for CheckoutRecord {
    type Error = RepositoryError;

    fn try_from(row: CheckoutRow) -> Result<Self, Self::Error> {
        Ok(Self {
            token: CorrelationToken::from_stored(row.token),
            customer_id: row.customer_id,
            provider_session_id: row.provider_session_id,
            lines: row.lines.0,
            state: parse_state(&row.state)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ClaimedRow {
    customer_id: CustomerId,
    lines: Json<Vec<CartLine>>,
}

#[derive(Debug, sqlx::FromRow)]
struct DownloadRow {
    photo_id: PhotoId,
    caption: String,
    image_url: String,
    size: String,
    created_at: DateTime<Utc>,
}

fn parse_state(raw: &str) -> Result<CheckoutState, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("checkout state: {e}")))
}

/// Repository for checkouts and the entitlements they produce.
pub struct CheckoutRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl CheckoutStore for CheckoutRepository<'_> {
    async fn insert_pending(
        &self,
        token: &CorrelationToken,
        customer_id: CustomerId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.checkout (token, customer_id, lines, state)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(token.as_str())
        .bind(customer_id)
        .bind(Json(lines))
        .bind(CheckoutState::Created.as_str())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "checkout"))?;

        Ok(())
    }

    async fn attach_provider_session(
        &self,
        token: &CorrelationToken,
        provider_session_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.checkout
            SET provider_session_id = $2, updated_at = now()
            WHERE token = $1
            ",
        )
        .bind(token.as_str())
        .bind(provider_session_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<CheckoutRecord>, RepositoryError> {
        sqlx::query_as::<_, CheckoutRow>(
            r"
            SELECT token, customer_id, provider_session_id, lines, state, created_at
            FROM storefront.checkout
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?
        .map(CheckoutRecord::try_from)
        .transpose()
    }

    async fn transition(&self, token: &str, state: CheckoutState) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.checkout
            SET state = $2, updated_at = now()
            WHERE token = $1
              AND state IN ('created', 'pending_verification')
            ",
        )
        .bind(token)
        .bind(state.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl EntitlementStore for CheckoutRepository<'_> {
    async fn claim_and_record(&self, token: &str) -> Result<ClaimResult, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, ClaimedRow>(
            r"
            UPDATE storefront.checkout
            SET state = 'fulfilled', fulfilled_at = now(), updated_at = now()
            WHERE token = $1
              AND state IN ('created', 'pending_verification')
            RETURNING customer_id, lines
            ",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(claimed) = claimed else {
            let state: Option<String> =
                sqlx::query_scalar("SELECT state FROM storefront.checkout WHERE token = $1")
                    .bind(token)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return match state {
                Some(raw) => Ok(ClaimResult::NotOpen(parse_state(&raw)?)),
                None => Ok(ClaimResult::NotFound),
            };
        };

        let mut recorded = 0;
        for line in &claimed.lines.0 {
            // The snapshot predates fulfilment; a photo may have left the catalog since.
            let result = sqlx::query(
                r"
                INSERT INTO storefront.download (customer_id, photo_id, size, checkout_token)
                SELECT $1, p.id, $3, $4
                FROM catalog.photo p
                WHERE p.id = $2
                ON CONFLICT (checkout_token, photo_id) DO NOTHING
                ",
            )
            .bind(claimed.customer_id)
            .bind(line.photo_id)
            .bind(line.size.code())
            .bind(token)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let in_catalog: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM catalog.photo WHERE id = $1)",
                )
                .bind(line.photo_id)
                .fetch_one(&mut *tx)
                .await?;
                if !in_catalog {
                    warn!(
                        photo_id = %line.photo_id,
                        customer_id = %claimed.customer_id,
                        "Skipped entitlement for photo no longer in the catalog"
                    );
                }
            }
            recorded += usize::try_from(result.rows_affected()).unwrap_or(0);
        }

        tx.commit().await?;
        Ok(ClaimResult::Recorded(recorded))
    }

    async fn downloads(&self, customer_id: CustomerId) -> Result<Vec<Download>, RepositoryError> {
        let rows = sqlx::query_as::<_, DownloadRow>(
            r"
            SELECT d.photo_id, p.caption, p.image_url, d.size, d.created_at
            FROM storefront.download d
            JOIN catalog.photo p ON p.id = d.photo_id
            WHERE d.customer_id = $1
            ORDER BY d.created_at DESC, d.id DESC
            ",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let size: PhotoSize = r.size.parse().map_err(RepositoryError::DataCorruption)?;
                Ok(Download {
                    photo_id: r.photo_id,
                    caption: r.caption,
                    image_url: r.image_url,
                    size,
                    purchased_at: r.created_at,
                })
            })
            .collect()
    }
}
