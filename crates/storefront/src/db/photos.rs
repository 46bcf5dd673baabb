//! Photo catalog lookups.
//!
//! `catalog.photo` belongs to the catalog; the shop reads it and the CLI
//! seeds it for development.

use rust_decimal::Decimal;
use sqlx::PgPool;

use photostock_core::{CurrencyCode, PhotoId, Price};

use super::RepositoryError;
use crate::models::Photo;
use crate::services::Catalog;

#[derive(Debug, sqlx::FromRow)]
struct PhotoRow {
    id: PhotoId,
    caption: String,
    price: Decimal,
    image_url: String,
}

impl PhotoRow {
    fn into_photo(self, currency: CurrencyCode) -> Photo {
        Photo {
            id: self.id,
            caption: self.caption,
            price: Price::new(self.price, currency),
            image_url: self.image_url,
        }
    }
}

/// A catalog entry to insert or overwrite.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PhotoSeed {
    pub id: PhotoId,
    pub caption: String,
    pub price: Decimal,
    pub image_url: String,
}

/// Repository for catalog photos.
pub struct PhotoRepository<'a> {
    pool: &'a PgPool,
    currency: CurrencyCode,
}

impl<'a> PhotoRepository<'a> {
    /// Create a repository pricing photos in `currency`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }

    /// Insert or overwrite catalog entries, keeping the id sequence ahead of them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    pub async fn upsert_many(&self, seeds: &[PhotoSeed]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for seed in seeds {
            written += sqlx::query(
                r"
                INSERT INTO catalog.photo (id, caption, price, image_url)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                SET caption = EXCLUDED.caption,
                    price = EXCLUDED.price,
                    image_url = EXCLUDED.image_url
                ",
            )
            .bind(seed.id)
            .bind(&seed.caption)
            .bind(seed.price)
            .bind(&seed.image_url)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        sqlx::query(
            r"
            SELECT setval(
                pg_get_serial_sequence('catalog.photo', 'id'),
                GREATEST((SELECT MAX(id) FROM catalog.photo), 1)
            )
            ",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(written)
    }
}

impl Catalog for PhotoRepository<'_> {
    async fn find_photo(&self, id: PhotoId) -> Result<Option<Photo>, RepositoryError> {
        let row = sqlx::query_as::<_, PhotoRow>(
            r"
            SELECT id, caption, price, image_url
            FROM catalog.photo
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| r.into_photo(self.currency)))
    }

    async fn find_photos(&self, ids: &[PhotoId]) -> Result<Vec<Photo>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(PhotoId::as_i32).collect();

        let rows = sqlx::query_as::<_, PhotoRow>(
            r"
            SELECT id, caption, price, image_url
            FROM catalog.photo
            WHERE id = ANY($1)
            ",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_photo(self.currency))
            .collect())
    }
}
