//! Favourite photos repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use photostock_core::{CustomerId, PhotoId};

use super::RepositoryError;
use crate::models::FavouritePhoto;
use crate::services::FavouriteStore;

#[derive(Debug, sqlx::FromRow)]
struct FavouriteRow {
    photo_id: PhotoId,
    caption: String,
    image_url: String,
    created_at: DateTime<Utc>,
}

pub struct FavouriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavouriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl FavouriteStore for FavouriteRepository<'_> {
    async fn add_favourite(
        &self,
        customer_id: CustomerId,
        photo_id: PhotoId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.favourite (customer_id, photo_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(customer_id)
        .bind(photo_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_favourite(
        &self,
        customer_id: CustomerId,
        photo_id: PhotoId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.favourite
            WHERE customer_id = $1 AND photo_id = $2
            ",
        )
        .bind(customer_id)
        .bind(photo_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_favourites(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<FavouritePhoto>, RepositoryError> {
        let rows = sqlx::query_as::<_, FavouriteRow>(
            r"
            SELECT f.photo_id, p.caption, p.image_url, f.created_at
            FROM storefront.favourite f
            JOIN catalog.photo p ON p.id = f.photo_id
            WHERE f.customer_id = $1
            ORDER BY f.created_at DESC
            ",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| FavouritePhoto {
                photo_id: r.photo_id,
                caption: r.caption,
                image_url: r.image_url,
                favourited_at: r.created_at,
            })
            .collect())
    }
}
