//! Customer profile repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use photostock_core::{CustomerId, Email, UserId};

use super::RepositoryError;
use crate::models::{CustomerProfile, ProfileInput};
use crate::services::ProfileStore;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    user_id: UserId,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for CustomerProfile {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email,
            phone: row.phone,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for customer profiles.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ProfileStore for CustomerRepository<'_> {
    async fn find_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, user_id, first_name, last_name, email, phone, country,
                   created_at, updated_at
            FROM storefront.customer
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .map(CustomerProfile::try_from)
        .transpose()
    }

    async fn create(
        &self,
        user_id: UserId,
        input: &ProfileInput,
    ) -> Result<CustomerProfile, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO storefront.customer
                (user_id, first_name, last_name, email, phone, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, first_name, last_name, email, phone, country,
                      created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.email.as_str())
        .bind(input.phone.as_deref())
        .bind(&input.country)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "customer profile"))?;

        row.try_into()
    }

    async fn update(
        &self,
        customer_id: CustomerId,
        input: &ProfileInput,
    ) -> Result<CustomerProfile, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            UPDATE storefront.customer
            SET first_name = $2,
                last_name = $3,
                email = $4,
                phone = $5,
                country = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, first_name, last_name, email, phone, country,
                      created_at, updated_at
            ",
        )
        .bind(customer_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.email.as_str())
        .bind(input.phone.as_deref())
        .bind(&input.country)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
