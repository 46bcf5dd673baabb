//! Group membership for externally managed user accounts.

use sqlx::PgPool;

use photostock_core::UserId;

use super::RepositoryError;
use crate::services::GroupDirectory;

pub struct GroupRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add `user_id` to `group`. Returns `false` if they were already a member.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn grant(&self, user_id: UserId, group: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.user_group (user_id, group_name)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(group)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove `user_id` from `group`. Returns `false` if they were not a member.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn revoke(&self, user_id: UserId, group: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.user_group
            WHERE user_id = $1 AND group_name = $2
            ",
        )
        .bind(user_id)
        .bind(group)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl GroupDirectory for GroupRepository<'_> {
    async fn is_member(&self, user_id: UserId, group: &str) -> Result<bool, RepositoryError> {
        let member: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storefront.user_group
                WHERE user_id = $1 AND group_name = $2
            )
            ",
        )
        .bind(user_id)
        .bind(group)
        .fetch_one(self.pool)
        .await?;

        Ok(member)
    }
}
