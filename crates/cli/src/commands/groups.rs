//! Group membership commands.
//!
//! Running storefronts cache membership answers, so a change here is seen
//! within the configured refresh interval (`CAPABILITY_REFRESH_SECS`).

use photostock_core::UserId;
use photostock_storefront::db::GroupRepository;

use super::connect;

/// Add `user_id` to `group`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the insert fails.
pub async fn grant(user_id: UserId, group: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    if GroupRepository::new(&pool).grant(user_id, group).await? {
        tracing::info!(%user_id, group, "Membership granted");
    } else {
        tracing::info!(%user_id, group, "Already a member");
    }
    Ok(())
}

/// Remove `user_id` from `group`.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn revoke(user_id: UserId, group: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    if GroupRepository::new(&pool).revoke(user_id, group).await? {
        tracing::info!(%user_id, group, "Membership revoked");
    } else {
        tracing::warn!(%user_id, group, "Was not a member");
    }
    Ok(())
}
