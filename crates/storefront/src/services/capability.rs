//! Cached customers-group capability.
//!
//! Group membership lives in the database and changes rarely, so each user's
//! answer is cached and re-read from the directory once the entry expires.
//! Revocations therefore take effect within one refresh interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use photostock_core::UserId;

use crate::db::RepositoryError;

/// Source of truth for group membership.
pub trait GroupDirectory {
    fn is_member(
        &self,
        user_id: UserId,
        group: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

const MAX_CACHED_USERS: u64 = 10_000;

/// Per-user cache of "belongs to the customers group".
#[derive(Clone)]
pub struct CapabilityCache {
    inner: Arc<CapabilityCacheInner>,
}

struct CapabilityCacheInner {
    group: String,
    cache: Cache<UserId, bool>,
}

impl CapabilityCache {
    #[must_use]
    pub fn new(group: impl Into<String>, refresh: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_USERS)
            .time_to_live(refresh)
            .build();

        Self {
            inner: Arc::new(CapabilityCacheInner {
                group: group.into(),
                cache,
            }),
        }
    }

    /// Name of the group this cache answers for.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.inner.group
    }

    /// Whether `user_id` holds the customer capability.
    ///
    /// Lookup failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns the directory's error on a cache miss that cannot be resolved.
    pub async fn is_customer<D>(&self, directory: &D, user_id: UserId) -> Result<bool, RepositoryError>
    where
        D: GroupDirectory + Sync,
    {
        if let Some(allowed) = self.inner.cache.get(&user_id).await {
            return Ok(allowed);
        }

        let allowed = directory.is_member(user_id, &self.inner.group).await?;
        debug!(%user_id, allowed, "Capability refreshed");
        self.inner.cache.insert(user_id, allowed).await;
        Ok(allowed)
    }

    /// Forget the cached answer, e.g. right after a grant or revoke.
    pub async fn invalidate(&self, user_id: UserId) {
        self.inner.cache.invalidate(&user_id).await;
    }
}
