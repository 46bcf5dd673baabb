//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    CheckoutRepository, CustomerRepository, FavouriteRepository, GroupRepository, PhotoRepository,
};
use crate::payments::{PaymentError, StripeClient};
use crate::services::{CapabilityCache, CheckoutUrls};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    stripe: StripeClient,
    capabilities: CapabilityCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, PaymentError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let capabilities =
            CapabilityCache::new(config.customer_group.clone(), config.capability_refresh);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                capabilities,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    #[must_use]
    pub fn capabilities(&self) -> &CapabilityCache {
        &self.inner.capabilities
    }

    #[must_use]
    pub fn photos(&self) -> PhotoRepository<'_> {
        PhotoRepository::new(&self.inner.pool, self.inner.config.stripe.currency)
    }

    #[must_use]
    pub fn checkouts(&self) -> CheckoutRepository<'_> {
        CheckoutRepository::new(&self.inner.pool)
    }

    #[must_use]
    pub fn customers(&self) -> CustomerRepository<'_> {
        CustomerRepository::new(&self.inner.pool)
    }

    #[must_use]
    pub fn favourites(&self) -> FavouriteRepository<'_> {
        FavouriteRepository::new(&self.inner.pool)
    }

    #[must_use]
    pub fn groups(&self) -> GroupRepository<'_> {
        GroupRepository::new(&self.inner.pool)
    }

    /// Return URLs and currency for new checkouts.
    #[must_use]
    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls {
            base_url: self.inner.config.base_url.clone(),
            currency: self.inner.config.stripe.currency,
        }
    }
}
