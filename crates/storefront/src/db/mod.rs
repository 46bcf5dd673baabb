//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `photostock`
//!
//! ## Tables
//!
//! - `catalog.photo` - Photo catalog (owned by the catalog team, read-only here)
//! - `storefront.user_group` - Group membership for the external user accounts
//! - `storefront.customer` - Customer profiles, 1:1 with users
//! - `storefront.checkout` - Checkout records keyed by correlation token
//! - `storefront.download` - Download entitlements (append-only)
//! - `storefront.favourite` - Customer/photo bookmarks
//! - `tower_sessions.session` - Session storage (carts live here)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p photostock-cli -- migrate
//! ```

pub mod checkouts;
pub mod customers;
pub mod favourites;
pub mod groups;
pub mod photos;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use checkouts::CheckoutRepository;
pub use customers::CustomerRepository;
pub use favourites::FavouriteRepository;
pub use groups::GroupRepository;
pub use photos::{PhotoRepository, PhotoSeed};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a second profile for the same user).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
