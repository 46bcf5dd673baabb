//! Photostock Core - Shared types library.
//!
//! This crate provides common types used across all Photostock components:
//! - `storefront` - Public-facing photo shop (cart, checkout, customer area)
//! - `cli` - Command-line tools for migrations, catalog seeding and groups
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails, photo sizes and checkout states

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
