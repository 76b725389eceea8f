//! SQLite storage implementation for Tickerlens.
//!
//! This crate holds every Diesel dependency of the workspace. It implements
//! the durable tier of the core crate's two-tier cache and contains:
//! - Connection pooling and the single writer actor
//! - Embedded Diesel migrations
//! - The `cache_entries` repository ([`SqliteCacheStore`])
//!
//! ```text
//! core (CacheStore trait)
//!          │
//!          ▼
//!  storage-sqlite (this crate)
//!          │
//!          ▼
//!      SQLite DB
//! ```

pub mod cache;
pub mod db;
pub mod errors;
pub mod schema;

pub use cache::SqliteCacheStore;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from tickerlens-core for convenience
pub use tickerlens_core::errors::{DatabaseError, Error, Result};
