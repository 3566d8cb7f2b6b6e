//! User Store - a small user CRUD service with pluggable storage
//!
//! The core of this crate is the [`storage::StorageAdapter`] contract:
//! lifecycle management (connect/disconnect/health-check) plus five user
//! operations, implemented against structurally different backends that
//! all normalize to one canonical [`storage::User`] record:
//!
//! - **`store-mongodb`** - document-store adapter backed by MongoDB
//! - **`store-sql`** - relational adapter backed by sqlx (PostgreSQL,
//!   MySQL, or SQLite behind one pool)
//! - **`server`** - the HTTP surface and the `userstore` binary
//!
//! # Features
//!
//! All backends are on by default; trim to what you deploy:
//!
//! ```toml
//! [dependencies]
//! userstore = { version = "0.3", default-features = false, features = ["store-sql"] }
//! ```
//!
//! # Example: selecting an adapter from configuration
//!
//! ```ignore
//! use userstore::config::StorageConfig;
//! use userstore::storage::create_adapter;
//!
//! # async fn example() {
//! let config = StorageConfig::from_env();
//! let adapter = create_adapter(&config).expect("unsupported store kind");
//!
//! if adapter.connect().await {
//!     let users = adapter.get_all_users().await.unwrap();
//!     println!("{} users", users.len());
//!     adapter.disconnect().await;
//! }
//! # }
//! ```

#![warn(missing_docs)]

/// Configuration loading from environment variables
pub mod config;

/// Storage adapter contract and backend implementations
pub mod storage;

/// HTTP layer (enabled with the `server` feature)
#[cfg(feature = "server")]
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::StorageConfig;
    pub use crate::storage::{
        create_adapter, NewUser, StorageAdapter, StorageError, StorageResult, StoreKind, User,
        UserPatch,
    };

    #[cfg(feature = "store-mongodb")]
    pub use crate::storage::DocumentStoreAdapter;

    #[cfg(feature = "store-sql")]
    pub use crate::storage::RelationalStoreAdapter;
}
