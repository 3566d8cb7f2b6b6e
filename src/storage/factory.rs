//! Adapter Factory
//!
//! Pure configuration selection: maps a store-kind string to an owned
//! adapter instance. Which backends exist is decided at build time by
//! the `store-*` features; an adapter for a kind that was not compiled
//! in is reported the same way as an unknown kind.

use tracing::{error, info};

use crate::config::StorageConfig;

use super::traits::StorageAdapter;

#[cfg(feature = "store-mongodb")]
use super::mongodb_adapter::DocumentStoreAdapter;

#[cfg(feature = "store-sql")]
use super::sql_adapter::RelationalStoreAdapter;

/// Recognized store kinds, each carrying its own default connection
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// MongoDB document store
    MongoDb,
    /// PostgreSQL via the relational adapter
    Postgres,
    /// MySQL via the relational adapter
    MySql,
    /// SQLite via the relational adapter
    Sqlite,
}

impl StoreKind {
    /// Kind names accepted by [`parse`](Self::parse)
    pub const SUPPORTED: &'static [&'static str] =
        &["mongodb", "postgresql", "postgres", "mysql", "sqlite"];

    /// Parse a kind selector, case-insensitively
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "mongodb" => Some(Self::MongoDb),
            "postgresql" | "postgres" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Connection string used when none is configured
    pub fn default_url(self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb://localhost:27017",
            Self::Postgres => "postgres://localhost/mydb",
            Self::MySql => "mysql://root@localhost/mydb",
            Self::Sqlite => "sqlite://mydb.db?mode=rwc",
        }
    }
}

/// Build the storage adapter selected by the configuration.
///
/// Returns `None` for an unknown kind or a kind whose backend is not
/// compiled into this build, logging the supported set. The caller
/// owns the returned adapter and is responsible for its lifecycle.
pub fn create_adapter(config: &StorageConfig) -> Option<Box<dyn StorageAdapter>> {
    let Some(kind) = StoreKind::parse(&config.kind) else {
        error!(
            "Unknown database type: {}. Supported types: {}",
            config.kind,
            StoreKind::SUPPORTED.join(", ")
        );
        return None;
    };

    let url = config.url.as_deref().unwrap_or_else(|| kind.default_url());

    match kind {
        #[cfg(feature = "store-mongodb")]
        StoreKind::MongoDb => {
            info!("Creating MongoDB adapter");
            Some(Box::new(DocumentStoreAdapter::new(
                url,
                &config.mongodb_database,
                &config.mongodb_init_collection,
            )))
        }
        #[cfg(feature = "store-sql")]
        StoreKind::Postgres | StoreKind::MySql | StoreKind::Sqlite => {
            info!("Creating SQL adapter for {:?}", kind);
            Some(Box::new(RelationalStoreAdapter::new(url)))
        }
        #[allow(unreachable_patterns)]
        _ => {
            error!(
                "Store kind '{}' is not compiled into this build",
                config.kind
            );
            None
        }
    }
}
