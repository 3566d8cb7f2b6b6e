//! Configuration loading
//!
//! Everything is read from the environment once, into explicit config
//! structs that the caller owns and threads through; nothing in this
//! crate consults ambient globals after startup. `.env` loading is the
//! binary's job (`dotenv` in `main`), so library users and tests see
//! only the real process environment.

use std::env;

use crate::storage::StoreKind;

/// Configuration for constructing a storage adapter.
///
/// `url: None` means "use the kind-specific default"; resolution
/// happens in the factory so the defaulting rules live next to the
/// kinds they belong to.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Store kind selector (e.g. "mongodb", "postgres"); case-insensitive
    pub kind: String,
    /// Explicit connection string, overriding the kind default
    pub url: Option<String>,
    /// Logical database within the document store
    pub mongodb_database: String,
    /// Collection created as a connectivity probe during connect
    pub mongodb_init_collection: String,
}

impl StorageConfig {
    /// Read the storage configuration from environment variables.
    ///
    /// `DB_TYPE` selects the kind (default `mongodb`). The connection
    /// string comes from `MONGODB_URI` for the document store, and
    /// from `DATABASE_URL` with kind-specific fallbacks
    /// (`POSTGRES_URL`, `MYSQL_URL`, `SQLITE_URL`) for the relational
    /// kinds.
    pub fn from_env() -> Self {
        let kind = env::var("DB_TYPE").unwrap_or_else(|_| "mongodb".to_string());

        let url = match StoreKind::parse(&kind) {
            Some(StoreKind::MongoDb) => env::var("MONGODB_URI").ok(),
            Some(StoreKind::Postgres) => env::var("DATABASE_URL")
                .or_else(|_| env::var("POSTGRES_URL"))
                .ok(),
            Some(StoreKind::MySql) => env::var("DATABASE_URL")
                .or_else(|_| env::var("MYSQL_URL"))
                .ok(),
            Some(StoreKind::Sqlite) => env::var("DATABASE_URL")
                .or_else(|_| env::var("SQLITE_URL"))
                .ok(),
            None => env::var("DATABASE_URL").ok(),
        };

        Self {
            kind,
            url,
            mongodb_database: env::var("MONGODB_DB").unwrap_or_else(|_| "dummydatabase".to_string()),
            mongodb_init_collection: env::var("MONGODB_INIT_COLLECTION")
                .unwrap_or_else(|_| "init".to_string()),
        }
    }
}

/// Configuration for the HTTP server.
#[cfg(feature = "server")]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to
    pub bind_addr: String,
}

#[cfg(feature = "server")]
impl ServerConfig {
    /// Read the server configuration from `BIND_ADDR`
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment manipulation is kept inside a single test to avoid
    // races with parallel test threads.
    #[test]
    fn test_storage_config_from_env() {
        env::remove_var("DB_TYPE");
        env::remove_var("MONGODB_URI");
        env::remove_var("DATABASE_URL");
        env::remove_var("POSTGRES_URL");
        env::remove_var("MONGODB_DB");
        env::remove_var("MONGODB_INIT_COLLECTION");

        let config = StorageConfig::from_env();
        assert_eq!(config.kind, "mongodb");
        assert_eq!(config.url, None);
        assert_eq!(config.mongodb_database, "dummydatabase");
        assert_eq!(config.mongodb_init_collection, "init");

        env::set_var("DB_TYPE", "postgres");
        env::set_var("POSTGRES_URL", "postgres://db.internal/users");
        let config = StorageConfig::from_env();
        assert_eq!(config.kind, "postgres");
        assert_eq!(
            config.url.as_deref(),
            Some("postgres://db.internal/users")
        );

        // DATABASE_URL wins over the kind-specific variable
        env::set_var("DATABASE_URL", "postgres://primary/users");
        let config = StorageConfig::from_env();
        assert_eq!(config.url.as_deref(), Some("postgres://primary/users"));

        env::remove_var("DB_TYPE");
        env::remove_var("DATABASE_URL");
        env::remove_var("POSTGRES_URL");
    }
}
