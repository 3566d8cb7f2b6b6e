//! SQL Storage Adapter
//!
//! Relational implementation of the [`StorageAdapter`] contract on top
//! of a sqlx [`AnyPool`], covering PostgreSQL, MySQL, and SQLite with
//! one adapter. Users live in a typed `users` table with an
//! auto-increment primary key and a `UNIQUE` email column.
//!
//! Each operation acquires a pooled connection for its own duration, so
//! the existence check and the write it guards run on the same
//! connection. The `UNIQUE` constraint is the authoritative uniqueness
//! signal; the pre-check is a fast path.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tokio::sync::RwLock;
use tracing::{error, info};

use super::traits::{NewUser, StorageAdapter, StorageError, StorageResult, User, UserPatch};

/// Pool size for one adapter instance
const MAX_CONNECTIONS: u32 = 5;

/// Bound on the first reachability check at connect time
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL dialect behind the pool, derived from the URL scheme.
///
/// The `any` driver does not translate DDL or bind placeholders, so
/// the few spots where engines disagree are resolved here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlDialect {
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    fn for_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySql)
        } else if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }

    fn create_table_sql(self) -> &'static str {
        match self {
            Self::Postgres => {
                "CREATE TABLE IF NOT EXISTS users ( \
                 id BIGSERIAL PRIMARY KEY, \
                 name VARCHAR(255) NOT NULL, \
                 email VARCHAR(255) NOT NULL UNIQUE, \
                 age BIGINT )"
            }
            Self::MySql => {
                "CREATE TABLE IF NOT EXISTS users ( \
                 id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                 name VARCHAR(255) NOT NULL, \
                 email VARCHAR(255) NOT NULL UNIQUE, \
                 age BIGINT )"
            }
            Self::Sqlite => {
                "CREATE TABLE IF NOT EXISTS users ( \
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 name TEXT NOT NULL, \
                 email TEXT NOT NULL UNIQUE, \
                 age INTEGER )"
            }
        }
    }

    /// Bind placeholder for the n-th parameter (1-based)
    fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }
}

/// Rewrite known scheme synonyms to the scheme the installed driver
/// registers. A scheme carrying an explicit `+driver` qualifier is an
/// operator choice and is passed through untouched.
fn normalize_database_url(url: &str) -> String {
    let scheme = url.split("://").next().unwrap_or("");
    if scheme.contains('+') {
        return url.to_string();
    }

    for (synonym, native) in [
        ("postgresql://", "postgres://"),
        ("mariadb://", "mysql://"),
        ("sqlite3://", "sqlite://"),
    ] {
        if url.starts_with(synonym) {
            return url.replacen(synonym, native, 1);
        }
    }

    url.to_string()
}

fn backend_error(err: sqlx::Error) -> StorageError {
    StorageError::backend(err.to_string())
}

/// Map constraint violations from a write to the duplicate-email error.
fn write_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StorageError::DuplicateEmail;
        }
    }
    backend_error(err)
}

fn row_to_user(row: &AnyRow) -> StorageResult<User> {
    let id: i64 = row.try_get("id").map_err(backend_error)?;
    let name: String = row.try_get("name").map_err(backend_error)?;
    let email: String = row.try_get("email").map_err(backend_error)?;
    let age: Option<i64> = row.try_get("age").map_err(backend_error)?;

    Ok(User {
        id: id.to_string(),
        name,
        email,
        age,
    })
}

/// sqlx-backed relational storage adapter
pub struct RelationalStoreAdapter {
    url: String,
    dialect: Option<SqlDialect>,
    pool: RwLock<Option<AnyPool>>,
}

impl RelationalStoreAdapter {
    /// Create an adapter for the given database URL.
    ///
    /// The URL is normalized immediately; the pool is built in
    /// [`connect`](StorageAdapter::connect).
    pub fn new(url: &str) -> Self {
        let url = normalize_database_url(url);
        let dialect = SqlDialect::for_url(&url);
        Self {
            url,
            dialect,
            pool: RwLock::new(None),
        }
    }

    async fn pool(&self) -> StorageResult<AnyPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or(StorageError::NotConnected)
    }

    fn dialect(&self) -> StorageResult<SqlDialect> {
        self.dialect.ok_or(StorageError::NotConnected)
    }

    fn select_by_email_sql(&self, dialect: SqlDialect) -> String {
        format!(
            "SELECT id, name, email, age FROM users WHERE email = {}",
            dialect.placeholder(1)
        )
    }
}

#[async_trait]
impl StorageAdapter for RelationalStoreAdapter {
    fn backend_type(&self) -> &'static str {
        "sql"
    }

    async fn connect(&self) -> bool {
        let Some(dialect) = self.dialect else {
            error!("Unsupported database URL scheme: {}", self.url);
            return false;
        };

        sqlx::any::install_default_drivers();

        let pool = match AnyPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&self.url)
            .await
        {
            Ok(pool) => pool,
            Err(err) => {
                error!("Failed to connect to SQL database: {}", err);
                return false;
            }
        };

        if let Err(err) = sqlx::query("SELECT 1").execute(&pool).await {
            error!("SQL database reachability check failed: {}", err);
            return false;
        }

        if let Err(err) = sqlx::query(dialect.create_table_sql()).execute(&pool).await {
            error!("Failed to create users table: {}", err);
            return false;
        }

        info!("SQL database connected successfully");
        *self.pool.write().await = Some(pool);
        true
    }

    async fn disconnect(&self) {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            info!("SQL database connection closed");
        }
    }

    async fn health_check(&self) -> bool {
        match self.pool.read().await.clone() {
            Some(pool) => sqlx::query("SELECT 1").execute(&pool).await.is_ok(),
            None => false,
        }
    }

    async fn create_user(&self, user: &NewUser) -> StorageResult<User> {
        let pool = self.pool().await?;
        let dialect = self.dialect()?;
        let mut conn = pool.acquire().await.map_err(backend_error)?;

        let select_sql = self.select_by_email_sql(dialect);
        let existing = sqlx::query(&select_sql)
            .bind(&user.email)
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend_error)?;
        if existing.is_some() {
            return Err(StorageError::DuplicateEmail);
        }

        let insert_sql = format!(
            "INSERT INTO users (name, email, age) VALUES ({}, {}, {})",
            dialect.placeholder(1),
            dialect.placeholder(2),
            dialect.placeholder(3)
        );
        sqlx::query(&insert_sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.age)
            .execute(&mut *conn)
            .await
            .map_err(write_error)?;

        // Re-fetch through the unique email so the caller sees the
        // stored row, generated id included
        let row = sqlx::query(&select_sql)
            .bind(&user.email)
            .fetch_one(&mut *conn)
            .await
            .map_err(backend_error)?;

        row_to_user(&row)
    }

    async fn get_all_users(&self) -> StorageResult<Vec<User>> {
        let pool = self.pool().await?;

        let rows = sqlx::query("SELECT id, name, email, age FROM users")
            .fetch_all(&pool)
            .await
            .map_err(backend_error)?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(row_to_user(row)?);
        }

        Ok(users)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let pool = self.pool().await?;
        let dialect = self.dialect()?;

        let row = sqlx::query(&self.select_by_email_sql(dialect))
            .bind(email)
            .fetch_optional(&pool)
            .await
            .map_err(backend_error)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_user(&self, email: &str, patch: &UserPatch) -> StorageResult<Option<User>> {
        let pool = self.pool().await?;
        let dialect = self.dialect()?;
        let mut conn = pool.acquire().await.map_err(backend_error)?;

        let select_sql = self.select_by_email_sql(dialect);
        let existing = sqlx::query(&select_sql)
            .bind(email)
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend_error)?;
        if existing.is_none() {
            return Ok(None);
        }

        if let Some(new_email) = &patch.email {
            if new_email != email {
                let taken = sqlx::query(&select_sql)
                    .bind(new_email)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(backend_error)?;
                if taken.is_some() {
                    return Err(StorageError::DuplicateEmail);
                }
            }
        }

        if !patch.is_empty() {
            // Only fields present in the patch appear in the SET list;
            // the bind order below must match this construction order
            let mut assignments = Vec::new();
            let mut n = 1;
            if patch.name.is_some() {
                assignments.push(format!("name = {}", dialect.placeholder(n)));
                n += 1;
            }
            if patch.email.is_some() {
                assignments.push(format!("email = {}", dialect.placeholder(n)));
                n += 1;
            }
            if patch.age.is_some() {
                assignments.push(format!("age = {}", dialect.placeholder(n)));
                n += 1;
            }
            let update_sql = format!(
                "UPDATE users SET {} WHERE email = {}",
                assignments.join(", "),
                dialect.placeholder(n)
            );

            let mut query = sqlx::query(&update_sql);
            if let Some(name) = &patch.name {
                query = query.bind(name);
            }
            if let Some(new_email) = &patch.email {
                query = query.bind(new_email);
            }
            if let Some(age) = patch.age {
                query = query.bind(age);
            }
            query
                .bind(email)
                .execute(&mut *conn)
                .await
                .map_err(write_error)?;
        }

        // The lookup key may itself have changed
        let current_email = patch.email.as_deref().unwrap_or(email);
        let row = sqlx::query(&select_sql)
            .bind(current_email)
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend_error)?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete_user(&self, email: &str) -> StorageResult<bool> {
        let pool = self.pool().await?;
        let dialect = self.dialect()?;

        let delete_sql = format!("DELETE FROM users WHERE email = {}", dialect.placeholder(1));
        let result = sqlx::query(&delete_sql)
            .bind(email)
            .execute(&pool)
            .await
            .map_err(backend_error)?;

        Ok(result.rows_affected() > 0)
    }
}
