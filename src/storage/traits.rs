//! Storage Adapter Contract
//!
//! Defines the canonical user record and the trait every storage
//! backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A create or update would violate email uniqueness
    #[error("user with this email already exists")]
    DuplicateEmail,

    /// Connection error during connect or health check
    #[error("connection error: {0}")]
    Connection(String),

    /// A CRUD operation was called before a successful connect
    #[error("storage adapter is not connected")]
    NotConnected,

    /// Any other backend failure; opaque to callers
    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection(message.into())
    }

    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend(message.into())
    }
}

/// The canonical, backend-agnostic user record.
///
/// Every adapter normalizes its native record shape into this form.
/// `id` is the stringified backend-native identifier (document object
/// id or auto-increment integer) and is never supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend-native identifier, stringified; immutable once assigned
    pub id: String,
    /// Display name
    pub name: String,
    /// Unique email; the natural key for lookup, update, and delete
    pub email: String,
    /// Optional age
    pub age: Option<i64>,
}

/// Payload for creating a user. The backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name, required
    pub name: String,
    /// Email, required and unique across all users
    pub email: String,
    /// Optional age
    #[serde(default)]
    pub age: Option<i64>,
}

/// Partial update payload.
///
/// `None` means "leave this field unchanged"; only fields that are
/// present overwrite stored values. The record id can never change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    /// New name, if changing
    #[serde(default)]
    pub name: Option<String>,
    /// New email, if changing; re-checked for uniqueness
    #[serde(default)]
    pub email: Option<String>,
    /// New age, if changing
    #[serde(default)]
    pub age: Option<i64>,
}

impl UserPatch {
    /// True when no field is set; applying it is a no-op.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }
}

/// Core trait for storage adapters
///
/// Lifecycle methods report failure as a value and never error: a
/// `false` from [`connect`](StorageAdapter::connect) means the adapter
/// is unusable, with the cause logged. CRUD methods error only for
/// duplicate emails and unexpected backend failures; "not found" is an
/// absent value, not an error.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Get the backend type name (e.g., "mongodb", "sql")
    fn backend_type(&self) -> &'static str;

    /// Establish the connection, verify reachability, and perform
    /// one-time initialization (base collection/table creation).
    async fn connect(&self) -> bool;

    /// Release the connection. Safe to call at any point, including
    /// after a failed connect.
    async fn disconnect(&self);

    /// Cheap liveness probe; false on any error
    async fn health_check(&self) -> bool;

    /// Insert a user; fails with [`StorageError::DuplicateEmail`] if
    /// the email is already taken. Returns the stored record with its
    /// generated id.
    async fn create_user(&self, user: &NewUser) -> StorageResult<User>;

    /// Return every user, order unspecified
    async fn get_all_users(&self) -> StorageResult<Vec<User>>;

    /// Exact-match lookup; `None` if no user has this email
    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Apply a partial update to the user with this email.
    ///
    /// Returns `None` if no user matches. Changing the email to one
    /// already in use fails with [`StorageError::DuplicateEmail`].
    async fn update_user(&self, email: &str, patch: &UserPatch) -> StorageResult<Option<User>>;

    /// Remove the user with this email; true if a record was deleted
    async fn delete_user(&self, email: &str) -> StorageResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        assert_eq!(
            StorageError::DuplicateEmail.to_string(),
            "user with this email already exists"
        );

        let err = StorageError::connection("refused");
        assert_eq!(err.to_string(), "connection error: refused");

        let err = StorageError::backend("boom");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_patch_absent_fields_deserialize_to_none() {
        let patch: UserPatch = serde_json::from_str(r#"{"age": 31}"#).unwrap();
        assert_eq!(patch.age, Some(31));
        assert!(patch.name.is_none());
        assert!(patch.email.is_none());
        assert!(!patch.is_empty());

        let patch: UserPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_new_user_age_defaults_to_none() {
        let user: NewUser =
            serde_json::from_str(r#"{"name": "Ann", "email": "a@x.com"}"#).unwrap();
        assert_eq!(user.age, None);
    }

    #[test]
    fn test_user_serializes_all_fields() {
        let user = User {
            id: "1".to_string(),
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            age: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        // `age` stays present as null so clients always see the full shape
        assert!(json.get("age").is_some());
        assert_eq!(json["id"], "1");
    }
}
