//! MongoDB Storage Adapter
//!
//! Document-store implementation of the [`StorageAdapter`] contract.
//! Users live in a `users` collection keyed by the generated `_id`,
//! with `email` as the application-level unique key.
//!
//! Uniqueness is backed by a unique index on `email` created at
//! connect time; the find-before-insert check is a fast path, and the
//! driver's duplicate-key error is the authoritative signal.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use tokio::sync::RwLock;
use tracing::{error, info};

use super::traits::{NewUser, StorageAdapter, StorageError, StorageResult, User, UserPatch};

/// Collection holding user documents
const USERS_COLLECTION: &str = "users";

/// Bound on the first reachability check at connect time
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// MongoDB-backed storage adapter
pub struct DocumentStoreAdapter {
    uri: String,
    database: String,
    init_collection: String,
    client: RwLock<Option<Client>>,
}

impl DocumentStoreAdapter {
    /// Create an adapter for the given connection string and database.
    ///
    /// No I/O happens here; the client is built in
    /// [`connect`](StorageAdapter::connect). `init_collection` names
    /// the collection created as a connectivity probe.
    pub fn new(uri: &str, database: &str, init_collection: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            init_collection: init_collection.to_string(),
            client: RwLock::new(None),
        }
    }

    /// Handle to the users collection, or `NotConnected`.
    async fn users(&self) -> StorageResult<Collection<Document>> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(StorageError::NotConnected)?;
        Ok(client
            .database(&self.database)
            .collection::<Document>(USERS_COLLECTION))
    }
}

/// True for driver errors caused by a unique-index violation.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}

fn write_error(err: mongodb::error::Error) -> StorageError {
    if is_duplicate_key(&err) {
        StorageError::DuplicateEmail
    } else {
        StorageError::backend(err.to_string())
    }
}

/// Convert a stored document to the canonical record.
///
/// Total over legacy or partially-written documents: every missing
/// field gets a defined default instead of failing the conversion.
fn document_to_user(doc: &Document) -> User {
    let id = match doc.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let age = match doc.get("age") {
        Some(Bson::Int32(v)) => Some(i64::from(*v)),
        Some(Bson::Int64(v)) => Some(*v),
        _ => None,
    };

    User {
        id,
        name: doc.get_str("name").unwrap_or("").to_string(),
        email: doc.get_str("email").unwrap_or("").to_string(),
        age,
    }
}

fn new_user_to_document(user: &NewUser) -> Document {
    let mut doc = doc! {
        "name": &user.name,
        "email": &user.email,
    };
    if let Some(age) = user.age {
        doc.insert("age", age);
    }
    doc
}

/// Build the `$set` document from the fields present in the patch.
fn patch_to_set_document(patch: &UserPatch) -> Document {
    let mut set = Document::new();
    if let Some(name) = &patch.name {
        set.insert("name", name);
    }
    if let Some(email) = &patch.email {
        set.insert("email", email);
    }
    if let Some(age) = patch.age {
        set.insert("age", age);
    }
    set
}

#[async_trait]
impl StorageAdapter for DocumentStoreAdapter {
    fn backend_type(&self) -> &'static str {
        "mongodb"
    }

    async fn connect(&self) -> bool {
        let mut options = match ClientOptions::parse(&self.uri).await {
            Ok(options) => options,
            Err(err) => {
                error!("Failed to parse MongoDB connection string: {}", err);
                return false;
            }
        };
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let client = match Client::with_options(options) {
            Ok(client) => client,
            Err(err) => {
                error!("Failed to build MongoDB client: {}", err);
                return false;
            }
        };

        let db = client.database(&self.database);
        if let Err(err) = db.run_command(doc! { "ping": 1 }).await {
            error!("Failed to connect to MongoDB: {}", err);
            return false;
        }

        // Connectivity probe; an already-exists error is fine
        let _ = db.create_collection(&self.init_collection).await;

        // The unique index is the source of truth for email uniqueness
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        if let Err(err) = db
            .collection::<Document>(USERS_COLLECTION)
            .create_index(index)
            .await
        {
            error!("Failed to create unique email index: {}", err);
            return false;
        }

        info!("MongoDB connected successfully to database: {}", self.database);
        *self.client.write().await = Some(client);
        true
    }

    async fn disconnect(&self) {
        if let Some(client) = self.client.write().await.take() {
            client.shutdown().await;
            info!("MongoDB connection closed");
        }
    }

    async fn health_check(&self) -> bool {
        let guard = self.client.read().await;
        match guard.as_ref() {
            Some(client) => client
                .database(&self.database)
                .run_command(doc! { "ping": 1 })
                .await
                .is_ok(),
            None => false,
        }
    }

    async fn create_user(&self, user: &NewUser) -> StorageResult<User> {
        let users = self.users().await?;

        let existing = users
            .find_one(doc! { "email": &user.email })
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?;
        if existing.is_some() {
            return Err(StorageError::DuplicateEmail);
        }

        let insert_result = users
            .insert_one(new_user_to_document(user))
            .await
            .map_err(write_error)?;

        // Re-fetch by the generated id so the caller sees the stored
        // form, not a driver-side echo
        let created = users
            .find_one(doc! { "_id": insert_result.inserted_id })
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?
            .ok_or_else(|| StorageError::backend("inserted user missing on re-fetch"))?;

        Ok(document_to_user(&created))
    }

    async fn get_all_users(&self) -> StorageResult<Vec<User>> {
        let users = self.users().await?;

        let mut cursor = users
            .find(doc! {})
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?;

        let mut result = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?
        {
            result.push(document_to_user(&doc));
        }

        Ok(result)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let users = self.users().await?;

        let doc = users
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?;

        Ok(doc.map(|d| document_to_user(&d)))
    }

    async fn update_user(&self, email: &str, patch: &UserPatch) -> StorageResult<Option<User>> {
        let users = self.users().await?;

        let existing = users
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?;
        if existing.is_none() {
            return Ok(None);
        }

        if let Some(new_email) = &patch.email {
            if new_email != email {
                let taken = users
                    .find_one(doc! { "email": new_email })
                    .await
                    .map_err(|e| StorageError::backend(e.to_string()))?;
                if taken.is_some() {
                    return Err(StorageError::DuplicateEmail);
                }
            }
        }

        let set = patch_to_set_document(patch);
        if !set.is_empty() {
            users
                .update_one(doc! { "email": email }, doc! { "$set": set })
                .await
                .map_err(write_error)?;
        }

        // The lookup key may itself have changed
        let current_email = patch.email.as_deref().unwrap_or(email);
        let updated = users
            .find_one(doc! { "email": current_email })
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?;

        Ok(updated.map(|d| document_to_user(&d)))
    }

    async fn delete_user(&self, email: &str) -> StorageResult<bool> {
        let users = self.users().await?;

        let result = users
            .delete_one(doc! { "email": email })
            .await
            .map_err(|e| StorageError::backend(e.to_string()))?;

        Ok(result.deleted_count == 1)
    }
}
