//! HTTP layer
//!
//! Thin axum surface over the storage adapter. The interesting rule is
//! the failure mapping: duplicate email is the one caller-facing
//! storage failure (400); lookup misses are 404; a missing or
//! unreachable adapter is 503; everything else is an opaque 500 whose
//! detail goes to the log, not the response body.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info, warn};

use crate::storage::{NewUser, StorageAdapter, StorageError, User, UserPatch};

/// Shared application state.
///
/// `store` is `None` when the startup connect failed; the service
/// still comes up and answers 503 on every data route, matching the
/// health-probe contract.
#[derive(Clone)]
pub struct AppState {
    /// The storage adapter, if startup connected successfully
    pub store: Option<Arc<dyn StorageAdapter>>,
}

impl AppState {
    fn store(&self) -> Result<&Arc<dyn StorageAdapter>, ApiError> {
        self.store.as_ref().ok_or(ApiError::Unavailable)
    }
}

/// Failure kinds a handler can produce, each with a fixed status code.
#[derive(Debug)]
pub enum ApiError {
    /// No adapter, or the store is unreachable (503)
    Unavailable,
    /// Lookup miss on a keyed route (404)
    NotFound,
    /// Email uniqueness violation (400)
    Duplicate(String),
    /// Opaque storage failure (500); detail is logged only
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateEmail => Self::Duplicate(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Unavailable => {
                error!("Database connection not available");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database connection not available".to_string(),
                )
            }
            Self::NotFound => {
                warn!("User not found");
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }
            Self::Duplicate(detail) => {
                warn!("{}", detail);
                (StatusCode::BAD_REQUEST, detail)
            }
            Self::Internal(detail) => {
                error!("Storage operation failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health/db", get(health_db))
        .route("/create-user", post(create_user))
        .route("/get-all-users", get(get_all_users))
        .route("/getuser-by-email/:email", get(get_user_by_email))
        .route("/update-user/:email", put(update_user))
        .route("/delete-user/:email", delete(delete_user))
        .with_state(state)
}

async fn root() -> StatusCode {
    info!("Called GET /");
    StatusCode::OK
}

async fn health_db(State(state): State<AppState>) -> StatusCode {
    let Some(store) = &state.store else {
        error!("DB health check failed: no storage adapter");
        return StatusCode::SERVICE_UNAVAILABLE;
    };

    if store.health_check().await {
        info!("DB health check OK");
        StatusCode::OK
    } else {
        error!("DB health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn create_user(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    info!("Called POST /create-user");
    let created = state.store()?.create_user(&user).await?;
    info!("User created successfully");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_all_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    info!("Called GET /get-all-users");
    let users = state.store()?.get_all_users().await?;
    Ok(Json(users))
}

async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<User>, ApiError> {
    info!("Called GET /getuser-by-email/{{email}}");
    let user = state
        .store()?
        .get_user_by_email(&email)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    info!("Called PUT /update-user/{{email}}");
    let updated = state
        .store()?
        .update_user(&email, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("User updated successfully");
    Ok(Json(updated))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!("Called DELETE /delete-user/{{email}}");
    let deleted = state.store()?.delete_user(&email).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    info!("User deleted successfully");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageResult;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// In-memory adapter for exercising handlers without a database.
    struct MemoryStore {
        users: Mutex<Vec<User>>,
        healthy: bool,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                users: Mutex::new(Vec::new()),
                healthy: true,
            }
        }
    }

    #[async_trait]
    impl StorageAdapter for MemoryStore {
        fn backend_type(&self) -> &'static str {
            "memory"
        }

        async fn connect(&self) -> bool {
            true
        }

        async fn disconnect(&self) {}

        async fn health_check(&self) -> bool {
            self.healthy
        }

        async fn create_user(&self, user: &NewUser) -> StorageResult<User> {
            let mut users = self.users.lock().await;
            if users.iter().any(|u| u.email == user.email) {
                return Err(StorageError::DuplicateEmail);
            }
            let created = User {
                id: (users.len() + 1).to_string(),
                name: user.name.clone(),
                email: user.email.clone(),
                age: user.age,
            };
            users.push(created.clone());
            Ok(created)
        }

        async fn get_all_users(&self) -> StorageResult<Vec<User>> {
            Ok(self.users.lock().await.clone())
        }

        async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn update_user(
            &self,
            email: &str,
            patch: &UserPatch,
        ) -> StorageResult<Option<User>> {
            let mut users = self.users.lock().await;
            if let Some(new_email) = &patch.email {
                if new_email != email && users.iter().any(|u| &u.email == new_email) {
                    return Err(StorageError::DuplicateEmail);
                }
            }
            let Some(user) = users.iter_mut().find(|u| u.email == email) else {
                return Ok(None);
            };
            if let Some(name) = &patch.name {
                user.name = name.clone();
            }
            if let Some(new_email) = &patch.email {
                user.email = new_email.clone();
            }
            if let Some(age) = patch.age {
                user.age = Some(age);
            }
            Ok(Some(user.clone()))
        }

        async fn delete_user(&self, email: &str) -> StorageResult<bool> {
            let mut users = self.users.lock().await;
            let before = users.len();
            users.retain(|u| u.email != email);
            Ok(users.len() < before)
        }
    }

    fn state_with_store() -> AppState {
        AppState {
            store: Some(Arc::new(MemoryStore::new())),
        }
    }

    fn ann() -> NewUser {
        NewUser {
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            age: Some(20),
        }
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StorageError::DuplicateEmail)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StorageError::backend("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let state = state_with_store();

        let (status, Json(created)) = create_user(State(state.clone()), Json(ann()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(!created.id.is_empty());

        let Json(fetched) =
            get_user_by_email(State(state), Path("a@x.com".to_string()))
                .await
                .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_bad_request() {
        let state = state_with_store();
        create_user(State(state.clone()), Json(ann())).await.unwrap();

        let err = create_user(State(state), Json(ann())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_user_routes_are_not_found() {
        let state = state_with_store();

        let err = get_user_by_email(State(state.clone()), Path("no@x.com".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = update_user(
            State(state.clone()),
            Path("no@x.com".to_string()),
            Json(UserPatch::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = delete_user(State(state), Path("no@x.com".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_returns_no_content_then_not_found() {
        let state = state_with_store();
        create_user(State(state.clone()), Json(ann())).await.unwrap();

        let status = delete_user(State(state.clone()), Path("a@x.com".to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_user(State(state), Path("a@x.com".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_adapter_yields_unavailable() {
        let state = AppState { store: None };

        assert_eq!(
            health_db(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        let err = get_all_users(State(state)).await.unwrap_err();
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_partial_update_changes_only_present_fields() {
        let state = state_with_store();
        create_user(State(state.clone()), Json(ann())).await.unwrap();

        let Json(updated) = update_user(
            State(state),
            Path("a@x.com".to_string()),
            Json(UserPatch {
                age: Some(31),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Ann");
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.age, Some(31));
    }
}
