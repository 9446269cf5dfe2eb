// handlers/public/auth/register.rs - POST /register handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::hash_password;
use crate::database::models::{Family, NewUser, User};
use crate::database::{DatabaseError, Store};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, required_text};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub family_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

/// POST /register - Create a user, creating the family if it does not exist yet
///
/// The first user of a family is accepted immediately; anyone joining an
/// existing family waits for an accepted member to approve them.
///
/// Expected Input:
/// ```json
/// {
///   "family_name": "string",
///   "username": "string",
///   "password": "string",
///   "email": "string"
/// }
/// ```
///
/// Expected Output (201):
/// ```json
/// {
///   "success": true,
///   "data": { "id": 1, "username": "alice", "email": "...", "is_accepted": true, "family_id": 1 }
/// }
/// ```
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<User> {
    let payload = json_body(payload)?;
    let family_name = required_text("family_name", payload.family_name)?;
    let username = required_text("username", payload.username)?;
    let password = required_text("password", payload.password)?;
    let email = required_text("email", payload.email)?;

    let store = state.store.as_ref();
    if store.find_user_by_username(&username).await?.is_some() {
        return Err(ApiError::duplicate_username(&username));
    }

    let (family, is_founder) = find_or_create_family(store, &family_name).await?;
    let password_hash = hash_password(&password)?;

    let user = store
        .create_user(NewUser {
            username: username.clone(),
            password_hash,
            email,
            is_accepted: is_founder,
            family_id: family.id,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration of the same name
            DatabaseError::Conflict(_) => ApiError::duplicate_username(&username),
            other => other.into(),
        })?;

    tracing::info!(
        "Registered user {} in family {} (accepted: {})",
        user.id,
        family.id,
        user.is_accepted
    );

    Ok(ApiResponse::created(user))
}

/// Returns the family and whether this call created it
async fn find_or_create_family(store: &dyn Store, name: &str) -> Result<(Family, bool), ApiError> {
    if let Some(family) = store.find_family_by_name(name).await? {
        return Ok((family, false));
    }

    match store.create_family(name).await {
        Ok(family) => {
            tracing::info!("Created family {}", family.id);
            Ok((family, true))
        }
        Err(DatabaseError::Conflict(_)) => {
            // Created concurrently; join it as a regular member
            let family = store
                .find_family_by_name(name)
                .await?
                .ok_or_else(|| ApiError::internal_server_error("Family could not be resolved"))?;
            Ok((family, false))
        }
        Err(e) => Err(e.into()),
    }
}
