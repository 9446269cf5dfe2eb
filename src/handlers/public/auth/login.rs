// handlers/public/auth/login.rs - POST /login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::verify_password;
use crate::database::models::User;
use crate::error::ApiError;
use crate::handlers::utils::{json_body, required_text};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

/// POST /login - Authenticate and receive a bearer token
///
/// The token embeds `{sub, accepted, exp}` and is valid for the configured
/// lifetime (24 hours by default).
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 86400,
///     "user": { "id": 1, "username": "alice", "is_accepted": true, "family_id": 1, "email": "..." }
///   }
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let payload = json_body(payload)?;
    let username = required_text("username", payload.username)?;
    let password = required_text("password", payload.password)?;

    let user = match state.store.find_user_by_username(&username).await? {
        Some(user) if verify_password(&password, &user.password_hash)? => user,
        _ => {
            tracing::info!("Failed login attempt for username '{}'", username);
            return Err(ApiError::unauthorized("Invalid username or password"));
        }
    };

    let token = state.signer.issue(&user)?;
    tracing::info!("User {} logged in", user.id);

    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: state.signer.ttl_seconds(),
        user,
    }))
}
