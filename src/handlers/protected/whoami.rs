use axum::extract::State;
use axum::Extension;
use serde::Serialize;

use crate::app::AppState;
use crate::database::models::Family;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user: AuthUser,
    pub family: Option<Family>,
}

/// GET /me - The caller as resolved by the auth middleware
pub async fn whoami(State(state): State<AppState>, Extension(caller): Extension<AuthUser>) -> ApiResult<WhoAmI> {
    let family = state.store.find_family(caller.family_id).await?;
    Ok(ApiResponse::success(WhoAmI { user: caller, family }))
}
