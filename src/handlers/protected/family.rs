// handlers/protected/family.rs - Family membership and approval

use axum::extract::{Path, State};
use axum::Extension;

use crate::app::AppState;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /family/users - Members of the caller's family, accepted or pending
pub async fn list_users(State(state): State<AppState>, Extension(caller): Extension<AuthUser>) -> ApiResult<Vec<User>> {
    let users = state.store.list_family_users(caller.family_id).await?;
    Ok(ApiResponse::success(users))
}

/// PUT /family/users/:id/accept - Approve a pending member
///
/// Only an accepted member may approve. Accepting someone who is already
/// accepted is a no-op that returns the same record.
pub async fn accept_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<User> {
    caller.owned(state.store.find_user(id).await?, "User")?;
    caller.require_accepted()?;

    let user = caller.owned(state.store.set_user_accepted(id, true).await?, "User")?;
    tracing::info!("User {} accepted user {} into family {}", caller.id, user.id, user.family_id);

    Ok(ApiResponse::success(user))
}
