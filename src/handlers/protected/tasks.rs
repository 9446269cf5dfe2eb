// handlers/protected/tasks.rs - /tasks CRUD

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{NewTask, Task, TaskChanges};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, non_blank, required_text};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::utils::ensure_family_member;
use super::Deleted;

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub assigned_user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub assigned_user_id: Option<i64>,
}

/// GET /tasks - All tasks of the caller's family
pub async fn list(State(state): State<AppState>, Extension(caller): Extension<AuthUser>) -> ApiResult<Vec<Task>> {
    let tasks = state.store.list_tasks(caller.family_id).await?;
    Ok(ApiResponse::success(tasks))
}

/// POST /tasks - Create a task authored by the caller
///
/// Expected Input:
/// ```json
/// { "title": "Take out bins", "description": "Tuesday night", "assigned_user_id": 2 }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<CreateTask>, JsonRejection>,
) -> ApiResult<Task> {
    caller.require_accepted()?;
    let payload = json_body(payload)?;
    let title = required_text("title", payload.title)?;
    ensure_family_member(state.store.as_ref(), &caller, payload.assigned_user_id).await?;

    let task = state
        .store
        .create_task(NewTask {
            title,
            description: payload.description,
            completed: payload.completed,
            family_id: caller.family_id,
            author_id: caller.id,
            assigned_user_id: payload.assigned_user_id,
        })
        .await?;

    tracing::debug!("User {} created task {}", caller.id, task.id);
    Ok(ApiResponse::created(task))
}

/// GET /tasks/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Task> {
    let task = caller.owned(state.store.find_task(id).await?, "Task")?;
    Ok(ApiResponse::success(task))
}

/// PUT /tasks/:id - Partial update; absent fields are left unchanged
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateTask>, JsonRejection>,
) -> ApiResult<Task> {
    caller.owned(state.store.find_task(id).await?, "Task")?;
    caller.require_accepted()?;

    let payload = json_body(payload)?;
    let title = non_blank("title", payload.title)?;
    ensure_family_member(state.store.as_ref(), &caller, payload.assigned_user_id).await?;

    let changes = TaskChanges {
        title,
        description: payload.description,
        completed: payload.completed,
        assigned_user_id: payload.assigned_user_id,
    };

    let task = caller.owned(state.store.update_task(id, changes).await?, "Task")?;
    Ok(ApiResponse::success(task))
}

/// DELETE /tasks/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    caller.owned(state.store.find_task(id).await?, "Task")?;
    caller.require_accepted()?;

    if !state.store.delete_task(id).await? {
        return Err(ApiError::not_found("Task not found"));
    }

    tracing::debug!("User {} deleted task {}", caller.id, id);
    Ok(ApiResponse::success(Deleted::new("Task")))
}
