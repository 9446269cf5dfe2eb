// handlers/protected/grocery.rs - /grocery_items CRUD
//
// Creation goes through grocery::add_item, which merges the new quantity
// into an existing item with the same normalized name and unit. Edits never
// merge; an edit that would duplicate another item's name and unit is refused.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::{GroceryItem, GroceryItemChanges, NewGroceryItem};
use crate::error::ApiError;
use crate::grocery::{add_item, edit_collision, ReconcileStatus, Reconciled};
use crate::handlers::utils::{json_body, non_blank, required_text};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::Deleted;

const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Deserialize)]
pub struct GroceryPayload {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub category: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AddedItem {
    pub status: ReconcileStatus,
    pub item: GroceryItem,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Vec<GroceryItem>> {
    let items = state.store.list_grocery_items(caller.family_id).await?;
    Ok(ApiResponse::success(items))
}

/// POST /grocery_items - Add an item, merging into a matching one when possible
///
/// Responds 201 with `status: "created"` for a new row, or 200 with
/// `status: "updated"` when the quantity was added to an existing item.
///
/// Expected Input:
/// ```json
/// { "name": "Milk", "quantity": "1 gal", "category": "Dairy" }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<GroceryPayload>, JsonRejection>,
) -> ApiResult<AddedItem> {
    caller.require_accepted()?;
    let payload = json_body(payload)?;
    let name = required_text("name", payload.name)?;

    let category = match payload.category {
        Some(category) if !category.trim().is_empty() => category,
        _ => DEFAULT_CATEGORY.to_string(),
    };

    let item = NewGroceryItem {
        name,
        quantity: payload.quantity.unwrap_or_default(),
        category,
        is_completed: payload.is_completed.unwrap_or(false),
        family_id: caller.family_id,
    };

    let reconciled = add_item(state.store.as_ref(), &state.grocery_locks, item).await?;
    let status_code = match reconciled {
        Reconciled::Created(_) => StatusCode::CREATED,
        Reconciled::Updated(_) => StatusCode::OK,
    };

    Ok(ApiResponse::with_status(
        AddedItem {
            status: reconciled.status(),
            item: reconciled.into_item(),
        },
        status_code,
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<GroceryItem> {
    let item = caller.owned(state.store.find_grocery_item(id).await?, "Grocery item")?;
    Ok(ApiResponse::success(item))
}

/// PUT /grocery_items/:id - Direct edit, no reconciliation
///
/// Renaming an item, or changing its unit, onto another item's normalized
/// name and unit is rejected with 400 so the list keeps one row per key.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<GroceryPayload>, JsonRejection>,
) -> ApiResult<GroceryItem> {
    caller.owned(state.store.find_grocery_item(id).await?, "Grocery item")?;
    caller.require_accepted()?;

    let payload = json_body(payload)?;
    let changes = GroceryItemChanges {
        name: non_blank("name", payload.name)?,
        quantity: payload.quantity,
        category: non_blank("category", payload.category)?,
        is_completed: payload.is_completed,
    };

    // Held across the check and the write, as in add_item
    let _guard = state.grocery_locks.acquire(caller.family_id).await;
    if changes.name.is_some() || changes.quantity.is_some() {
        let current = caller.owned(state.store.find_grocery_item(id).await?, "Grocery item")?;
        let name = changes.name.as_deref().unwrap_or(&current.name);
        let quantity = changes.quantity.as_deref().unwrap_or(&current.quantity);

        let existing = state.store.list_grocery_items(caller.family_id).await?;
        if let Some(other) = edit_collision(&existing, id, name, quantity) {
            return Err(ApiError::bad_request(format!(
                "Grocery item {} already has this name and unit; add to it instead",
                other
            )));
        }
    }

    let item = caller.owned(state.store.update_grocery_item(id, changes).await?, "Grocery item")?;
    Ok(ApiResponse::success(item))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    caller.owned(state.store.find_grocery_item(id).await?, "Grocery item")?;
    caller.require_accepted()?;

    if !state.store.delete_grocery_item(id).await? {
        return Err(ApiError::not_found("Grocery item not found"));
    }
    Ok(ApiResponse::success(Deleted::new("Grocery item")))
}
