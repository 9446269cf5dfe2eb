// handlers/protected/meals.rs - /meals CRUD

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{Meal, MealChanges, NewMeal};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, non_blank, required_text};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::utils::ensure_family_recipe;
use super::Deleted;

/// Body for both create and update; only `name` is required on create
#[derive(Debug, Deserialize)]
pub struct MealPayload {
    pub name: Option<String>,
    pub date: Option<String>,
    pub meal_time: Option<String>,
    pub recipe_id: Option<i64>,
}

pub async fn list(State(state): State<AppState>, Extension(caller): Extension<AuthUser>) -> ApiResult<Vec<Meal>> {
    let meals = state.store.list_meals(caller.family_id).await?;
    Ok(ApiResponse::success(meals))
}

/// POST /meals
///
/// Expected Input:
/// ```json
/// { "name": "Taco night", "date": "2024-05-03", "meal_time": "dinner", "recipe_id": 4 }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<MealPayload>, JsonRejection>,
) -> ApiResult<Meal> {
    caller.require_accepted()?;
    let payload = json_body(payload)?;
    let name = required_text("name", payload.name)?;
    ensure_family_recipe(state.store.as_ref(), &caller, payload.recipe_id).await?;

    let meal = state
        .store
        .create_meal(NewMeal {
            name,
            date: payload.date,
            meal_time: payload.meal_time,
            recipe_id: payload.recipe_id,
            family_id: caller.family_id,
        })
        .await?;

    Ok(ApiResponse::created(meal))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Meal> {
    let meal = caller.owned(state.store.find_meal(id).await?, "Meal")?;
    Ok(ApiResponse::success(meal))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<MealPayload>, JsonRejection>,
) -> ApiResult<Meal> {
    caller.owned(state.store.find_meal(id).await?, "Meal")?;
    caller.require_accepted()?;

    let payload = json_body(payload)?;
    let name = non_blank("name", payload.name)?;
    ensure_family_recipe(state.store.as_ref(), &caller, payload.recipe_id).await?;

    let changes = MealChanges {
        name,
        date: payload.date,
        meal_time: payload.meal_time,
        recipe_id: payload.recipe_id,
    };

    let meal = caller.owned(state.store.update_meal(id, changes).await?, "Meal")?;
    Ok(ApiResponse::success(meal))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    caller.owned(state.store.find_meal(id).await?, "Meal")?;
    caller.require_accepted()?;

    if !state.store.delete_meal(id).await? {
        return Err(ApiError::not_found("Meal not found"));
    }
    Ok(ApiResponse::success(Deleted::new("Meal")))
}
