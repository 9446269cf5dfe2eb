// handlers/protected/recipes.rs - /recipes CRUD
//
// A recipe owns its ordered ingredient list and instruction steps. Updating
// either list replaces it wholesale; deleting the recipe removes its
// ingredients and clears `recipe_id` on meals that referenced it.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{IngredientInput, NewRecipe, Recipe, RecipeChanges};
use crate::error::ApiError;
use crate::handlers::utils::{json_body, non_blank, required_text};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::Deleted;

#[derive(Debug, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub instructions: Option<Vec<String>>,
    pub ingredients: Option<Vec<IngredientInput>>,
}

fn check_ingredients(ingredients: &Option<Vec<IngredientInput>>) -> Result<(), ApiError> {
    let missing = ingredients
        .iter()
        .flatten()
        .any(|ingredient| ingredient.name.trim().is_empty());
    if missing {
        return Err(ApiError::missing_field("ingredient name"));
    }
    Ok(())
}

pub async fn list(State(state): State<AppState>, Extension(caller): Extension<AuthUser>) -> ApiResult<Vec<Recipe>> {
    let recipes = state.store.list_recipes(caller.family_id).await?;
    Ok(ApiResponse::success(recipes))
}

/// POST /recipes
///
/// Expected Input:
/// ```json
/// {
///   "name": "Pancakes",
///   "ingredients": [{ "name": "flour", "quantity": "2 cups" }, { "name": "egg", "quantity": "1" }],
///   "instructions": ["Mix", "Fry"]
/// }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> ApiResult<Recipe> {
    caller.require_accepted()?;
    let payload = json_body(payload)?;
    let name = required_text("name", payload.name)?;
    check_ingredients(&payload.ingredients)?;

    let recipe = state
        .store
        .create_recipe(NewRecipe {
            name,
            instructions: payload.instructions.unwrap_or_default(),
            ingredients: payload.ingredients.unwrap_or_default(),
            family_id: caller.family_id,
        })
        .await?;

    tracing::debug!(
        "User {} created recipe {} with {} ingredients",
        caller.id,
        recipe.id,
        recipe.ingredients.len()
    );
    Ok(ApiResponse::created(recipe))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Recipe> {
    let recipe = caller.owned(state.store.find_recipe(id).await?, "Recipe")?;
    Ok(ApiResponse::success(recipe))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> ApiResult<Recipe> {
    caller.owned(state.store.find_recipe(id).await?, "Recipe")?;
    caller.require_accepted()?;

    let payload = json_body(payload)?;
    let name = non_blank("name", payload.name)?;
    check_ingredients(&payload.ingredients)?;

    let changes = RecipeChanges {
        name,
        instructions: payload.instructions,
        ingredients: payload.ingredients,
    };

    let recipe = caller.owned(state.store.update_recipe(id, changes).await?, "Recipe")?;
    Ok(ApiResponse::success(recipe))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    caller.owned(state.store.find_recipe(id).await?, "Recipe")?;
    caller.require_accepted()?;

    if !state.store.delete_recipe(id).await? {
        return Err(ApiError::not_found("Recipe not found"));
    }

    tracing::debug!("User {} deleted recipe {}", caller.id, id);
    Ok(ApiResponse::success(Deleted::new("Recipe")))
}
