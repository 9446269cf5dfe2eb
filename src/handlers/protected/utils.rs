use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::database::Store;

/// An assignee must be a member of the caller's family
pub async fn ensure_family_member(store: &dyn Store, caller: &AuthUser, user_id: Option<i64>) -> Result<(), ApiError> {
    let Some(user_id) = user_id else {
        return Ok(());
    };

    match store.find_user(user_id).await? {
        Some(user) if user.family_id == caller.family_id => Ok(()),
        _ => Err(ApiError::bad_request(format!(
            "assigned_user_id {} is not a member of your family",
            user_id
        ))),
    }
}

/// A meal may only reference one of the family's own recipes
pub async fn ensure_family_recipe(store: &dyn Store, caller: &AuthUser, recipe_id: Option<i64>) -> Result<(), ApiError> {
    let Some(recipe_id) = recipe_id else {
        return Ok(());
    };

    match store.find_recipe(recipe_id).await? {
        Some(recipe) if recipe.family_id == caller.family_id => Ok(()),
        _ => Err(ApiError::bad_request(format!("recipe_id {} does not exist", recipe_id))),
    }
}
