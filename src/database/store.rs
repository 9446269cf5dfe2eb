use async_trait::async_trait;

use super::manager::DatabaseError;
use super::models::*;

pub type StoreResult<T> = Result<T, DatabaseError>;

/// Persistence collaborator for every resource the API serves.
///
/// Lookups by id are deliberately not family-filtered here; callers must
/// pass the result through the ownership check before using it. List
/// operations take the family id and only ever return that family's rows.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check used by `/health`
    async fn ping(&self) -> StoreResult<()>;

    // Families and users
    async fn find_family(&self, id: i64) -> StoreResult<Option<Family>>;
    async fn find_family_by_name(&self, name: &str) -> StoreResult<Option<Family>>;
    /// Fails with `DatabaseError::Conflict` when the name is taken.
    async fn create_family(&self, name: &str) -> StoreResult<Family>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Fails with `DatabaseError::Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn list_family_users(&self, family_id: i64) -> StoreResult<Vec<User>>;
    async fn set_user_accepted(&self, id: i64, accepted: bool) -> StoreResult<Option<User>>;

    // Tasks
    async fn list_tasks(&self, family_id: i64) -> StoreResult<Vec<Task>>;
    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>>;
    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;
    async fn update_task(&self, id: i64, changes: TaskChanges) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, id: i64) -> StoreResult<bool>;

    // Meals
    async fn list_meals(&self, family_id: i64) -> StoreResult<Vec<Meal>>;
    async fn find_meal(&self, id: i64) -> StoreResult<Option<Meal>>;
    async fn create_meal(&self, meal: NewMeal) -> StoreResult<Meal>;
    async fn update_meal(&self, id: i64, changes: MealChanges) -> StoreResult<Option<Meal>>;
    async fn delete_meal(&self, id: i64) -> StoreResult<bool>;

    // Recipes, ingredients owned by their recipe
    async fn list_recipes(&self, family_id: i64) -> StoreResult<Vec<Recipe>>;
    async fn find_recipe(&self, id: i64) -> StoreResult<Option<Recipe>>;
    async fn create_recipe(&self, recipe: NewRecipe) -> StoreResult<Recipe>;
    async fn update_recipe(&self, id: i64, changes: RecipeChanges) -> StoreResult<Option<Recipe>>;
    /// Removes the recipe and its ingredients; meals keep their row with the reference cleared.
    async fn delete_recipe(&self, id: i64) -> StoreResult<bool>;

    // Grocery items
    async fn list_grocery_items(&self, family_id: i64) -> StoreResult<Vec<GroceryItem>>;
    async fn find_grocery_item(&self, id: i64) -> StoreResult<Option<GroceryItem>>;
    async fn create_grocery_item(&self, item: NewGroceryItem) -> StoreResult<GroceryItem>;
    async fn update_grocery_item(&self, id: i64, changes: GroceryItemChanges) -> StoreResult<Option<GroceryItem>>;
    async fn delete_grocery_item(&self, id: i64) -> StoreResult<bool>;

    // Thoughts, newest first
    async fn create_thought(&self, thought: NewThought) -> StoreResult<Thought>;
    async fn list_thoughts(&self, family_id: i64, offset: i64, limit: i64) -> StoreResult<Vec<Thought>>;
    async fn count_thoughts(&self, family_id: i64) -> StoreResult<i64>;
}
