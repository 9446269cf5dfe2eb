use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Records that belong to exactly one family.
///
/// Every id lookup in the API goes through the ownership check in
/// `middleware::auth`, which relies on this to hide other families' rows.
pub trait FamilyScoped {
    fn family_id(&self) -> i64;
}

macro_rules! family_scoped {
    ($($ty:ty),+ $(,)?) => {
        $(impl FamilyScoped for $ty {
            fn family_id(&self) -> i64 {
                self.family_id
            }
        })+
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Family {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub is_accepted: bool,
    pub family_id: i64,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_accepted", &self.is_accepted)
            .field("family_id", &self.family_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub is_accepted: bool,
    pub family_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub family_id: i64,
    pub author_id: i64,
    pub assigned_user_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub family_id: i64,
    pub author_id: i64,
    pub assigned_user_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub assigned_user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroceryItem {
    pub id: i64,
    pub name: String,
    pub quantity: String,
    pub category: String,
    pub is_completed: bool,
    pub family_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewGroceryItem {
    pub name: String,
    pub quantity: String,
    pub category: String,
    pub is_completed: bool,
    pub family_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct GroceryItemChanges {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub category: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub instructions: Vec<String>,
    pub family_id: i64,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub name: String,
    pub quantity: String,
}

/// Ingredient as supplied by a client, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    #[serde(default)]
    pub quantity: String,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub instructions: Vec<String>,
    pub ingredients: Vec<IngredientInput>,
    pub family_id: i64,
}

/// `ingredients` and `instructions` replace the stored lists wholesale when present.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub instructions: Option<Vec<String>>,
    pub ingredients: Option<Vec<IngredientInput>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    pub date: Option<String>,
    pub meal_time: Option<String>,
    pub recipe_id: Option<i64>,
    pub family_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewMeal {
    pub name: String,
    pub date: Option<String>,
    pub meal_time: Option<String>,
    pub recipe_id: Option<i64>,
    pub family_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MealChanges {
    pub name: Option<String>,
    pub date: Option<String>,
    pub meal_time: Option<String>,
    pub recipe_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Thought {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub family_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewThought {
    pub content: String,
    pub user_id: i64,
    pub family_id: i64,
}

family_scoped!(User, Task, GroceryItem, Recipe, Meal, Thought);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            email: "alice@example.com".to_string(),
            is_accepted: true,
            family_id: 7,
        };

        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["username"], "alice");
        assert!(!format!("{:?}", user).contains("argon2"));
    }

    #[test]
    fn ingredient_quantity_defaults_to_empty() {
        let input: IngredientInput = serde_json::from_str(r#"{"name": "salt"}"#).unwrap();
        assert_eq!(input.quantity, "");
    }
}
