use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::*;
use super::store::{Store, StoreResult};

#[derive(Default)]
struct Tables {
    next_id: i64,
    families: BTreeMap<i64, Family>,
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    meals: BTreeMap<i64, Meal>,
    recipes: BTreeMap<i64, Recipe>,
    grocery_items: BTreeMap<i64, GroceryItem>,
    thoughts: BTreeMap<i64, Thought>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn build_ingredients(&mut self, recipe_id: i64, inputs: Vec<IngredientInput>) -> Vec<RecipeIngredient> {
        inputs
            .into_iter()
            .map(|input| RecipeIngredient {
                id: self.allocate_id(),
                recipe_id,
                name: input.name,
                quantity: input.quantity,
            })
            .collect()
    }
}

/// Process-local store with the same semantics as `PgStore`.
///
/// One lock guards all tables so multi-row operations (recipe with
/// ingredients, recipe delete clearing meal references) stay atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_family(&self, id: i64) -> StoreResult<Option<Family>> {
        Ok(self.tables.read().await.families.get(&id).cloned())
    }

    async fn find_family_by_name(&self, name: &str) -> StoreResult<Option<Family>> {
        let tables = self.tables.read().await;
        Ok(tables.families.values().find(|f| f.name == name).cloned())
    }

    async fn create_family(&self, name: &str) -> StoreResult<Family> {
        let mut tables = self.tables.write().await;
        if tables.families.values().any(|f| f.name == name) {
            return Err(DatabaseError::Conflict(format!("family '{}' already exists", name)));
        }
        let family = Family {
            id: tables.allocate_id(),
            name: name.to_string(),
        };
        tables.families.insert(family.id, family.clone());
        Ok(family)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::Conflict(format!("username '{}' already exists", user.username)));
        }
        let user = User {
            id: tables.allocate_id(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            is_accepted: user.is_accepted,
            family_id: user.family_id,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_family_users(&self, family_id: i64) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| u.family_id == family_id).cloned().collect())
    }

    async fn set_user_accepted(&self, id: i64, accepted: bool) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_accepted = accepted;
            user.clone()
        }))
    }

    async fn list_tasks(&self, family_id: i64) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.values().filter(|t| t.family_id == family_id).cloned().collect())
    }

    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        let task = Task {
            id: tables.allocate_id(),
            title: task.title,
            description: task.description,
            completed: task.completed,
            family_id: task.family_id,
            author_id: task.author_id,
            assigned_user_id: task.assigned_user_id,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;
        Ok(tables.tasks.get_mut(&id).map(|task| {
            if let Some(title) = changes.title {
                task.title = title;
            }
            if let Some(description) = changes.description {
                task.description = Some(description);
            }
            if let Some(completed) = changes.completed {
                task.completed = completed;
            }
            if let Some(assigned) = changes.assigned_user_id {
                task.assigned_user_id = Some(assigned);
            }
            task.clone()
        }))
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn list_meals(&self, family_id: i64) -> StoreResult<Vec<Meal>> {
        let tables = self.tables.read().await;
        Ok(tables.meals.values().filter(|m| m.family_id == family_id).cloned().collect())
    }

    async fn find_meal(&self, id: i64) -> StoreResult<Option<Meal>> {
        Ok(self.tables.read().await.meals.get(&id).cloned())
    }

    async fn create_meal(&self, meal: NewMeal) -> StoreResult<Meal> {
        let mut tables = self.tables.write().await;
        let meal = Meal {
            id: tables.allocate_id(),
            name: meal.name,
            date: meal.date,
            meal_time: meal.meal_time,
            recipe_id: meal.recipe_id,
            family_id: meal.family_id,
        };
        tables.meals.insert(meal.id, meal.clone());
        Ok(meal)
    }

    async fn update_meal(&self, id: i64, changes: MealChanges) -> StoreResult<Option<Meal>> {
        let mut tables = self.tables.write().await;
        Ok(tables.meals.get_mut(&id).map(|meal| {
            if let Some(name) = changes.name {
                meal.name = name;
            }
            if let Some(date) = changes.date {
                meal.date = Some(date);
            }
            if let Some(meal_time) = changes.meal_time {
                meal.meal_time = Some(meal_time);
            }
            if let Some(recipe_id) = changes.recipe_id {
                meal.recipe_id = Some(recipe_id);
            }
            meal.clone()
        }))
    }

    async fn delete_meal(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.meals.remove(&id).is_some())
    }

    async fn list_recipes(&self, family_id: i64) -> StoreResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables.recipes.values().filter(|r| r.family_id == family_id).cloned().collect())
    }

    async fn find_recipe(&self, id: i64) -> StoreResult<Option<Recipe>> {
        Ok(self.tables.read().await.recipes.get(&id).cloned())
    }

    async fn create_recipe(&self, recipe: NewRecipe) -> StoreResult<Recipe> {
        let mut tables = self.tables.write().await;
        let id = tables.allocate_id();
        let ingredients = tables.build_ingredients(id, recipe.ingredients);
        let recipe = Recipe {
            id,
            name: recipe.name,
            instructions: recipe.instructions,
            family_id: recipe.family_id,
            ingredients,
        };
        tables.recipes.insert(id, recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(&self, id: i64, changes: RecipeChanges) -> StoreResult<Option<Recipe>> {
        let mut tables = self.tables.write().await;
        if !tables.recipes.contains_key(&id) {
            return Ok(None);
        }
        let replacement = changes
            .ingredients
            .map(|inputs| tables.build_ingredients(id, inputs));

        Ok(tables.recipes.get_mut(&id).map(|recipe| {
            if let Some(name) = changes.name {
                recipe.name = name;
            }
            if let Some(instructions) = changes.instructions {
                recipe.instructions = instructions;
            }
            if let Some(ingredients) = replacement {
                recipe.ingredients = ingredients;
            }
            recipe.clone()
        }))
    }

    async fn delete_recipe(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        for meal in tables.meals.values_mut() {
            if meal.recipe_id == Some(id) {
                meal.recipe_id = None;
            }
        }
        Ok(true)
    }

    async fn list_grocery_items(&self, family_id: i64) -> StoreResult<Vec<GroceryItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grocery_items
            .values()
            .filter(|g| g.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn find_grocery_item(&self, id: i64) -> StoreResult<Option<GroceryItem>> {
        Ok(self.tables.read().await.grocery_items.get(&id).cloned())
    }

    async fn create_grocery_item(&self, item: NewGroceryItem) -> StoreResult<GroceryItem> {
        let mut tables = self.tables.write().await;
        let item = GroceryItem {
            id: tables.allocate_id(),
            name: item.name,
            quantity: item.quantity,
            category: item.category,
            is_completed: item.is_completed,
            family_id: item.family_id,
        };
        tables.grocery_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_grocery_item(&self, id: i64, changes: GroceryItemChanges) -> StoreResult<Option<GroceryItem>> {
        let mut tables = self.tables.write().await;
        Ok(tables.grocery_items.get_mut(&id).map(|item| {
            if let Some(name) = changes.name {
                item.name = name;
            }
            if let Some(quantity) = changes.quantity {
                item.quantity = quantity;
            }
            if let Some(category) = changes.category {
                item.category = category;
            }
            if let Some(is_completed) = changes.is_completed {
                item.is_completed = is_completed;
            }
            item.clone()
        }))
    }

    async fn delete_grocery_item(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.grocery_items.remove(&id).is_some())
    }

    async fn create_thought(&self, thought: NewThought) -> StoreResult<Thought> {
        let mut tables = self.tables.write().await;
        let thought = Thought {
            id: tables.allocate_id(),
            content: thought.content,
            timestamp: Utc::now(),
            user_id: thought.user_id,
            family_id: thought.family_id,
        };
        tables.thoughts.insert(thought.id, thought.clone());
        Ok(thought)
    }

    async fn list_thoughts(&self, family_id: i64, offset: i64, limit: i64) -> StoreResult<Vec<Thought>> {
        let tables = self.tables.read().await;
        let mut thoughts: Vec<Thought> = tables
            .thoughts
            .values()
            .filter(|t| t.family_id == family_id)
            .cloned()
            .collect();
        thoughts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        Ok(thoughts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_thoughts(&self, family_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.thoughts.values().filter(|t| t.family_id == family_id).count() as i64)
    }
}
