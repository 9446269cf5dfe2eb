use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::manager::DatabaseError;
use super::models::*;
use super::store::{Store, StoreResult};

const USER_COLUMNS: &str = "id, username, password_hash, email, is_accepted, family_id";
const TASK_COLUMNS: &str = "id, title, description, completed, family_id, author_id, assigned_user_id";
const MEAL_COLUMNS: &str = "id, name, date, meal_time, recipe_id, family_id";
const GROCERY_COLUMNS: &str = "id, name, quantity, category, is_completed, family_id";
const THOUGHT_COLUMNS: &str = "id, content, timestamp, user_id, family_id";

/// Recipe row before its ingredients are attached; instructions are stored as JSON text.
#[derive(Debug, FromRow)]
struct RecipeRow {
    id: i64,
    name: String,
    instructions: String,
    family_id: i64,
}

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hydrate_recipes(&self, rows: Vec<RecipeRow>) -> StoreResult<Vec<Recipe>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let ingredients: Vec<RecipeIngredient> = sqlx::query_as(
            "SELECT id, recipe_id, name, quantity FROM recipe_ingredients \
             WHERE recipe_id = ANY($1) ORDER BY recipe_id, position, id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> StoreResult<Recipe> {
                let owned = ingredients
                    .iter()
                    .filter(|i| i.recipe_id == row.id)
                    .cloned()
                    .collect();
                Ok(Recipe {
                    id: row.id,
                    name: row.name,
                    instructions: serde_json::from_str(&row.instructions)?,
                    family_id: row.family_id,
                    ingredients: owned,
                })
            })
            .collect()
    }

    async fn insert_ingredients(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: i64,
        ingredients: &[IngredientInput],
    ) -> StoreResult<()> {
        for (position, ingredient) in ingredients.iter().enumerate() {
            sqlx::query(
                "INSERT INTO recipe_ingredients (recipe_id, position, name, quantity) VALUES ($1, $2, $3, $4)",
            )
            .bind(recipe_id)
            .bind(position as i32)
            .bind(&ingredient.name)
            .bind(&ingredient.quantity)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_family(&self, id: i64) -> StoreResult<Option<Family>> {
        Ok(sqlx::query_as("SELECT id, name FROM families WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_family_by_name(&self, name: &str) -> StoreResult<Option<Family>> {
        Ok(sqlx::query_as("SELECT id, name FROM families WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_family(&self, name: &str) -> StoreResult<Family> {
        Ok(sqlx::query_as("INSERT INTO families (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(username).fetch_optional(&self.pool).await?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, password_hash, email, is_accepted, family_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.is_accepted)
            .bind(user.family_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_family_users(&self, family_id: i64) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users WHERE family_id = $1 ORDER BY id", USER_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(family_id).fetch_all(&self.pool).await?)
    }

    async fn set_user_accepted(&self, id: i64, accepted: bool) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET is_accepted = $2 WHERE id = $1 RETURNING {}", USER_COLUMNS);
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .bind(accepted)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_tasks(&self, family_id: i64) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE family_id = $1 ORDER BY id", TASK_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(family_id).fetch_all(&self.pool).await?)
    }

    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (title, description, completed, family_id, author_id, assigned_user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.completed)
            .bind(task.family_id)
            .bind(task.author_id)
            .bind(task.assigned_user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                completed = COALESCE($4, completed), \
                assigned_user_id = COALESCE($5, assigned_user_id) \
             WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.completed)
            .bind(changes.assigned_user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_meals(&self, family_id: i64) -> StoreResult<Vec<Meal>> {
        let sql = format!("SELECT {} FROM meals WHERE family_id = $1 ORDER BY id", MEAL_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(family_id).fetch_all(&self.pool).await?)
    }

    async fn find_meal(&self, id: i64) -> StoreResult<Option<Meal>> {
        let sql = format!("SELECT {} FROM meals WHERE id = $1", MEAL_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_meal(&self, meal: NewMeal) -> StoreResult<Meal> {
        let sql = format!(
            "INSERT INTO meals (name, date, meal_time, recipe_id, family_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            MEAL_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(&meal.name)
            .bind(&meal.date)
            .bind(&meal.meal_time)
            .bind(meal.recipe_id)
            .bind(meal.family_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_meal(&self, id: i64, changes: MealChanges) -> StoreResult<Option<Meal>> {
        let sql = format!(
            "UPDATE meals SET \
                name = COALESCE($2, name), \
                date = COALESCE($3, date), \
                meal_time = COALESCE($4, meal_time), \
                recipe_id = COALESCE($5, recipe_id) \
             WHERE id = $1 RETURNING {}",
            MEAL_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.date)
            .bind(changes.meal_time)
            .bind(changes.recipe_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_meal(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recipes(&self, family_id: i64) -> StoreResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> =
            sqlx::query_as("SELECT id, name, instructions, family_id FROM recipes WHERE family_id = $1 ORDER BY id")
                .bind(family_id)
                .fetch_all(&self.pool)
                .await?;
        self.hydrate_recipes(rows).await
    }

    async fn find_recipe(&self, id: i64) -> StoreResult<Option<Recipe>> {
        let row: Option<RecipeRow> =
            sqlx::query_as("SELECT id, name, instructions, family_id FROM recipes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(row) => Ok(self.hydrate_recipes(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_recipe(&self, recipe: NewRecipe) -> StoreResult<Recipe> {
        let instructions = serde_json::to_string(&recipe.instructions)?;
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO recipes (name, instructions, family_id) VALUES ($1, $2, $3) RETURNING id")
                .bind(&recipe.name)
                .bind(&instructions)
                .bind(recipe.family_id)
                .fetch_one(&mut *tx)
                .await?;
        Self::insert_ingredients(&mut tx, id, &recipe.ingredients).await?;
        tx.commit().await?;

        self.find_recipe(id)
            .await?
            .ok_or_else(|| DatabaseError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn update_recipe(&self, id: i64, changes: RecipeChanges) -> StoreResult<Option<Recipe>> {
        let instructions = changes
            .instructions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE recipes SET name = COALESCE($2, name), instructions = COALESCE($3, instructions) WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&instructions)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(ingredients) = &changes.ingredients {
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_ingredients(&mut tx, id, ingredients).await?;
        }
        tx.commit().await?;

        self.find_recipe(id).await
    }

    async fn delete_recipe(&self, id: i64) -> StoreResult<bool> {
        // recipe_ingredients cascade, meals.recipe_id is set to NULL by the FK
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_grocery_items(&self, family_id: i64) -> StoreResult<Vec<GroceryItem>> {
        let sql = format!("SELECT {} FROM grocery_items WHERE family_id = $1 ORDER BY id", GROCERY_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(family_id).fetch_all(&self.pool).await?)
    }

    async fn find_grocery_item(&self, id: i64) -> StoreResult<Option<GroceryItem>> {
        let sql = format!("SELECT {} FROM grocery_items WHERE id = $1", GROCERY_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_grocery_item(&self, item: NewGroceryItem) -> StoreResult<GroceryItem> {
        let sql = format!(
            "INSERT INTO grocery_items (name, quantity, category, is_completed, family_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            GROCERY_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(&item.name)
            .bind(&item.quantity)
            .bind(&item.category)
            .bind(item.is_completed)
            .bind(item.family_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_grocery_item(&self, id: i64, changes: GroceryItemChanges) -> StoreResult<Option<GroceryItem>> {
        let sql = format!(
            "UPDATE grocery_items SET \
                name = COALESCE($2, name), \
                quantity = COALESCE($3, quantity), \
                category = COALESCE($4, category), \
                is_completed = COALESCE($5, is_completed) \
             WHERE id = $1 RETURNING {}",
            GROCERY_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.quantity)
            .bind(changes.category)
            .bind(changes.is_completed)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_grocery_item(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM grocery_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_thought(&self, thought: NewThought) -> StoreResult<Thought> {
        let sql = format!(
            "INSERT INTO thoughts (content, user_id, family_id) VALUES ($1, $2, $3) RETURNING {}",
            THOUGHT_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(&thought.content)
            .bind(thought.user_id)
            .bind(thought.family_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_thoughts(&self, family_id: i64, offset: i64, limit: i64) -> StoreResult<Vec<Thought>> {
        let sql = format!(
            "SELECT {} FROM thoughts WHERE family_id = $1 ORDER BY timestamp DESC, id DESC LIMIT $2 OFFSET $3",
            THOUGHT_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(family_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_thoughts(&self, family_id: i64) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM thoughts WHERE family_id = $1")
            .bind(family_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
