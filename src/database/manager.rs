use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

use super::memory::MemoryStore;
use super::postgres::PgStore;
use super::store::Store;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        // 23505 = unique_violation
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return DatabaseError::Conflict(db_err.message().to_string());
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Tables are created idempotently at startup, in foreign-key order.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS families (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        email TEXT NOT NULL,
        is_accepted BOOLEAN NOT NULL DEFAULT FALSE,
        family_id BIGINT NOT NULL REFERENCES families(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        family_id BIGINT NOT NULL REFERENCES families(id),
        author_id BIGINT NOT NULL REFERENCES users(id),
        assigned_user_id BIGINT REFERENCES users(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS grocery_items (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        quantity TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL DEFAULT 'Other',
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        family_id BIGINT NOT NULL REFERENCES families(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS recipes (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        instructions TEXT NOT NULL DEFAULT '[]',
        family_id BIGINT NOT NULL REFERENCES families(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS recipe_ingredients (
        id BIGSERIAL PRIMARY KEY,
        recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        name TEXT NOT NULL,
        quantity TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE IF NOT EXISTS meals (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        date TEXT,
        meal_time TEXT,
        recipe_id BIGINT REFERENCES recipes(id) ON DELETE SET NULL,
        family_id BIGINT NOT NULL REFERENCES families(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS thoughts (
        id BIGSERIAL PRIMARY KEY,
        content TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        user_id BIGINT NOT NULL REFERENCES users(id),
        family_id BIGINT NOT NULL REFERENCES families(id)
    )"#,
    // Tables created by earlier releases used bounded VARCHAR columns; widening is a no-op once TEXT
    "ALTER TABLE families ALTER COLUMN name TYPE TEXT",
    "ALTER TABLE users ALTER COLUMN username TYPE TEXT, ALTER COLUMN email TYPE TEXT",
    "ALTER TABLE tasks ALTER COLUMN title TYPE TEXT",
    "ALTER TABLE grocery_items ALTER COLUMN name TYPE TEXT, ALTER COLUMN quantity TYPE TEXT, ALTER COLUMN category TYPE TEXT",
    "ALTER TABLE recipes ALTER COLUMN name TYPE TEXT",
    "ALTER TABLE recipe_ingredients ALTER COLUMN name TYPE TEXT, ALTER COLUMN quantity TYPE TEXT",
    "ALTER TABLE meals ALTER COLUMN name TYPE TEXT, ALTER COLUMN date TYPE TEXT, ALTER COLUMN meal_time TYPE TEXT",
    "CREATE INDEX IF NOT EXISTS grocery_items_family_idx ON grocery_items (family_id)",
    "CREATE INDEX IF NOT EXISTS thoughts_family_recent_idx ON thoughts (family_id, timestamp DESC)",
];

/// Connect to Postgres using the configured pool limits
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let url = config
        .url
        .as_deref()
        .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(url)
        .await?;

    info!("Connected database pool (max {} connections)", config.max_connections);
    Ok(pool)
}

/// Create any missing tables and indexes
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready ({} statements)", SCHEMA.len());
    Ok(())
}

/// Pick the store backend: Postgres when a database URL is configured, memory otherwise
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
    match config.url {
        Some(_) => {
            let pool = connect(config).await?;
            ensure_schema(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
