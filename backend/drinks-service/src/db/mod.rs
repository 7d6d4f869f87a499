/// Database access layer
///
/// This module provides:
/// - Table setup for the drinks table
/// - The `DrinkRepository` abstraction and its PostgreSQL implementation
pub mod drink_repo;

pub use drink_repo::{DrinkRepository, PgDrinkRepository};

use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

const CREATE_DRINKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS drinks (
        id SERIAL PRIMARY KEY,
        title VARCHAR(80) NOT NULL UNIQUE,
        recipe JSONB NOT NULL
    )
"#;

/// Create the drinks table if it does not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_DRINKS_TABLE).execute(pool).await?;
    info!("Drinks table ready");
    Ok(())
}

/// Drop and recreate the drinks table, then seed it with a single drink.
///
/// Destroys all stored drinks.
pub async fn reset_and_seed(pool: &PgPool) -> Result<(), sqlx::Error> {
    warn!("Resetting drinks table; all stored drinks will be removed");

    let mut tx = pool.begin().await?;
    sqlx::query("DROP TABLE IF EXISTS drinks")
        .execute(&mut *tx)
        .await?;
    sqlx::query(CREATE_DRINKS_TABLE).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
        .bind("water")
        .bind(json!([{"name": "water", "color": "blue", "parts": 1}]))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Drinks table reset and seeded");
    Ok(())
}
