use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::error::Result;
use crate::models::{Drink, Ingredient, NewDrink};

/// Storage for drinks
///
/// Handlers depend on this trait rather than a pool so the HTTP layer can be
/// exercised without a database.
#[async_trait]
pub trait DrinkRepository: Send + Sync {
    /// All drinks ordered by id
    async fn list(&self) -> Result<Vec<Drink>>;

    async fn find(&self, id: i32) -> Result<Option<Drink>>;

    /// Insert a drink. A duplicate title is a `Conflict`.
    async fn insert(&self, drink: &NewDrink) -> Result<Drink>;

    /// Replace a drink's title and recipe. `None` when no drink has `id`.
    async fn update(&self, id: i32, drink: &NewDrink) -> Result<Option<Drink>>;

    /// Returns false when no drink has `id`
    async fn delete(&self, id: i32) -> Result<bool>;

    /// Connectivity check for the health endpoint
    async fn ping(&self) -> Result<()>;
}

#[derive(FromRow)]
struct DrinkRow {
    id: i32,
    title: String,
    recipe: Json<Vec<Ingredient>>,
}

impl From<DrinkRow> for Drink {
    fn from(row: DrinkRow) -> Self {
        Drink {
            id: row.id,
            title: row.title,
            recipe: row.recipe.0,
        }
    }
}

/// PostgreSQL-backed repository; recipes are stored as JSONB
#[derive(Clone)]
pub struct PgDrinkRepository {
    pool: PgPool,
}

impl PgDrinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrinkRepository for PgDrinkRepository {
    async fn list(&self) -> Result<Vec<Drink>> {
        let rows = sqlx::query_as::<_, DrinkRow>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Drink::from).collect())
    }

    async fn find(&self, id: i32) -> Result<Option<Drink>> {
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Drink::from))
    }

    async fn insert(&self, drink: &NewDrink) -> Result<Drink> {
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            INSERT INTO drinks (title, recipe)
            VALUES ($1, $2)
            RETURNING id, title, recipe
            "#,
        )
        .bind(&drink.title)
        .bind(Json(&drink.recipe))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, id: i32, drink: &NewDrink) -> Result<Option<Drink>> {
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            UPDATE drinks
            SET title = $2, recipe = $3
            WHERE id = $1
            RETURNING id, title, recipe
            "#,
        )
        .bind(id)
        .bind(&drink.title)
        .bind(Json(&drink.recipe))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Drink::from))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
