//! In-memory DrinkRepository for HTTP-level tests
//!
//! Mirrors the PostgreSQL repository's observable behavior (sequential ids,
//! unique titles) without a database.

use async_trait::async_trait;
use drinks_service::db::DrinkRepository;
use drinks_service::error::{AppError, Result};
use drinks_service::models::{Drink, Ingredient, NewDrink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Table {
    next_id: i32,
    rows: Vec<Drink>,
}

#[derive(Default)]
pub struct InMemoryDrinkRepository {
    table: Mutex<Table>,
    unavailable: AtomicBool,
}

impl InMemoryDrinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding the same single drink a reset database is seeded with
    pub fn seeded() -> Self {
        let repo = Self::new();
        repo.push(
            "water",
            vec![Ingredient {
                name: "water".to_string(),
                color: "blue".to_string(),
                parts: 1,
            }],
        );
        repo
    }

    pub fn push(&self, title: &str, recipe: Vec<Ingredient>) -> Drink {
        let mut table = self.table.lock().unwrap();
        insert_row(&mut table, title, recipe)
    }

    /// Make every call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection refused".to_string()));
        }
        Ok(())
    }
}

fn insert_row(table: &mut Table, title: &str, recipe: Vec<Ingredient>) -> Drink {
    table.next_id += 1;
    let drink = Drink {
        id: table.next_id,
        title: title.to_string(),
        recipe,
    };
    table.rows.push(drink.clone());
    drink
}

fn duplicate_title() -> AppError {
    AppError::Conflict("a drink with this title already exists".to_string())
}

#[async_trait]
impl DrinkRepository for InMemoryDrinkRepository {
    async fn list(&self) -> Result<Vec<Drink>> {
        self.check_available()?;
        Ok(self.table.lock().unwrap().rows.clone())
    }

    async fn find(&self, id: i32) -> Result<Option<Drink>> {
        self.check_available()?;
        let table = self.table.lock().unwrap();
        Ok(table.rows.iter().find(|d| d.id == id).cloned())
    }

    async fn insert(&self, drink: &NewDrink) -> Result<Drink> {
        self.check_available()?;
        let mut table = self.table.lock().unwrap();
        if table.rows.iter().any(|d| d.title == drink.title) {
            return Err(duplicate_title());
        }
        Ok(insert_row(&mut table, &drink.title, drink.recipe.clone()))
    }

    async fn update(&self, id: i32, drink: &NewDrink) -> Result<Option<Drink>> {
        self.check_available()?;
        let mut table = self.table.lock().unwrap();
        if table
            .rows
            .iter()
            .any(|d| d.id != id && d.title == drink.title)
        {
            return Err(duplicate_title());
        }

        Ok(table.rows.iter_mut().find(|d| d.id == id).map(|row| {
            row.title = drink.title.clone();
            row.recipe = drink.recipe.clone();
            row.clone()
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        self.check_available()?;
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|d| d.id != id);
        Ok(table.rows.len() < before)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}
