/// Data models for drinks-service
///
/// A drink is a titled recipe: an ordered list of ingredients, each drawn as a
/// coloured band whose height is proportional to its `parts`.
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Ingredient {
    #[validate(length(min = 1, message = "ingredient name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "ingredient color must not be empty"))]
    pub color: String,
    #[validate(range(min = 1, message = "ingredient parts must be at least 1"))]
    pub parts: i32,
}

impl Ingredient {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            color: self.color.trim().to_string(),
            parts: self.parts,
        }
    }
}

/// Ingredient as shown on the public menu: no names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientSummary {
    pub color: String,
    pub parts: i32,
}

/// A stored drink (long form when serialized)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drink {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Public representation of a drink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrinkSummary {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<IngredientSummary>,
}

impl Drink {
    pub fn short(&self) -> DrinkSummary {
        DrinkSummary {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|ingredient| IngredientSummary {
                    color: ingredient.color.clone(),
                    parts: ingredient.parts,
                })
                .collect(),
        }
    }
}

/// Validated drink contents, ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewDrink {
    #[validate(length(min = 1, max = 80, message = "title must be between 1 and 80 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "recipe must contain at least one ingredient"), nested)]
    pub recipe: Vec<Ingredient>,
}

impl NewDrink {
    /// Normalize whitespace and check field constraints
    pub fn validated(title: String, recipe: Vec<Ingredient>) -> Result<Self> {
        let drink = Self {
            title: title.trim().to_string(),
            recipe: recipe.into_iter().map(Ingredient::trimmed).collect(),
        };
        drink.validate()?;
        Ok(drink)
    }
}

/// `recipe` in request bodies: a single ingredient or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl RecipeInput {
    pub fn into_vec(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::Many(ingredients) => ingredients,
            RecipeInput::One(ingredient) => vec![ingredient],
        }
    }
}

/// POST /drinks body
#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl CreateDrinkRequest {
    pub fn into_new_drink(self) -> Result<NewDrink> {
        match (self.title, self.recipe) {
            (Some(title), Some(recipe)) => NewDrink::validated(title, recipe.into_vec()),
            _ => Err(AppError::BadRequest("incomplete drink details".to_string())),
        }
    }
}

/// PATCH /drinks/{id} body; absent fields keep their current value
#[derive(Debug, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl UpdateDrinkRequest {
    /// Merge the provided fields over `current`
    pub fn apply_to(self, current: &Drink) -> Result<NewDrink> {
        if self.title.is_none() && self.recipe.is_none() {
            return Err(AppError::BadRequest(
                "no drink details to update".to_string(),
            ));
        }

        NewDrink::validated(
            self.title.unwrap_or_else(|| current.title.clone()),
            self.recipe
                .map(RecipeInput::into_vec)
                .unwrap_or_else(|| current.recipe.clone()),
        )
    }
}

/// `{"success": true, "drinks": [...]}`
#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// DELETE /drinks/{id} response
#[derive(Debug, Serialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i32,
    pub drinks: Vec<Drink>,
}
