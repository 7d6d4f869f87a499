/// Drink handlers - HTTP endpoints for the menu
///
/// Protected handlers take the body as an unread `web::Payload` and drain it
/// only after `Authorized<P>` has resolved. Extractors are polled together, so
/// a buffering body extractor could fail while the gate is still fetching keys.
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::db::DrinkRepository;
use crate::error::{AppError, Result};
use crate::middleware::{Authorized, DeleteDrinks, GetDrinksDetail, PatchDrinks, PostDrinks};
use crate::models::{CreateDrinkRequest, DeleteDrinkResponse, DrinksResponse, UpdateDrinkRequest};

/// List all drinks, short form. Public.
pub async fn get_drinks(repo: web::Data<dyn DrinkRepository>) -> Result<HttpResponse> {
    let drinks = repo.list().await?;
    let summaries: Vec<_> = drinks.iter().map(|drink| drink.short()).collect();

    Ok(HttpResponse::Ok().json(DrinksResponse::new(summaries)))
}

/// List all drinks with full recipes
pub async fn get_drinks_detail(
    _auth: Authorized<GetDrinksDetail>,
    repo: web::Data<dyn DrinkRepository>,
) -> Result<HttpResponse> {
    let drinks = repo.list().await?;
    Ok(HttpResponse::Ok().json(DrinksResponse::new(drinks)))
}

/// Create a drink; responds with every drink in long form
pub async fn create_drink(
    auth: Authorized<PostDrinks>,
    repo: web::Data<dyn DrinkRepository>,
    body: web::Payload,
) -> Result<HttpResponse> {
    let body = read_body(body).await?;
    let req: CreateDrinkRequest = parse_body(&body)?;
    let new_drink = req.into_new_drink()?;

    let drink = repo.insert(&new_drink).await?;
    info!(drink_id = drink.id, sub = %auth.claims().sub, "Drink created");

    let drinks = repo.list().await?;
    Ok(HttpResponse::Ok().json(DrinksResponse::new(drinks)))
}

/// Update a drink's title and/or recipe; responds with every drink in long form
pub async fn update_drink(
    auth: Authorized<PatchDrinks>,
    repo: web::Data<dyn DrinkRepository>,
    path: web::Path<String>,
    body: web::Payload,
) -> Result<HttpResponse> {
    let id = parse_drink_id(&path)?;
    let current = repo.find(id).await?.ok_or_else(drink_not_found)?;

    let body = read_body(body).await?;
    let req: UpdateDrinkRequest = parse_body(&body)?;
    let changes = req.apply_to(&current)?;

    repo.update(id, &changes).await?.ok_or_else(drink_not_found)?;
    info!(drink_id = id, sub = %auth.claims().sub, "Drink updated");

    let drinks = repo.list().await?;
    Ok(HttpResponse::Ok().json(DrinksResponse::new(drinks)))
}

/// Delete a drink; responds with its id and the remaining drinks
pub async fn delete_drink(
    auth: Authorized<DeleteDrinks>,
    repo: web::Data<dyn DrinkRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = parse_drink_id(&path)?;

    if !repo.delete(id).await? {
        return Err(drink_not_found());
    }
    info!(drink_id = id, sub = %auth.claims().sub, "Drink deleted");

    let drinks = repo.list().await?;
    Ok(HttpResponse::Ok().json(DeleteDrinkResponse {
        success: true,
        delete: id,
        drinks,
    }))
}

/// Largest request body accepted, in bytes
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Drain the request body, refusing anything over `MAX_BODY_BYTES`.
async fn read_body(mut payload: web::Payload) -> Result<web::BytesMut> {
    let mut body = web::BytesMut::new();

    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("unable to read body: {}", e)))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(AppError::PayloadTooLarge(MAX_BODY_BYTES));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

/// Ids that are not integers cannot name a drink
fn parse_drink_id(raw: &str) -> Result<i32> {
    raw.parse::<i32>().map_err(|_| drink_not_found())
}

fn drink_not_found() -> AppError {
    AppError::NotFound("drink doesn't exist".to_string())
}
