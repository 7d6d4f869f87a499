/// HTTP handlers and route table
///
/// - `GET /drinks`: public menu (short form)
/// - `GET /drinks-detail`: full recipes, `get:drinks-detail`
/// - `POST /drinks`: `post:drinks`
/// - `PATCH /drinks/{id}`: `patch:drinks`
/// - `DELETE /drinks/{id}`: `delete:drinks`
/// - `GET /health`
pub mod drinks;

pub use drinks::{create_drink, delete_drink, get_drinks, get_drinks_detail, update_drink};

use actix_web::{web, HttpResponse};
use tracing::error;

use crate::db::DrinkRepository;
use crate::error::{AppError, Result};

/// Register all routes. Callers should also install `not_found` as the app's
/// default service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/drinks")
            .route(web::get().to(get_drinks))
            .route(web::post().to(create_drink))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/drinks-detail")
            .route(web::get().to(get_drinks_detail))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/drinks/{id}")
            .route(web::patch().to(update_drink))
            .route(web::delete().to(delete_drink))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/health")
            .route(web::get().to(health))
            .default_service(web::to(method_not_allowed)),
    );
}

pub async fn health(repo: web::Data<dyn DrinkRepository>) -> HttpResponse {
    match repo.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "drinks-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            error!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "drinks-service"
            }))
        }
    }
}

pub async fn not_found() -> Result<HttpResponse> {
    Err(AppError::NotFound("resource not found".to_string()))
}

pub async fn method_not_allowed() -> Result<HttpResponse> {
    Err(AppError::MethodNotAllowed)
}
