//! HTTP tests for the drinks endpoints
//!
//! Runs the real route table against an in-memory repository and a gate
//! backed by a static signing key set.

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use auth_gate::test_utils::{jwk_set, test_config, test_gate, TokenBuilder, TEST_KID};
use auth_gate::{AuthorizationGate, KeySetCache, KeySetError, KeySetSource, RefreshPolicy};
use common::InMemoryDrinkRepository;
use drinks_service::db::DrinkRepository;
use drinks_service::handlers;
use jsonwebtoken::jwk::JwkSet;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

macro_rules! test_app {
    ($repo:expr) => {
        test_app!($repo, test_gate(&[TEST_KID]))
    };
    ($repo:expr, $gate:expr) => {{
        let repo: Arc<dyn DrinkRepository> = $repo.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::from(repo))
                .app_data(web::Data::new($gate))
                .configure(handlers::configure)
                .default_service(web::to(handlers::not_found)),
        )
        .await
    }};
}

fn bearer(permissions: &[&str]) -> (&'static str, String) {
    (
        "Authorization",
        TokenBuilder::new().permissions(permissions).bearer(),
    )
}

fn matcha_shake() -> Value {
    json!({
        "title": "matcha shake",
        "recipe": [
            {"name": "milk", "color": "grey", "parts": 1},
            {"name": "matcha", "color": "green", "parts": 3}
        ]
    })
}

// ============================================================================
// Public menu
// ============================================================================

#[actix_web::test]
async fn test_get_drinks_is_public_and_short() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/drinks").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "drinks": [{"id": 1, "title": "water", "recipe": [{"color": "blue", "parts": 1}]}]
        })
    );
}

#[actix_web::test]
async fn test_get_drinks_ignores_invalid_token() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::get()
        .uri("/drinks")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Drink details
// ============================================================================

#[actix_web::test]
async fn test_drinks_detail_requires_header() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::get().uri("/drinks-detail").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 401);
    assert_eq!(body["code"], "authorization_header_missing");
}

#[actix_web::test]
async fn test_drinks_detail_returns_long_form() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(bearer(&["get:drinks-detail"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
}

#[actix_web::test]
async fn test_drinks_detail_needs_detail_permission() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(bearer(&["get:drinks"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unauthorized");
}

// ============================================================================
// Create
// ============================================================================

#[actix_web::test]
async fn test_create_drink_returns_all_drinks() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .set_json(matcha_shake())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"].as_array().unwrap().len(), 2);
    assert_eq!(body["drinks"][1]["title"], "matcha shake");
    assert_eq!(body["drinks"][1]["recipe"][1]["name"], "matcha");
}

#[actix_web::test]
async fn test_create_drink_accepts_single_ingredient_object() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .set_json(json!({
            "title": "espresso",
            "recipe": {"name": "coffee", "color": "brown", "parts": 1}
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(repo.len(), 1);
}

#[actix_web::test]
async fn test_create_drink_with_missing_fields() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .set_json(json!({"title": "espresso"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "incomplete drink details");
    assert_eq!(repo.len(), 0);
}

#[actix_web::test]
async fn test_create_drink_with_invalid_values() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .set_json(json!({
            "title": "espresso",
            "recipe": [{"name": "coffee", "color": "brown", "parts": 0}]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(repo.len(), 0);
}

#[actix_web::test]
async fn test_create_drink_with_duplicate_title() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .set_json(json!({
            "title": "water",
            "recipe": [{"name": "water", "color": "blue", "parts": 1}]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(repo.len(), 1);
}

#[actix_web::test]
async fn test_authorization_runs_before_body_parsing() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "authorization_header_missing");
}

#[actix_web::test]
async fn test_create_drink_with_invalid_json() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_create_drink_with_expired_token() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let token = TokenBuilder::new()
        .permissions(&["post:drinks"])
        .expires_in(-120)
        .bearer();
    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", token))
        .set_json(matcha_shake())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "token_expired");
    assert_eq!(repo.len(), 0);
}

#[actix_web::test]
async fn test_token_without_permissions_claim() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let token = TokenBuilder::new().without_permissions().bearer();
    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", token))
        .set_json(matcha_shake())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "permissions_missing");
}

#[actix_web::test]
async fn test_token_with_unknown_kid() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let token = TokenBuilder::new()
        .kid("retired-key")
        .permissions(&["post:drinks"])
        .bearer();
    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(("Authorization", token))
        .set_json(matcha_shake())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unknown_key");
}

// ============================================================================
// Update
// ============================================================================

#[actix_web::test]
async fn test_patch_updates_title_only() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::patch()
        .uri("/drinks/1")
        .insert_header(bearer(&["patch:drinks"]))
        .set_json(json!({"title": "sparkling water"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["drinks"][0]["title"], "sparkling water");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
}

#[actix_web::test]
async fn test_patch_unknown_drink() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    for uri in ["/drinks/99", "/drinks/abc"] {
        let req = test::TestRequest::patch()
            .uri(uri)
            .insert_header(bearer(&["patch:drinks"]))
            .set_json(json!({"title": "sparkling water"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_patch_with_wrong_permission_leaves_drink_unchanged() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::patch()
        .uri("/drinks/1")
        .insert_header(bearer(&["post:drinks"]))
        .set_json(json!({"title": "sparkling water"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let drink = repo.find(1).await.unwrap().unwrap();
    assert_eq!(drink.title, "water");
}

#[actix_web::test]
async fn test_patch_to_existing_title_conflicts() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    repo.push(
        "tea",
        vec![drinks_service::models::Ingredient {
            name: "tea".to_string(),
            color: "amber".to_string(),
            parts: 1,
        }],
    );
    let app = test_app!(repo);

    let req = test::TestRequest::patch()
        .uri("/drinks/2")
        .insert_header(bearer(&["patch:drinks"]))
        .set_json(json!({"title": "water"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ============================================================================
// Delete
// ============================================================================

#[actix_web::test]
async fn test_delete_drink() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::delete()
        .uri("/drinks/1")
        .insert_header(bearer(&["delete:drinks"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"success": true, "delete": 1, "drinks": []}));
    assert_eq!(repo.len(), 0);
}

#[actix_web::test]
async fn test_delete_requires_delete_permission() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::delete()
        .uri("/drinks/1")
        .insert_header(bearer(&["get:drinks", "get:drinks-detail"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(repo.len(), 1);
}

#[actix_web::test]
async fn test_delete_unknown_drink() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let req = test::TestRequest::delete()
        .uri("/drinks/42")
        .insert_header(bearer(&["delete:drinks"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "drink doesn't exist");
}

// ============================================================================
// Routing and infrastructure failures
// ============================================================================

#[actix_web::test]
async fn test_unsupported_method_and_unknown_path() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo);

    let resp =
        test::call_service(&app, test::TestRequest::put().uri("/drinks").to_request()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "method not allowed");

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/menu").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "resource not found");
}

#[actix_web::test]
async fn test_database_failure_is_server_error() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    repo.set_unavailable(true);
    let app = test_app!(repo);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/drinks").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "server error");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_health() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "drinks-service");
}

/// Key source for an issuer that cannot be reached
struct UnreachableIssuer;

#[async_trait]
impl KeySetSource for UnreachableIssuer {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        Err(KeySetError::Request {
            url: "https://issuer.invalid/.well-known/jwks.json".to_string(),
            reason: "connection refused".to_string(),
        })
    }

    fn describe(&self) -> &str {
        "unreachable issuer"
    }
}

#[actix_web::test]
async fn test_key_set_outage_is_service_unavailable() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let policy = RefreshPolicy {
        max_retries: 0,
        ..RefreshPolicy::default()
    };
    let keys = KeySetCache::new(Arc::new(UnreachableIssuer), policy);
    let gate = AuthorizationGate::new(test_config("https://issuer.invalid/"), Arc::new(keys));
    let app = test_app!(repo, gate);

    let req = test::TestRequest::get()
        .uri("/drinks-detail")
        .insert_header(bearer(&["get:drinks-detail"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "key_set_unavailable");
}

/// Key source that answers only after a delay, like a cold cache on a slow link
struct SlowIssuer;

#[async_trait]
impl KeySetSource for SlowIssuer {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        actix_web::rt::time::sleep(Duration::from_millis(300)).await;
        Ok(jwk_set(&[TEST_KID]))
    }

    fn describe(&self) -> &str {
        "slow issuer"
    }
}

fn slow_gate() -> AuthorizationGate {
    let keys = KeySetCache::new(Arc::new(SlowIssuer), RefreshPolicy::default());
    AuthorizationGate::new(test_config("https://issuer.invalid/"), Arc::new(keys))
}

fn oversized_body() -> Vec<u8> {
    let mut body = br#"{"title": ""#.to_vec();
    body.extend(std::iter::repeat(b'a').take(300 * 1024));
    body.extend_from_slice(br#"", "recipe": []}"#);
    body
}

#[actix_web::test]
async fn test_oversized_body_reports_authorization_failure_while_keys_load() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo, slow_gate());

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["get:drinks-detail"]))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(oversized_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(repo.len(), 0);
}

#[actix_web::test]
async fn test_oversized_patch_body_reports_missing_header() {
    let repo = Arc::new(InMemoryDrinkRepository::seeded());
    let app = test_app!(repo, slow_gate());

    let req = test::TestRequest::patch()
        .uri("/drinks/1")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(oversized_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_oversized_body_with_valid_token_is_payload_too_large() {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    let app = test_app!(repo, slow_gate());

    let req = test::TestRequest::post()
        .uri("/drinks")
        .insert_header(bearer(&["post:drinks"]))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(oversized_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 413);
    assert_eq!(repo.len(), 0);
}
