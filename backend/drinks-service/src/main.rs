use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use auth_gate::AuthorizationGate;
use drinks_service::db::{self, DrinkRepository, PgDrinkRepository};
use drinks_service::handlers;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Drinks Service
///
/// Serves the coffee shop menu. Reading the menu is public; viewing full
/// recipes and changing the menu require permissions granted by the identity
/// provider in the caller's access token.
///
/// Runs on port 5000 by default (DRINKS_SERVICE_PORT).
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    // Load configuration
    let config = match drinks_service::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting drinks-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    let schema_result = if config.database.reset_on_startup {
        db::reset_and_seed(&db_pool).await
    } else {
        db::ensure_schema(&db_pool).await
    };
    schema_result.map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to prepare drinks table: {e}"),
        )
    })?;

    let gate = AuthorizationGate::from_config(config.auth.clone()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to build authorization gate: {e}"),
        )
    })?;

    tracing::info!(
        issuer = %config.auth.issuer,
        audience = %config.auth.audience,
        jwks_url = %config.auth.jwks_url,
        "Authorization gate configured"
    );

    // The service still starts if the issuer is unreachable; the first
    // protected request retries the fetch.
    if let Err(e) = gate.key_set().initialize().await {
        tracing::warn!("Signing key set not loaded at startup: {}", e);
    }

    let repo: Arc<dyn DrinkRepository> = Arc::new(PgDrinkRepository::new(db_pool));
    let repo_data = web::Data::from(repo);
    let gate_data = web::Data::new(gate);

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();

    HttpServer::new(move || {
        // Build CORS configuration
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .app_data(repo_data.clone())
            .app_data(gate_data.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
            .default_service(web::to(handlers::not_found))
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
