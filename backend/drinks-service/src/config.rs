/// Configuration management for Drinks Service
///
/// Loaded once at startup from environment variables (after `.env`, if any).
use auth_gate::GateConfig;
use std::fmt::Display;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token verification settings
    pub auth: GateConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Drop, recreate and seed the drinks table at startup
    pub reset_on_startup: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("DRINKS_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env_or_default("DRINKS_SERVICE_PORT", 5000)?,
        };
        let production = app.is_production();

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                Err(_) => "*".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let database = DatabaseConfig {
            url: match std::env::var("DATABASE_URL") {
                Ok(url) => url,
                Err(_) if production => {
                    return Err("DATABASE_URL must be set in production".to_string())
                }
                Err(_) => "postgres://localhost/coffee_shop".to_string(),
            },
            max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            reset_on_startup: parse_env_or_default("DATABASE_RESET_ON_STARTUP", false)?,
        };

        let auth =
            GateConfig::from_env().map_err(|e| format!("Invalid authorization config: {}", e))?;

        Ok(Config {
            app,
            cors,
            database,
            auth,
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
