/// Drinks Service Library
///
/// Menu service for the coffee shop: public drink listings plus
/// permission-gated management endpoints for baristas and managers.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Drink and ingredient types, request payloads
/// - `db`: Schema setup and the drink repository
/// - `middleware`: Permission-checking request extractor
/// - `error`: Error types and HTTP rendering
/// - `config`: Configuration management
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

pub use config::Config;
pub use error::{AppError, Result};
