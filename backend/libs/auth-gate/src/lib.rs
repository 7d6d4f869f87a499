//! Bearer token authorization gate
//!
//! Decides whether an HTTP request may perform a protected operation. A
//! request is allowed when it carries an `Authorization: Bearer <jwt>` header
//! whose token:
//!
//! - is signed by one of the issuer's published keys (RS256 by default)
//! - names the configured issuer and audience
//! - has not expired
//! - grants the permission the operation requires
//!
//! Signing keys come from the issuer's JWKS endpoint and are cached
//! process-wide; see [`key_set`] for the refresh policy.
//!
//! # Example
//!
//! ```ignore
//! let gate = AuthorizationGate::from_config(GateConfig::from_env()?)?;
//! gate.key_set().initialize().await?;
//!
//! let claims = gate.authorize(req.headers(), "post:drinks").await?;
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod gate;
pub mod header;
pub mod key_set;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use claims::{Audience, Claims, NumericDate};
pub use config::GateConfig;
pub use error::{AuthError, ConfigError, KeySetError};
pub use gate::AuthorizationGate;
pub use header::bearer_token;
pub use key_set::{HttpKeySetSource, KeySetCache, KeySetSource, RefreshPolicy, StaticKeySetSource};
