/// The authorization gate
///
/// Every protected operation calls `authorize` with its required permission
/// before touching any data. The checks run in a fixed order and stop at the
/// first failure:
///
/// 1. `Authorization: Bearer <token>` header extraction
/// 2. structural decode of the token header (alg, kid)
/// 3. verification key lookup by kid
/// 4. signature, issuer, audience, then expiry
/// 5. permission membership
///
/// Cheap checks come first, and claims are never looked at before the
/// signature has been verified.
use actix_web::http::header::HeaderMap;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::claims::Claims;
use crate::config::GateConfig;
use crate::error::{AuthError, KeySetError};
use crate::header::bearer_token;
use crate::key_set::{HttpKeySetSource, KeySetCache};
use crate::token;

/// Cheap to clone; all clones share one key set cache.
#[derive(Clone)]
pub struct AuthorizationGate {
    config: Arc<GateConfig>,
    keys: Arc<KeySetCache>,
}

impl AuthorizationGate {
    pub fn new(config: GateConfig, keys: Arc<KeySetCache>) -> Self {
        Self {
            config: Arc::new(config),
            keys,
        }
    }

    /// Gate backed by the issuer's JWKS endpoint from `config.jwks_url`.
    ///
    /// Keys are not fetched here; call `key_set().initialize()` at startup.
    pub fn from_config(config: GateConfig) -> Result<Self, KeySetError> {
        let source = HttpKeySetSource::new(config.jwks_url.clone(), config.fetch_timeout)?;
        let keys = Arc::new(KeySetCache::new(Arc::new(source), config.refresh.clone()));
        Ok(Self::new(config, keys))
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn key_set(&self) -> &Arc<KeySetCache> {
        &self.keys
    }

    /// Authorize a request given its headers.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> Result<Claims, AuthError> {
        let token = bearer_token(headers)?;
        self.authorize_token(token, required_permission).await
    }

    /// Authorize a raw bearer token (without the `Bearer ` prefix).
    pub async fn authorize_token(
        &self,
        token: &str,
        required_permission: &str,
    ) -> Result<Claims, AuthError> {
        let header = token::inspect_header(token, &self.config.algorithms)?;
        let key = self.keys.resolve(&header.kid).await?;
        let claims = token::verify(
            token,
            &key,
            header.alg,
            &self.config,
            Utc::now().timestamp(),
        )?;
        claims.require_permission(required_permission)?;

        debug!(
            sub = %claims.sub,
            permission = required_permission,
            "Request authorized"
        );
        Ok(claims)
    }
}
