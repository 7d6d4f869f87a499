/// Configuration for the authorization gate
///
/// Loaded from environment variables at startup. The issuer and JWKS location
/// can be derived from an Auth0-style tenant domain or given explicitly.
use jsonwebtoken::Algorithm;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::key_set::RefreshPolicy;

const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Expected `iss` claim, compared exactly
    pub issuer: String,
    /// Audience that must appear in `aud`
    pub audience: String,
    /// Location of the issuer's JSON Web Key Set
    pub jwks_url: String,
    /// Signing algorithms a token header may declare
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerated on the expiry check
    pub leeway_secs: u64,
    /// Key set cache refresh policy
    pub refresh: RefreshPolicy,
    /// Timeout for a single JWKS request
    pub fetch_timeout: Duration,
}

impl GateConfig {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: jwks_url.into(),
            algorithms: vec![Algorithm::RS256],
            leeway_secs: 0,
            refresh: RefreshPolicy::default(),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }

    /// Issuer `https://<domain>/` and JWKS `https://<domain>/.well-known/jwks.json`
    pub fn for_auth0_domain(domain: &str, audience: impl Into<String>) -> Self {
        let domain = normalize_domain(domain);
        Self::new(
            format!("https://{}/", domain),
            audience,
            format!("https://{}/.well-known/jwks.json", domain),
        )
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let audience =
            non_empty_var("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;
        let domain = non_empty_var("AUTH0_DOMAIN").map(|d| normalize_domain(&d).to_string());

        let issuer = match (non_empty_var("AUTH_ISSUER"), &domain) {
            (Some(issuer), _) => issuer,
            (None, Some(domain)) => format!("https://{}/", domain),
            (None, None) => return Err(ConfigError::Missing("AUTH0_DOMAIN or AUTH_ISSUER")),
        };

        let jwks_url = match (non_empty_var("AUTH_JWKS_URL"), &domain) {
            (Some(url), _) => url,
            (None, Some(domain)) => format!("https://{}/.well-known/jwks.json", domain),
            (None, None) => return Err(ConfigError::Missing("AUTH0_DOMAIN or AUTH_JWKS_URL")),
        };

        let algorithms = match non_empty_var("AUTH_ALGORITHMS") {
            Some(raw) => parse_algorithms(&raw)?,
            None => vec![Algorithm::RS256],
        };

        let defaults = RefreshPolicy::default();
        let refresh = RefreshPolicy {
            ttl: Duration::from_secs(parse_env_or(
                "JWKS_CACHE_TTL_SECS",
                defaults.ttl.as_secs(),
            )?),
            min_refresh_interval: Duration::from_secs(parse_env_or(
                "JWKS_MIN_REFRESH_INTERVAL_SECS",
                defaults.min_refresh_interval.as_secs(),
            )?),
            max_retries: parse_env_or("JWKS_FETCH_RETRIES", defaults.max_retries)?,
            ..defaults
        };

        Ok(Self {
            issuer,
            audience,
            jwks_url,
            algorithms,
            leeway_secs: parse_env_or("AUTH_LEEWAY_SECS", 0)?,
            refresh,
            fetch_timeout: Duration::from_millis(parse_env_or(
                "JWKS_FETCH_TIMEOUT_MS",
                DEFAULT_FETCH_TIMEOUT_MS,
            )?),
        })
    }
}

fn normalize_domain(domain: &str) -> &str {
    let domain = domain.trim();
    let domain = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    domain.trim_end_matches('/')
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = non_empty_var(key) else {
        return Ok(default);
    };

    match value.parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let algorithms = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            Algorithm::from_str(name).map_err(|e| ConfigError::Invalid {
                key: "AUTH_ALGORITHMS",
                value: name.to_string(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if algorithms.is_empty() {
        return Err(ConfigError::Invalid {
            key: "AUTH_ALGORITHMS",
            value: raw.to_string(),
            reason: "no algorithms listed".to_string(),
        });
    }

    Ok(algorithms)
}
