/// Signing key set (JWKS) cache
///
/// Holds the issuer's verification keys as an immutable snapshot behind a
/// read lock. Requests only ever read the snapshot; refreshes swap in a new one.
///
/// ## Refresh policy
///
/// - `initialize()` fetches eagerly at startup
/// - a snapshot older than `ttl` is refreshed on the next lookup; if that fails
///   the stale keys keep being served and the next attempt waits
///   `min_refresh_interval`
/// - a lookup for an unknown `kid` triggers one refresh, unless the last attempt
///   happened less than `min_refresh_interval` ago (key rotation at the issuer)
/// - each refresh makes at most `1 + max_retries` fetch attempts with
///   exponential backoff
/// - refreshes are single-flight: callers that find a refresh in progress wait
///   for it and reuse its outcome
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, KeySetError};

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Age after which a snapshot is refreshed on next use
    pub ttl: Duration,
    /// Minimum spacing between refresh attempts triggered by unknown kids or failures
    pub min_refresh_interval: Duration,
    /// Extra fetch attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for the retry delay
    pub max_backoff: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            min_refresh_interval: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Where the key set comes from
#[async_trait]
pub trait KeySetSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, KeySetError>;

    /// Human readable location, for logs
    fn describe(&self) -> &str;
}

/// Fetches the key set from the issuer's well-known endpoint
pub struct HttpKeySetSource {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySetSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, KeySetError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeySetError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        debug!(url = %self.url, "Fetching signing key set");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| KeySetError::Request {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeySetError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        response.json::<JwkSet>().await.map_err(|e| KeySetError::Parse {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

/// A fixed key set, for pre-provisioned keys and tests
pub struct StaticKeySetSource {
    keys: JwkSet,
}

impl StaticKeySetSource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeySetSource for StaticKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        Ok(self.keys.clone())
    }

    fn describe(&self) -> &str {
        "static key set"
    }
}

/// Immutable view of the keys from one fetch
struct Snapshot {
    keys: HashMap<String, Arc<DecodingKey>>,
    /// Last refresh attempt that produced or re-armed this snapshot
    checked_at: Instant,
    /// Lookups after this instant trigger a refresh
    expires_at: Instant,
    /// Cache generation this snapshot was installed at
    generation: u64,
}

impl Snapshot {
    fn from_jwks(jwks: JwkSet, now: Instant, ttl: Duration, generation: u64) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for jwk in jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                warn!("Skipping signing key without kid");
                continue;
            };

            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => {
                    keys.insert(kid, Arc::new(key));
                }
                Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable signing key"),
            }
        }

        Self {
            keys,
            checked_at: now,
            expires_at: now + ttl,
            generation,
        }
    }

    /// Same keys, re-armed to be retried after `retry_in`
    fn deferred(&self, now: Instant, retry_in: Duration, generation: u64) -> Self {
        Self {
            keys: self.keys.clone(),
            checked_at: now,
            expires_at: now + retry_in,
            generation,
        }
    }
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    /// Bumped on every refresh attempt, successful or not
    generation: u64,
    last_attempt: Option<Instant>,
    last_error: Option<KeySetError>,
}

impl CacheState {
    /// Result of the most recent refresh attempt
    fn outcome(&self) -> Result<Arc<Snapshot>, KeySetError> {
        if let Some(err) = &self.last_error {
            return Err(err.clone());
        }
        self.snapshot.clone().ok_or(KeySetError::NotLoaded)
    }
}

/// Process-wide signing key cache
pub struct KeySetCache {
    source: Arc<dyn KeySetSource>,
    policy: RefreshPolicy,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl KeySetCache {
    /// Empty cache; keys are fetched on `initialize()` or first use
    pub fn new(source: Arc<dyn KeySetSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Cache pre-loaded with a fixed key set
    pub fn with_keys(keys: JwkSet, policy: RefreshPolicy) -> Self {
        let now = Instant::now();
        let snapshot = Snapshot::from_jwks(keys.clone(), now, policy.ttl, 1);

        Self {
            source: Arc::new(StaticKeySetSource::new(keys)),
            policy,
            state: RwLock::new(CacheState {
                snapshot: Some(Arc::new(snapshot)),
                generation: 1,
                last_attempt: Some(now),
                last_error: None,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Load the key set if nothing has been loaded yet. Returns the key count.
    pub async fn initialize(&self) -> Result<usize, KeySetError> {
        let generation = {
            let state = self.state.read().await;
            if let Some(snapshot) = &state.snapshot {
                return Ok(snapshot.keys.len());
            }
            state.generation
        };

        let snapshot = self.refresh_after(generation).await?;
        info!(
            keys = snapshot.keys.len(),
            source = %self.source.describe(),
            "Signing key set loaded"
        );
        Ok(snapshot.keys.len())
    }

    /// Force a refresh now. Returns the key count.
    pub async fn refresh(&self) -> Result<usize, KeySetError> {
        let generation = self.state.read().await.generation;
        let snapshot = self.refresh_after(generation).await?;
        Ok(snapshot.keys.len())
    }

    /// Number of usable keys currently cached
    pub async fn key_count(&self) -> usize {
        self.state
            .read()
            .await
            .snapshot
            .as_ref()
            .map(|s| s.keys.len())
            .unwrap_or(0)
    }

    /// Find the verification key for `kid`.
    pub async fn resolve(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        let snapshot = self.usable_snapshot().await?;

        if let Some(key) = snapshot.keys.get(kid) {
            return Ok(key.clone());
        }

        if Instant::now().saturating_duration_since(snapshot.checked_at)
            < self.policy.min_refresh_interval
        {
            debug!(kid, "kid not in key set; last refresh too recent to retry");
            return Err(AuthError::UnknownKey(kid.to_string()));
        }

        info!(kid, "kid not in key set, refreshing");
        let refreshed = self
            .refresh_after(snapshot.generation)
            .await
            .map_err(unavailable)?;

        refreshed
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    async fn usable_snapshot(&self) -> Result<Arc<Snapshot>, AuthError> {
        let (current, generation, last_attempt, last_error) = {
            let state = self.state.read().await;
            (
                state.snapshot.clone(),
                state.generation,
                state.last_attempt,
                state.last_error.clone(),
            )
        };
        let now = Instant::now();

        match current {
            Some(snapshot) if now < snapshot.expires_at => Ok(snapshot),
            Some(stale) => match self.refresh_after(generation).await {
                Ok(fresh) => Ok(fresh),
                Err(e) => {
                    warn!(error = %e, "Signing key set refresh failed, serving stale keys");
                    Ok(stale)
                }
            },
            None => {
                if let (Some(err), Some(at)) = (last_error, last_attempt) {
                    if now.saturating_duration_since(at) < self.policy.min_refresh_interval {
                        return Err(unavailable(err));
                    }
                }
                self.refresh_after(generation).await.map_err(unavailable)
            }
        }
    }

    /// Refresh unless another caller already attempted one since `observed`.
    async fn refresh_after(&self, observed: u64) -> Result<Arc<Snapshot>, KeySetError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let state = self.state.read().await;
            if state.generation != observed {
                debug!("Signing key set refreshed by a concurrent caller");
                return state.outcome();
            }
        }

        let result = self.fetch_with_retry().await;
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.generation += 1;
        state.last_attempt = Some(now);

        match result {
            Ok(jwks) => {
                let snapshot = Arc::new(Snapshot::from_jwks(
                    jwks,
                    now,
                    self.policy.ttl,
                    state.generation,
                ));
                info!(
                    keys = snapshot.keys.len(),
                    generation = state.generation,
                    "Signing key set refreshed"
                );
                state.snapshot = Some(snapshot.clone());
                state.last_error = None;
                Ok(snapshot)
            }
            Err(e) => {
                error!(
                    source = %self.source.describe(),
                    error = %e,
                    "Signing key set unavailable"
                );
                if let Some(stale) = state.snapshot.take() {
                    state.snapshot = Some(Arc::new(stale.deferred(
                        now,
                        self.policy.min_refresh_interval,
                        state.generation,
                    )));
                }
                state.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn fetch_with_retry(&self) -> Result<JwkSet, KeySetError> {
        let mut attempt = 0;
        let mut backoff = self.policy.initial_backoff;

        loop {
            match self.source.fetch().await {
                Ok(jwks) => return Ok(jwks),
                Err(e) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = %e,
                        "Key set fetch failed, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.policy.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn unavailable(err: KeySetError) -> AuthError {
    AuthError::KeySetUnavailable(err.to_string())
}
