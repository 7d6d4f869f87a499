/// Error types for the authorization gate
///
/// `AuthError` is the closed set of reasons a request can be denied. Every
/// variant carries a stable machine-readable code and a default HTTP status so
/// the HTTP layer can render it without inspecting the message text.
use thiserror::Error;

/// Reasons the gate refuses to authorize a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header on the request
    #[error("Authorization header is expected")]
    MissingHeader,

    /// Header present but not of the form `Bearer <token>`
    #[error("Authorization header is malformed: {0}")]
    MalformedHeader(&'static str),

    /// Token is not a parseable JWT or its header lacks required fields
    #[error("Token is malformed: {0}")]
    MalformedToken(String),

    /// No verification key matches the token's `kid`
    #[error("Unable to find a signing key for kid '{0}'")]
    UnknownKey(String),

    /// Signature does not verify against the resolved key
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Issuer, audience or another registered claim is wrong or missing
    #[error("Incorrect claims: {0}")]
    InvalidClaims(String),

    /// Token was valid in every respect but has expired
    #[error("Token expired")]
    ExpiredToken,

    /// Claims carry no `permissions` field at all
    #[error("Permissions not included in token")]
    MissingPermissionClaim,

    /// Claims carry permissions, but not the one this operation requires
    #[error("Permission '{required}' not found in token")]
    InsufficientPermission { required: String },

    /// The signing key set could not be fetched
    #[error("Signing key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl AuthError {
    /// Stable identifier surfaced to API clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader(_) => "invalid_header",
            AuthError::MalformedToken(_) => "invalid_token",
            AuthError::UnknownKey(_) => "unknown_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidClaims(_) => "invalid_claims",
            AuthError::ExpiredToken => "token_expired",
            AuthError::MissingPermissionClaim => "permissions_missing",
            AuthError::InsufficientPermission { .. } => "unauthorized",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
        }
    }

    /// Default HTTP status for this failure
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InsufficientPermission { .. } => 403,
            AuthError::KeySetUnavailable(_) => 503,
            _ => 401,
        }
    }

    /// True when the failure is on our side rather than the caller's
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AuthError::KeySetUnavailable(_))
    }
}

/// Failures while fetching or parsing the issuer's JWKS
///
/// Cloneable so one failed fetch can be reported to every caller that waited
/// on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid key set document from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("key set has not been loaded")]
    NotLoaded,
}

/// Invalid or missing gate configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("failed to parse {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
