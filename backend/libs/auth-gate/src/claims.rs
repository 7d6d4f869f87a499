/// Decoded token claims
///
/// A `Claims` value only exists after the token's signature, issuer, audience
/// and expiry have all been verified by the gate. It is handed to the request
/// that presented the token and is never cached.
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// `aud` may be a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// RFC 7519 NumericDate, truncated to whole seconds.
///
/// Issuers may send fractional seconds; comparisons happen at second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawNumericDate")]
pub struct NumericDate(pub i64);

impl NumericDate {
    pub fn seconds(self) -> i64 {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumericDate {
    Whole(i64),
    Fractional(f64),
}

impl From<RawNumericDate> for NumericDate {
    fn from(raw: RawNumericDate) -> Self {
        match raw {
            RawNumericDate::Whole(secs) => NumericDate(secs),
            // float to int casts saturate
            RawNumericDate::Fractional(secs) => NumericDate(secs.floor() as i64),
        }
    }
}

/// Claims carried by an access token from the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user identifier at the issuer)
    pub sub: String,
    /// Audience
    pub aud: Audience,
    /// Expiration time
    pub exp: NumericDate,
    /// Not before
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<NumericDate>,
    /// Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<NumericDate>,
    /// Authorized party (client id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    /// Space separated OAuth scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Granted permission strings. `None` when the field is absent or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl Claims {
    /// Whether `permission` is granted. False when no permission field exists.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .map(|granted| granted.iter().any(|p| p == permission))
            .unwrap_or(false)
    }

    /// Enforce that `permission` is granted.
    ///
    /// An absent permission field is reported separately from a field that
    /// simply lacks the permission, since the former means the token was issued
    /// without RBAC enabled.
    pub fn require_permission(&self, permission: &str) -> Result<(), AuthError> {
        let granted = self
            .permissions
            .as_deref()
            .ok_or(AuthError::MissingPermissionClaim)?;

        if granted.iter().any(|p| p == permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermission {
                required: permission.to_string(),
            })
        }
    }
}
