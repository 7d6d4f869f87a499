/// JWT structural decoding and verification
///
/// Split into two steps so the key can be resolved from the unverified header
/// before any signature work happens. Nothing from the payload is read until
/// `verify` has checked the signature.
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::claims::Claims;
use crate::config::GateConfig;
use crate::error::AuthError;

/// Registered claims every accepted token must carry
const REQUIRED_CLAIMS: [&str; 4] = ["exp", "iss", "aud", "sub"];

/// Unverified token header fields needed to pick a verification key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: Algorithm,
    pub kid: String,
}

/// Parse the token header without trusting anything in it.
pub fn inspect_header(token: &str, allowed: &[Algorithm]) -> Result<TokenHeader, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(AuthError::MalformedToken(
            "token must have three non-empty segments".to_string(),
        ));
    }

    let header = decode_header(token)
        .map_err(|e| AuthError::MalformedToken(format!("unable to parse header: {}", e)))?;

    if !allowed.contains(&header.alg) {
        return Err(AuthError::MalformedToken(format!(
            "signing algorithm {:?} is not accepted",
            header.alg
        )));
    }

    let kid = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| AuthError::MalformedToken("token header has no kid".to_string()))?;

    Ok(TokenHeader {
        alg: header.alg,
        kid,
    })
}

/// Verify signature, issuer and audience, then expiry and not-before.
///
/// The time window is checked last and by hand so that `ExpiredToken` only
/// comes back for tokens that are otherwise fully valid. Both bounds allow
/// `leeway_secs` of clock skew.
pub fn verify(
    token: &str,
    key: &DecodingKey,
    alg: Algorithm,
    config: &GateConfig,
    now: i64,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    validation.set_required_spec_claims(&REQUIRED_CLAIMS);

    let claims = decode::<Claims>(token, key, &validation)
        .map_err(classify)?
        .claims;

    let leeway = i64::try_from(config.leeway_secs).unwrap_or(i64::MAX);
    if claims.exp.seconds() < now.saturating_sub(leeway) {
        return Err(AuthError::ExpiredToken);
    }

    if let Some(nbf) = claims.nbf {
        if nbf.seconds() > now.saturating_add(leeway) {
            return Err(AuthError::InvalidClaims("token is not valid yet".to_string()));
        }
    }

    Ok(claims)
}

fn classify(err: JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidIssuer => AuthError::InvalidClaims("incorrect issuer".to_string()),
        ErrorKind::InvalidAudience => AuthError::InvalidClaims("incorrect audience".to_string()),
        ErrorKind::InvalidSubject => AuthError::InvalidClaims("incorrect subject".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::InvalidClaims(format!("missing required claim '{}'", claim))
        }
        ErrorKind::Json(e) => AuthError::InvalidClaims(format!("unable to decode claims: {}", e)),
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidKeyFormat => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}
