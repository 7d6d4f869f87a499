//! Bearer token extraction from the `Authorization` header

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_SCHEME: &str = "bearer";

/// Pull the raw token out of `Authorization: Bearer <token>`.
///
/// The header must hold exactly two whitespace-separated parts and the scheme
/// must be `Bearer` (any case). Runs of spaces or tabs between or around the
/// parts are tolerated. Nothing about the token itself is checked here.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("header value is not valid text"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts
        .next()
        .ok_or(AuthError::MalformedHeader("header value is empty"))?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthError::MalformedHeader(
            "authorization header must start with \"Bearer\"",
        ));
    }

    let token = parts
        .next()
        .ok_or(AuthError::MalformedHeader("token not found"))?;

    if parts.next().is_some() {
        return Err(AuthError::MalformedHeader(
            "authorization header must be bearer token",
        ));
    }

    Ok(token)
}
