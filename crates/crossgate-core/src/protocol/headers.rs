//! Header names used between the dataplane and the authorization endpoints.

use crate::error::{CrossgateError, Result};

/// Import the local client wants to reach (egress).
pub const IMPORT: &str = "x-import";
/// Address of the local client (egress).
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Name of the calling peer (peer authorization).
pub const PEER_NAME: &str = "x-peer-name";
/// Route identifier returned to the dataplane.
pub const HOST: &str = "host";
/// Bearer credential carrying the access token.
pub const AUTHORIZATION: &str = "authorization";

const BEARER_PREFIX: &str = "Bearer ";

/// Format a token as a bearer credential.
pub fn bearer(token: &str) -> String {
    format!("{BEARER_PREFIX}{token}")
}

/// Extract the token from `Bearer <token>`.
///
/// The scheme name is matched case-insensitively. An empty token or a
/// token containing whitespace is malformed.
pub fn parse_bearer(value: &str) -> Result<&str> {
    let value = value.trim();
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| CrossgateError::BadRequest("authorization header is not a bearer credential".into()))?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX.trim_end()) {
        return Err(CrossgateError::BadRequest(format!(
            "unsupported authorization scheme: {scheme}"
        )));
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(CrossgateError::BadRequest("malformed bearer token".into()));
    }
    Ok(token)
}

/// First address of a comma-separated `x-forwarded-for` value.
pub fn first_forwarded(value: &str) -> Option<&str> {
    value.split(',').map(str::trim).find(|s| !s.is_empty())
}
