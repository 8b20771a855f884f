use axum::http::header::{AUTHORIZATION, HOST};
use axum::http::HeaderMap;

use crate::error::{ServerError, ServerResult};

/// The request domain: the `Host` header without its port. Empty when the
/// header is absent, which no domain binding can match.
pub fn domain_of(headers: &HeaderMap) -> String {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    strip_port(host).to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal, with or without a port.
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// The editor token carried by `Authorization: Token <b64>` or
/// `Authorization: Bearer <b64>`.
pub fn token_of(headers: &HeaderMap) -> ServerResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ServerError::MissingToken)?;
    let (scheme, token) = value.split_once(' ').ok_or(ServerError::MissingToken)?;
    let token = token.trim();
    if !(scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer"))
        || token.is_empty()
    {
        return Err(ServerError::MissingToken);
    }
    Ok(token)
}
