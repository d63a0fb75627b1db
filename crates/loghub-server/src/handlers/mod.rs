//! REST endpoint handlers

pub mod health;
pub mod logs;
pub mod owners;

use axum::http::HeaderMap;

/// Resolve the owner token for a request: query parameter first, then the
/// `x-owner-token` header.
pub(crate) fn token_from_request(
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Option<String> {
    query_token
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-owner-token")
                .and_then(|v| v.to_str().ok())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}
