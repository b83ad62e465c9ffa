//! Credential extraction from request headers.

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;

use crate::context::Credentials;

/// Cookie names checked for a session token, in order.
pub const SESSION_COOKIES: [&str; 3] = [
    "session-token",
    "next-auth.session-token",
    "__Secure-next-auth.session-token",
];

/// Read credentials from `Authorization: Bearer` or a session cookie.
///
/// The header wins when both are present.
pub fn from_headers(headers: &HeaderMap) -> Credentials {
    bearer_token(headers)
        .or_else(|| cookie_token(headers))
        .map(Credentials::bearer)
        .unwrap_or_else(Credentials::none)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<(&str, &str)> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    SESSION_COOKIES.iter().find_map(|wanted| {
        pairs
            .iter()
            .find(|(name, value)| name.trim() == *wanted && !value.trim().is_empty())
            .map(|(_, value)| value.trim().to_string())
    })
}
