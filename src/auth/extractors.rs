use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::error::AuthError;

/// Raw token taken from an `Authorization: Bearer <token>` header.
#[derive(Debug)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AuthError::Malformed
            })?;

        parse_bearer(header).map(|t| BearerToken(t.to_owned())).ok_or_else(|| {
            warn!("invalid auth scheme");
            AuthError::Malformed
        })
    }
}

// Auth schemes are case-insensitive.
fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
