use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::error::AppError;
use crate::identity::IdentityResolver;
use crate::models::principal::Principal;
use crate::state::AppState;

const AUTH_COOKIE: &str = "authToken";

/// The resolved principal of an authenticated request.
pub struct Caller(pub Principal);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or_else(|| AppError::Unauthenticated("no token provided".to_string()))?;

        state
            .identity
            .resolve(&token)
            .await
            .map(Caller)
            .ok_or_else(|| AppError::Unauthenticated("invalid or expired token".to_string()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}
