use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use axum_extra::TypedHeader;
use headers::Authorization;
use headers::authorization::Bearer;

use crate::db::models::Profile;
use crate::error::RdoError;
use crate::router::RdoState;
use crate::service::tokens::{hash_token, secrets_match};

/// Pull the caller's bearer token from the request.
/// Accepts either:
/// - Header: `Authorization: Bearer <token>`
/// - Query string: `?access_token=...` (browsers cannot set headers on an `EventSource`)
async fn bearer_token(parts: &mut Parts) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, &()).await
    {
        return Some(bearer.token().to_string());
    }
    let qs = parts.uri.query()?;
    url::form_urlencoded::parse(qs.as_bytes())
        .find(|(k, _)| k == "access_token")
        .map(|(_, v)| v.into_owned())
}

/// The authenticated caller's profile.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Profile);

impl FromRequestParts<RdoState> for AuthUser {
    type Rejection = RdoError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RdoState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).await.ok_or(RdoError::Unauthorized)?;
        let profile = state
            .storage
            .profile_for_token(&hash_token(&token))
            .await?
            .ok_or(RdoError::Unauthorized)?;
        Ok(Self(profile))
    }
}

/// An authenticated caller with the `admin` role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Profile);

impl FromRequestParts<RdoState> for RequireAdmin {
    type Rejection = RdoError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RdoState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(profile) = AuthUser::from_request_parts(parts, state).await?;
        if !profile.is_admin() {
            return Err(RdoError::Forbidden("admin role required".to_string()));
        }
        Ok(Self(profile))
    }
}

/// Trusted server-to-server caller holding the configured service key.
#[derive(Debug, Clone, Copy)]
pub struct RequireServiceKey;

pub fn ensure_service_key(headers: &HeaderMap, expected: &str) -> Result<(), RdoError> {
    // 1) header: x-service-key
    if let Some(hv) = headers.get("x-service-key").and_then(|v| v.to_str().ok())
        && secrets_match(hv.trim(), expected)
    {
        return Ok(());
    }

    // 2) header: Authorization: Bearer <key>
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && secrets_match(token, expected)
        {
            return Ok(());
        }
    }

    Err(RdoError::Unauthorized)
}

impl FromRequestParts<RdoState> for RequireServiceKey {
    type Rejection = RdoError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RdoState,
    ) -> Result<Self, Self::Rejection> {
        ensure_service_key(&parts.headers, &state.cfg.basic.service_key)?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn service_key_from_either_header() {
        let mut headers = HeaderMap::new();
        assert!(ensure_service_key(&headers, "svc").is_err());

        headers.insert("x-service-key", HeaderValue::from_static("svc"));
        assert!(ensure_service_key(&headers, "svc").is_ok());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer svc"));
        assert!(ensure_service_key(&headers, "svc").is_ok());
        assert!(ensure_service_key(&headers, "other").is_err());
    }
}
