use axum::http::HeaderMap;

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;

/// Authenticated caller extracted from a bearer JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject: String,
    pub tenant: Option<String>,
    pub restaurant_id: Option<i64>,
    pub access: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            tenant: claims.tenant,
            restaurant_id: claims.restaurant_id,
            access: claims.access,
        }
    }
}

/// Decode the bearer token if one is present.
///
/// No `Authorization` header is `Ok(None)`; a present but malformed, expired
/// or wrongly signed token is always an error, never silently ignored.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Option<AuthUser>, ApiError> {
    let Some(token) = extract_jwt_from_headers(headers)? else {
        return Ok(None);
    };

    let claims = validate_jwt(&token, secret).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    Ok(Some(AuthUser::from(claims)))
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err(ApiError::unauthorized("Empty JWT token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}
