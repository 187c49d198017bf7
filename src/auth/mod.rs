use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Access level granting the root tenant-administration routes
pub const ROOT_ACCESS: &str = "root";
/// Access level of restaurant staff
pub const STAFF_ACCESS: &str = "staff";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email or operator name)
    pub sub: String,
    /// Tenant slug the token is scoped to; absent for root tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<i64>,
    pub access: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        tenant: Option<String>,
        restaurant_id: Option<i64>,
        access: impl Into<String>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            tenant,
            restaurant_id,
            access: access.into(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn staff(sub: impl Into<String>, tenant: &str, restaurant_id: i64, expiry_hours: u64) -> Self {
        Self::new(sub, Some(tenant.to_string()), Some(restaurant_id), STAFF_ACCESS, expiry_hours)
    }

    pub fn root(sub: impl Into<String>, expiry_hours: u64) -> Self {
        Self::new(sub, None, None, ROOT_ACCESS, expiry_hours)
    }

    pub fn is_root(&self) -> bool {
        self.access == ROOT_ACCESS
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}
