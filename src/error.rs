// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::tenancy::TenantError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),
    InvalidTenant(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    CrossTenant(String),

    // 404 Not Found
    NotFound(String),
    TenantNotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity (well-formed but references something missing)
    UnprocessableEntity(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::InvalidTenant(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::CrossTenant(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::TenantNotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::UnprocessableEntity(_) => 422,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::ValidationError(msg)
            | ApiError::InvalidTenant(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::CrossTenant(msg)
            | ApiError::NotFound(msg)
            | ApiError::TenantNotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidTenant(_) => "INVALID_TENANT_IDENTIFIER",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::CrossTenant(_) => "CROSS_TENANT_ACCESS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError. Full detail goes to the log only;
// partition names and SQL never reach the client.
impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::InvalidTenantIdentifier(_) => {
                ApiError::InvalidTenant("Invalid tenant identifier".to_string())
            }
            TenantError::TenantNotFound(slug) => {
                tracing::warn!("Tenant not found: {}", slug);
                ApiError::TenantNotFound("Tenant not found".to_string())
            }
            TenantError::CrossTenantAccessAttempt { bound, attempted } => {
                tracing::error!(
                    "Cross-tenant access attempt rejected: bound {}, attempted {}",
                    bound,
                    attempted
                );
                ApiError::CrossTenant("Access to this tenant is not permitted".to_string())
            }
            TenantError::ConnectionExhausted(partition) => {
                tracing::warn!("Connection pool exhausted for {}", partition);
                ApiError::service_unavailable("Tenant is busy, please retry shortly")
            }
            TenantError::ProvisioningTimeout(slug) => {
                tracing::error!("Provisioning timed out for {}", slug);
                ApiError::service_unavailable("Tenant is not ready yet, please retry shortly")
            }
            TenantError::Provisioning { partition, source } => {
                tracing::error!("Provisioning error for {}: {}", partition, source);
                ApiError::internal_server_error("Tenant could not be prepared")
            }
            TenantError::Relationship(msg) => ApiError::unprocessable_entity(msg),
            TenantError::Validation(msg) => ApiError::validation_error(msg),
            TenantError::Storage(err) => err.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::UnknownColumn { column, .. } => {
                ApiError::bad_request(format!("Unknown field '{}'", column))
            }
            DatabaseError::PoolExhausted(partition) => {
                tracing::warn!("Connection pool exhausted for {}", partition);
                ApiError::service_unavailable("Tenant is busy, please retry shortly")
            }
            DatabaseError::CrossPartition { bound, attempted } => {
                TenantError::CrossTenantAccessAttempt { bound, attempted }.into()
            }
            DatabaseError::Closed(partition) => {
                tracing::warn!("Request used a closed connection for {}", partition);
                ApiError::service_unavailable("Tenant connection unavailable")
            }
            DatabaseError::UniqueViolation { table, column } => {
                tracing::warn!("Unique violation on {}.{}", table, column);
                ApiError::conflict("A record with these values already exists")
            }
            DatabaseError::ForeignKeyViolation { table, referenced_by } => {
                tracing::warn!("Delete from {} blocked by {}", table, referenced_by);
                ApiError::conflict("The record is still referenced")
            }
            DatabaseError::Sqlx(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505") =>
            {
                tracing::warn!("Unique violation: {}", db_err);
                ApiError::conflict("A record with these values already exists")
            }
            DatabaseError::Sqlx(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23503") =>
            {
                tracing::warn!("Foreign key violation: {}", db_err);
                ApiError::conflict("The record is still referenced")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_errors_map_to_status_codes() {
        let cases: Vec<(TenantError, u16)> = vec![
            (TenantError::InvalidTenantIdentifier("Bad Slug".into()), 400),
            (TenantError::TenantNotFound("ghost".into()), 404),
            (
                TenantError::CrossTenantAccessAttempt {
                    bound: "tenant_a".into(),
                    attempted: "tenant_b".into(),
                },
                403,
            ),
            (TenantError::ConnectionExhausted("tenant_a".into()), 503),
            (TenantError::ProvisioningTimeout("a".into()), 503),
            (
                TenantError::Provisioning {
                    partition: "tenant_a".into(),
                    source: DatabaseError::QueryError("permission denied".into()),
                },
                500,
            ),
            (TenantError::Relationship("menu item 9 does not exist".into()), 422),
            (TenantError::Validation("score must be between 1 and 5".into()), 400),
            (TenantError::Storage(DatabaseError::NotFound("orders 4 not found".into())), 404),
            (
                TenantError::Storage(DatabaseError::UniqueViolation {
                    table: "users".into(),
                    column: "email".into(),
                }),
                409,
            ),
            (
                TenantError::Storage(DatabaseError::ForeignKeyViolation {
                    table: "menu_items".into(),
                    referenced_by: "order_items".into(),
                }),
                409,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::from(TenantError::Provisioning {
            partition: "tenant_spice_garden".into(),
            source: DatabaseError::QueryError("CREATE SCHEMA failed".into()),
        });
        let body = err.to_json().to_string();
        assert!(!body.contains("tenant_spice_garden"));
        assert!(!body.contains("CREATE SCHEMA"));

        let err = ApiError::from(TenantError::CrossTenantAccessAttempt {
            bound: "tenant_a".into(),
            attempted: "tenant_b".into(),
        });
        assert!(!err.to_json().to_string().contains("tenant_b"));
    }

    #[test]
    fn json_body_has_error_envelope() {
        let body = ApiError::from(TenantError::TenantNotFound("ghost".into())).to_json();
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["code"], json!("TENANT_NOT_FOUND"));
    }
}
