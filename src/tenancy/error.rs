use thiserror::Error;

use crate::database::DatabaseError;

/// Failures of tenant resolution, provisioning and tenant-scoped data access.
///
/// Display strings may carry partition names; they are for server-side logs
/// only. The HTTP layer maps each variant to a generic client message.
#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Invalid tenant identifier: {0}")]
    InvalidTenantIdentifier(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Provisioning failed for partition {partition}: {source}")]
    Provisioning {
        partition: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Provisioning timed out for tenant {0}")]
    ProvisioningTimeout(String),

    #[error("Connection pool exhausted for {0}")]
    ConnectionExhausted(String),

    #[error("Cross-tenant access attempt: bound to {bound}, attempted {attempted}")]
    CrossTenantAccessAttempt { bound: String, attempted: String },

    #[error("Relationship violation: {0}")]
    Relationship(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(DatabaseError),
}

impl TenantError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TenantError::Provisioning { .. }
                | TenantError::ProvisioningTimeout(_)
                | TenantError::ConnectionExhausted(_)
        )
    }
}

impl TenantError {
    /// An equivalent error for another caller of the same failed operation.
    pub fn reissue(&self) -> Self {
        match self {
            TenantError::InvalidTenantIdentifier(s) => TenantError::InvalidTenantIdentifier(s.clone()),
            TenantError::TenantNotFound(s) => TenantError::TenantNotFound(s.clone()),
            TenantError::Provisioning { partition, source } => TenantError::Provisioning {
                partition: partition.clone(),
                source: source.reissue(),
            },
            TenantError::ProvisioningTimeout(s) => TenantError::ProvisioningTimeout(s.clone()),
            TenantError::ConnectionExhausted(s) => TenantError::ConnectionExhausted(s.clone()),
            TenantError::CrossTenantAccessAttempt { bound, attempted } => {
                TenantError::CrossTenantAccessAttempt {
                    bound: bound.clone(),
                    attempted: attempted.clone(),
                }
            }
            TenantError::Relationship(s) => TenantError::Relationship(s.clone()),
            TenantError::Validation(s) => TenantError::Validation(s.clone()),
            TenantError::Storage(err) => TenantError::Storage(err.reissue()),
        }
    }
}

impl From<DatabaseError> for TenantError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::PoolExhausted(partition) => TenantError::ConnectionExhausted(partition),
            DatabaseError::CrossPartition { bound, attempted } => {
                TenantError::CrossTenantAccessAttempt { bound, attempted }
            }
            other => TenantError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_classified() {
        let exhausted: TenantError = DatabaseError::PoolExhausted("tenant_a".into()).into();
        assert!(matches!(exhausted, TenantError::ConnectionExhausted(_)));
        assert!(exhausted.is_retryable());

        let crossed: TenantError = DatabaseError::CrossPartition {
            bound: "tenant_a".into(),
            attempted: "tenant_b".into(),
        }
        .into();
        assert!(matches!(crossed, TenantError::CrossTenantAccessAttempt { .. }));
        assert!(!crossed.is_retryable());

        let other: TenantError = DatabaseError::QueryError("boom".into()).into();
        assert!(matches!(other, TenantError::Storage(_)));
    }

    #[test]
    fn reissued_errors_keep_their_kind() {
        let timeout = TenantError::ProvisioningTimeout("spice-garden".into());
        assert!(matches!(timeout.reissue(), TenantError::ProvisioningTimeout(ref s) if s == "spice-garden"));

        let failed = TenantError::Provisioning {
            partition: "tenant_a".into(),
            source: DatabaseError::Sqlx(sqlx::Error::PoolClosed),
        };
        let copy = failed.reissue();
        assert!(copy.is_retryable());
        assert!(matches!(copy, TenantError::Provisioning { ref partition, .. } if partition == "tenant_a"));
        assert!(copy.to_string().contains(&sqlx::Error::PoolClosed.to_string()));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!TenantError::InvalidTenantIdentifier("x".into()).is_retryable());
        assert!(!TenantError::TenantNotFound("x".into()).is_retryable());
    }
}
