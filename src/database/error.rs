use thiserror::Error;

/// Errors from the storage capability (DDL, pooled connections, row access)
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid partition name: {0}")]
    InvalidPartitionName(String),

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Partition does not exist: {0}")]
    MissingPartition(String),

    #[error("Connection pool exhausted for partition: {0}")]
    PoolExhausted(String),

    #[error("Connection closed for partition: {0}")]
    Closed(String),

    #[error("Partition mismatch: connection bound to {bound}, statement addressed {attempted}")]
    CrossPartition { bound: String, attempted: String },

    #[error("Duplicate value for unique column '{column}' on table '{table}'")]
    UniqueViolation { table: String, column: String },

    #[error("Row in '{table}' is still referenced by '{referenced_by}'")]
    ForeignKeyViolation { table: String, referenced_by: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Row decode error: {0}")]
    Decode(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Owned copy for sharing one failure between callers. Driver errors
    /// keep their message but not their type.
    pub fn reissue(&self) -> Self {
        match self {
            DatabaseError::ConfigMissing(name) => DatabaseError::ConfigMissing(name),
            DatabaseError::InvalidDatabaseUrl => DatabaseError::InvalidDatabaseUrl,
            DatabaseError::InvalidPartitionName(s) => DatabaseError::InvalidPartitionName(s.clone()),
            DatabaseError::UnknownColumn { table, column } => DatabaseError::UnknownColumn {
                table: table.clone(),
                column: column.clone(),
            },
            DatabaseError::MissingPartition(s) => DatabaseError::MissingPartition(s.clone()),
            DatabaseError::PoolExhausted(s) => DatabaseError::PoolExhausted(s.clone()),
            DatabaseError::Closed(s) => DatabaseError::Closed(s.clone()),
            DatabaseError::CrossPartition { bound, attempted } => DatabaseError::CrossPartition {
                bound: bound.clone(),
                attempted: attempted.clone(),
            },
            DatabaseError::UniqueViolation { table, column } => DatabaseError::UniqueViolation {
                table: table.clone(),
                column: column.clone(),
            },
            DatabaseError::ForeignKeyViolation {
                table,
                referenced_by,
            } => DatabaseError::ForeignKeyViolation {
                table: table.clone(),
                referenced_by: referenced_by.clone(),
            },
            DatabaseError::NotFound(s) => DatabaseError::NotFound(s.clone()),
            DatabaseError::Decode(s) => DatabaseError::Decode(s.clone()),
            DatabaseError::QueryError(s) => DatabaseError::QueryError(s.clone()),
            DatabaseError::Sqlx(err) => DatabaseError::QueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Decode(err.to_string())
    }
}
