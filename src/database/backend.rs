//! Storage capability consumed by the tenancy layer.
//!
//! `StorageBackend` is the DDL/connection side of the shared database server;
//! `TenantConnection` is one open, pooled binding to a single partition.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::DatabaseError;
use super::schema::TableDef;
use crate::tenancy::PartitionName;

/// One row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create the namespace if it does not exist. Concurrent callers must all
    /// succeed.
    async fn create_partition(&self, partition: &PartitionName) -> Result<(), DatabaseError>;

    /// Create each table if it does not exist. Never drops or truncates.
    async fn create_tables(
        &self,
        partition: &PartitionName,
        tables: &[TableDef],
    ) -> Result<(), DatabaseError>;

    /// Open a pooled connection bound to `partition`.
    async fn connect(
        &self,
        partition: &PartitionName,
    ) -> Result<Arc<dyn TenantConnection>, DatabaseError>;

    /// Drop the namespace and everything in it.
    async fn drop_partition(&self, partition: &PartitionName) -> Result<(), DatabaseError>;

    async fn partition_exists(&self, partition: &PartitionName) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Row access through a connection bound to exactly one partition.
///
/// Every call names the partition it expects to address; implementations
/// reject anything but their bound partition with
/// [`DatabaseError::CrossPartition`] (see [`ensure_bound`]).
#[async_trait]
pub trait TenantConnection: Send + Sync {
    fn partition(&self) -> &PartitionName;

    async fn insert(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        row: Row,
    ) -> Result<Row, DatabaseError>;

    /// Rows whose columns equal every entry of `filter`, ordered by id.
    async fn select(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        filter: &Row,
    ) -> Result<Vec<Row>, DatabaseError>;

    async fn update(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        id: i64,
        patch: Row,
    ) -> Result<Option<Row>, DatabaseError>;

    async fn delete(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        id: i64,
    ) -> Result<bool, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Release pooled resources. Later calls fail with [`DatabaseError::Closed`].
    async fn close(&self);
}

/// Isolation guard shared by every `TenantConnection` implementation.
pub fn ensure_bound(bound: &PartitionName, attempted: &PartitionName) -> Result<(), DatabaseError> {
    if bound == attempted {
        return Ok(());
    }
    tracing::error!(
        bound = %bound,
        attempted = %attempted,
        "Cross-partition access rejected; this is an isolation bug"
    );
    Err(DatabaseError::CrossPartition {
        bound: bound.to_string(),
        attempted: attempted.to_string(),
    })
}

/// Reject any column the table does not declare before it reaches SQL.
pub fn check_columns(table: &TableDef, row: &Row) -> Result<(), DatabaseError> {
    match row.keys().find(|column| !table.has_column(column)) {
        Some(column) => Err(DatabaseError::UnknownColumn {
            table: table.name.to_string(),
            column: column.clone(),
        }),
        None => Ok(()),
    }
}
