//! In-process implementations of the storage and registry traits.
//!
//! Partitions are separate maps, so isolation is structural here too. Unique
//! columns and foreign-key delete actions follow the table definitions, as
//! PostgreSQL enforces them. Every capability call is counted, and artificial
//! latency can be injected into `create_partition` and `connect` to widen
//! race windows in tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::backend::{check_columns, ensure_bound, Row, StorageBackend, TenantConnection};
use super::directory::{NewTenant, TenantDirectory};
use super::error::DatabaseError;
use super::models::Tenant;
use super::schema::{OnDelete, TableDef, TENANT_TABLES};
use crate::tenancy::{PartitionName, TenantSlug};

/// Snapshot of how often each capability was exercised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub create_partition_calls: usize,
    pub partitions_created: usize,
    pub create_tables_calls: usize,
    pub tables_created: usize,
    pub connections_opened: usize,
    /// Opened and not yet closed
    pub open_connections: usize,
    pub partitions_dropped: usize,
}

#[derive(Default)]
struct Counters {
    create_partition_calls: AtomicUsize,
    partitions_created: AtomicUsize,
    create_tables_calls: AtomicUsize,
    tables_created: AtomicUsize,
    connections_opened: AtomicUsize,
    open_connections: AtomicUsize,
    partitions_dropped: AtomicUsize,
}

#[derive(Default)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Row>,
}

type Tables = HashMap<&'static str, MemoryTable>;
type Partitions = HashMap<PartitionName, Tables>;

#[derive(Default)]
struct Store {
    partitions: RwLock<Partitions>,
    counters: Counters,
    connect_latency_ms: AtomicU64,
    partition_latency_ms: AtomicU64,
    /// Zero means unlimited
    connection_limit: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BackendStats {
        let c = &self.store.counters;
        BackendStats {
            create_partition_calls: c.create_partition_calls.load(Ordering::SeqCst),
            partitions_created: c.partitions_created.load(Ordering::SeqCst),
            create_tables_calls: c.create_tables_calls.load(Ordering::SeqCst),
            tables_created: c.tables_created.load(Ordering::SeqCst),
            connections_opened: c.connections_opened.load(Ordering::SeqCst),
            open_connections: c.open_connections.load(Ordering::SeqCst),
            partitions_dropped: c.partitions_dropped.load(Ordering::SeqCst),
        }
    }

    /// Delay applied to every `connect`, standing in for a connection handshake
    pub fn set_connect_latency(&self, latency: Duration) {
        self.store
            .connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay applied to every `create_partition`, before the schema exists
    pub fn set_partition_latency(&self, latency: Duration) {
        self.store
            .partition_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Cap on simultaneously open connections; `connect` beyond it fails
    /// with `PoolExhausted`.
    pub fn set_connection_limit(&self, limit: usize) {
        self.store.connection_limit.store(limit, Ordering::SeqCst);
    }

    pub async fn partition_count(&self) -> usize {
        self.store.partitions.read().await.len()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn create_partition(&self, partition: &PartitionName) -> Result<(), DatabaseError> {
        self.store
            .counters
            .create_partition_calls
            .fetch_add(1, Ordering::SeqCst);
        pause(&self.store.partition_latency_ms).await;

        let mut partitions = self.store.partitions.write().await;
        if !partitions.contains_key(partition) {
            partitions.insert(partition.clone(), HashMap::new());
            self.store
                .counters
                .partitions_created
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn create_tables(
        &self,
        partition: &PartitionName,
        tables: &[TableDef],
    ) -> Result<(), DatabaseError> {
        self.store
            .counters
            .create_tables_calls
            .fetch_add(1, Ordering::SeqCst);

        let mut partitions = self.store.partitions.write().await;
        let existing = partitions
            .get_mut(partition)
            .ok_or_else(|| DatabaseError::MissingPartition(partition.to_string()))?;

        for table in tables {
            if !existing.contains_key(table.name) {
                existing.insert(table.name, MemoryTable::default());
                self.store.counters.tables_created.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn connect(
        &self,
        partition: &PartitionName,
    ) -> Result<Arc<dyn TenantConnection>, DatabaseError> {
        pause(&self.store.connect_latency_ms).await;

        if !self.store.partitions.read().await.contains_key(partition) {
            return Err(DatabaseError::MissingPartition(partition.to_string()));
        }

        let counters = &self.store.counters;
        let limit = self.store.connection_limit.load(Ordering::SeqCst);
        let open = counters.open_connections.fetch_add(1, Ordering::SeqCst);
        if limit > 0 && open >= limit {
            counters.open_connections.fetch_sub(1, Ordering::SeqCst);
            return Err(DatabaseError::PoolExhausted(partition.to_string()));
        }

        counters.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryConnection {
            partition: partition.clone(),
            store: self.store.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn drop_partition(&self, partition: &PartitionName) -> Result<(), DatabaseError> {
        if self.store.partitions.write().await.remove(partition).is_some() {
            self.store
                .counters
                .partitions_dropped
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn partition_exists(&self, partition: &PartitionName) -> Result<bool, DatabaseError> {
        Ok(self.store.partitions.read().await.contains_key(partition))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

async fn pause(latency_ms: &AtomicU64) {
    let latency = latency_ms.load(Ordering::SeqCst);
    if latency > 0 {
        tokio::time::sleep(Duration::from_millis(latency)).await;
    }
}

pub struct MemoryConnection {
    partition: PartitionName,
    store: Arc<Store>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn check_open(&self, partition: &PartitionName) -> Result<(), DatabaseError> {
        ensure_bound(&self.partition, partition)?;
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::Closed(self.partition.to_string()));
        }
        Ok(())
    }

    fn missing_table(&self, table: &TableDef) -> DatabaseError {
        DatabaseError::QueryError(format!(
            "relation {}.{} does not exist",
            self.partition, table.name
        ))
    }
}

fn check_unique(
    table: &TableDef,
    stored: &MemoryTable,
    candidate: &Row,
    own_id: Option<i64>,
) -> Result<(), DatabaseError> {
    for column in table.unique {
        let Some(value) = candidate.get(*column).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = stored
            .rows
            .iter()
            .any(|(id, row)| Some(*id) != own_id && row.get(*column) == Some(value));
        if taken {
            return Err(DatabaseError::UniqueViolation {
                table: table.name.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Rows removed and columns cleared by one delete
#[derive(Default)]
struct DeletePlan {
    delete: Vec<(&'static str, i64)>,
    set_null: Vec<(&'static str, i64, &'static str)>,
}

/// Follow foreign keys from `(table, id)` the way the DDL's `ON DELETE`
/// clauses would. Nothing is changed if any restricting reference exists.
fn plan_delete(
    tables: &Tables,
    table: &'static str,
    id: i64,
    plan: &mut DeletePlan,
) -> Result<(), DatabaseError> {
    if plan.delete.contains(&(table, id)) {
        return Ok(());
    }
    plan.delete.push((table, id));

    for referencing in TENANT_TABLES {
        for fk in referencing.references.iter().filter(|fk| fk.references == table) {
            let Some(stored) = tables.get(referencing.name) else {
                continue;
            };
            let hits: Vec<i64> = stored
                .rows
                .iter()
                .filter(|(_, row)| row.get(fk.column).and_then(Value::as_i64) == Some(id))
                .map(|(row_id, _)| *row_id)
                .collect();

            for row_id in hits {
                match fk.on_delete {
                    OnDelete::Cascade => plan_delete(tables, referencing.name, row_id, plan)?,
                    OnDelete::SetNull => plan.set_null.push((referencing.name, row_id, fk.column)),
                    OnDelete::Restrict => {
                        return Err(DatabaseError::ForeignKeyViolation {
                            table: table.to_string(),
                            referenced_by: referencing.name.to_string(),
                        })
                    }
                }
            }
        }
    }
    Ok(())
}

fn matches(row: &Row, filter: &Row) -> bool {
    filter.iter().all(|(column, expected)| match row.get(column) {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

#[async_trait]
impl TenantConnection for MemoryConnection {
    fn partition(&self) -> &PartitionName {
        &self.partition
    }

    async fn insert(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        row: Row,
    ) -> Result<Row, DatabaseError> {
        self.check_open(partition)?;
        check_columns(table, &row)?;

        let mut partitions = self.store.partitions.write().await;
        let stored = partitions
            .get_mut(&self.partition)
            .ok_or_else(|| DatabaseError::MissingPartition(self.partition.to_string()))?
            .get_mut(table.name)
            .ok_or_else(|| self.missing_table(table))?;

        let mut record: Row = row.into_iter().filter(|(_, v)| !v.is_null()).collect();
        check_unique(table, stored, &record, None)?;

        stored.next_id += 1;
        let id = stored.next_id;
        let now = Value::String(Utc::now().to_rfc3339());
        record.insert("id".to_string(), Value::from(id));
        for column in ["created_at", "updated_at"] {
            if table.has_column(column) {
                record.insert(column.to_string(), now.clone());
            }
        }

        stored.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn select(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        filter: &Row,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.check_open(partition)?;
        check_columns(table, filter)?;

        let partitions = self.store.partitions.read().await;
        let stored = partitions
            .get(&self.partition)
            .ok_or_else(|| DatabaseError::MissingPartition(self.partition.to_string()))?
            .get(table.name)
            .ok_or_else(|| self.missing_table(table))?;

        Ok(stored
            .rows
            .values()
            .filter(|row| matches(row, filter))
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        id: i64,
        patch: Row,
    ) -> Result<Option<Row>, DatabaseError> {
        self.check_open(partition)?;
        check_columns(table, &patch)?;

        let mut partitions = self.store.partitions.write().await;
        let stored = partitions
            .get_mut(&self.partition)
            .ok_or_else(|| DatabaseError::MissingPartition(self.partition.to_string()))?
            .get_mut(table.name)
            .ok_or_else(|| self.missing_table(table))?;

        let Some(mut record) = stored.rows.get(&id).cloned() else {
            return Ok(None);
        };
        for (column, value) in patch {
            if value.is_null() {
                record.remove(&column);
            } else {
                record.insert(column, value);
            }
        }
        check_unique(table, stored, &record, Some(id))?;

        if table.has_column("updated_at") {
            record.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        stored.rows.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn delete(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        id: i64,
    ) -> Result<bool, DatabaseError> {
        self.check_open(partition)?;

        let mut partitions = self.store.partitions.write().await;
        let tables = partitions
            .get_mut(&self.partition)
            .ok_or_else(|| DatabaseError::MissingPartition(self.partition.to_string()))?;
        let stored = tables.get(table.name).ok_or_else(|| self.missing_table(table))?;
        if !stored.rows.contains_key(&id) {
            return Ok(false);
        }

        let mut plan = DeletePlan::default();
        plan_delete(tables, table.name, id, &mut plan)?;

        for (name, row_id, column) in plan.set_null {
            if let Some(row) = tables.get_mut(name).and_then(|t| t.rows.get_mut(&row_id)) {
                row.remove(column);
            }
        }
        for (name, row_id) in plan.delete {
            if let Some(stored) = tables.get_mut(name) {
                stored.rows.remove(&row_id);
            }
        }
        Ok(true)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check_open(&self.partition)?;
        if self.store.partitions.read().await.contains_key(&self.partition) {
            Ok(())
        } else {
            Err(DatabaseError::MissingPartition(self.partition.to_string()))
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.store
                .counters
                .open_connections
                .fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Central registry kept in memory
#[derive(Default)]
pub struct MemoryDirectory {
    tenants: RwLock<BTreeMap<String, Tenant>>,
    next_id: AtomicI64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn find(&self, slug: &TenantSlug) -> Result<Option<Tenant>, DatabaseError> {
        Ok(self.tenants.read().await.get(slug.as_str()).cloned())
    }

    async fn create(&self, tenant: NewTenant) -> Result<Option<Tenant>, DatabaseError> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(tenant.slug.as_str()) {
            return Ok(None);
        }

        let now = Utc::now();
        let record = Tenant {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            slug: tenant.slug.to_string(),
            display_name: tenant.display_name,
            partition: tenant.partition.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tenants.insert(record.slug.clone(), record.clone());
        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let mut tenants: Vec<Tenant> = self.tenants.read().await.values().cloned().collect();
        tenants.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tenants)
    }

    async fn set_active(&self, slug: &TenantSlug, active: bool) -> Result<Option<Tenant>, DatabaseError> {
        let mut tenants = self.tenants.write().await;
        Ok(tenants.get_mut(slug.as_str()).map(|tenant| {
            tenant.is_active = active;
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }

    async fn rename(&self, slug: &TenantSlug, display_name: &str) -> Result<Option<Tenant>, DatabaseError> {
        let mut tenants = self.tenants.write().await;
        Ok(tenants.get_mut(slug.as_str()).map(|tenant| {
            tenant.display_name = display_name.to_string();
            tenant.updated_at = Utc::now();
            tenant.clone()
        }))
    }

    async fn remove(&self, slug: &TenantSlug) -> Result<bool, DatabaseError> {
        Ok(self.tenants.write().await.remove(slug.as_str()).is_some())
    }
}
