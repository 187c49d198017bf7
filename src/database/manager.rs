use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tracing::{debug, info};

use super::backend::{check_columns, ensure_bound, Row, StorageBackend, TenantConnection};
use super::dynamic::{self, quote_identifier, SqlStatement};
use super::error::DatabaseError;
use super::schema::TableDef;
use crate::config::DatabaseConfig;
use crate::tenancy::PartitionName;

/// PostgreSQL error codes that mean "someone else created it first"
const DUPLICATE_SCHEMA: &str = "42P06";
const DUPLICATE_TABLE: &str = "42P07";
const UNIQUE_VIOLATION: &str = "23505";

const DDL_ATTEMPTS: u32 = 3;

/// Pool limits applied to every tenant pool
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl PoolSettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            min_connections: config.min_connections.min(config.max_connections),
            acquire_timeout: Duration::from_secs(config.connection_timeout),
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
            max_lifetime: (config.max_lifetime_secs > 0)
                .then(|| Duration::from_secs(config.max_lifetime_secs)),
        }
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
    }
}

/// PostgreSQL storage backend: one schema per tenant on a shared server.
///
/// Holds a single administrative pool for DDL and the central registry.
/// Tenant pools are opened on demand by [`StorageBackend::connect`] and owned
/// by the connection registry, not cached here.
pub struct DatabaseManager {
    admin_pool: PgPool,
    database_url: String,
    settings: PoolSettings,
}

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let database_url = config
            .url
            .clone()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let settings = PoolSettings::from_config(config);

        let admin_url = Self::build_connection_string(&database_url, "restro_admin")?;
        let admin_pool = settings.options().connect(&admin_url).await?;
        info!("Connected administrative database pool");

        Ok(Self {
            admin_pool,
            database_url,
            settings,
        })
    }

    /// Pool on the shared server, used for DDL and the central registry
    pub fn admin_pool(&self) -> &PgPool {
        &self.admin_pool
    }

    /// Tag connections with an application name so per-tenant pools are
    /// distinguishable in `pg_stat_activity`.
    fn build_connection_string(base: &str, application_name: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "application_name")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair("application_name", application_name);
        Ok(url.into())
    }

    /// Accepts only tenant partition names; system schemas are never touched
    fn validate(partition: &PartitionName) -> Result<(), DatabaseError> {
        if Self::is_valid_schema_name(partition.as_str()) {
            Ok(())
        } else {
            Err(DatabaseError::InvalidPartitionName(partition.to_string()))
        }
    }

    fn is_valid_schema_name(name: &str) -> bool {
        PartitionName::from_stored(name).is_some() && name.len() <= 63
    }

    /// Key for `pg_advisory_xact_lock`, stable across processes
    fn advisory_lock_key(partition: &PartitionName) -> i64 {
        let digest = Sha256::digest(partition.as_str().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(bytes)
    }

    fn is_duplicate_object(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db) => matches!(
                db.code().as_deref(),
                Some(DUPLICATE_SCHEMA) | Some(DUPLICATE_TABLE) | Some(UNIQUE_VIOLATION)
            ),
            _ => false,
        }
    }

    /// Run DDL statements in one transaction serialized per partition across
    /// every application instance. Losing a create race to a writer that did
    /// not take the lock aborts the batch, which is then replayed.
    async fn run_ddl(&self, partition: &PartitionName, statements: &[String]) -> Result<(), DatabaseError> {
        let mut attempt = 1;
        loop {
            match self.run_ddl_once(partition, statements).await {
                Err(DatabaseError::Sqlx(e))
                    if Self::is_duplicate_object(&e) && attempt < DDL_ATTEMPTS =>
                {
                    debug!("Concurrent DDL on {} (attempt {}): {}", partition, attempt, e);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn run_ddl_once(&self, partition: &PartitionName, statements: &[String]) -> Result<(), DatabaseError> {
        let mut tx = self.admin_pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(Self::advisory_lock_key(partition))
            .execute(&mut *tx)
            .await?;

        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for DatabaseManager {
    async fn create_partition(&self, partition: &PartitionName) -> Result<(), DatabaseError> {
        Self::validate(partition)?;
        let statement = format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_identifier(partition.as_str())
        );
        self.run_ddl(partition, &[statement]).await
    }

    async fn create_tables(
        &self,
        partition: &PartitionName,
        tables: &[TableDef],
    ) -> Result<(), DatabaseError> {
        Self::validate(partition)?;
        let schema = quote_identifier(partition.as_str());
        let statements: Vec<String> = tables.iter().map(|t| t.create_sql(&schema)).collect();
        self.run_ddl(partition, &statements).await
    }

    async fn connect(
        &self,
        partition: &PartitionName,
    ) -> Result<Arc<dyn TenantConnection>, DatabaseError> {
        Self::validate(partition)?;
        let connection_string = Self::build_connection_string(&self.database_url, partition.as_str())?;
        let search_path = format!("SET search_path TO {}", quote_identifier(partition.as_str()));

        let pool = self
            .settings
            .options()
            .after_connect(move |conn, _meta| {
                let sql = search_path.clone();
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&connection_string)
            .await
            .map_err(|e| map_pool_error(partition, e))?;

        info!("Created database pool for: {}", partition);
        Ok(Arc::new(PgTenantConnection {
            partition: partition.clone(),
            pool,
        }))
    }

    async fn drop_partition(&self, partition: &PartitionName) -> Result<(), DatabaseError> {
        Self::validate(partition)?;
        let statement = format!(
            "DROP SCHEMA IF EXISTS {} CASCADE",
            quote_identifier(partition.as_str())
        );
        let mut tx = self.admin_pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(Self::advisory_lock_key(partition))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&statement).execute(&mut *tx).await?;
        tx.commit().await?;
        info!("Dropped partition: {}", partition);
        Ok(())
    }

    async fn partition_exists(&self, partition: &PartitionName) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(partition.as_str())
        .fetch_one(&self.admin_pool)
        .await?;
        Ok(exists.0)
    }

    /// Pings the administrative pool to ensure connectivity
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.admin_pool).await?;
        Ok(())
    }
}

fn map_pool_error(partition: &PartitionName, err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted(partition.to_string()),
        sqlx::Error::PoolClosed => DatabaseError::Closed(partition.to_string()),
        other => DatabaseError::Sqlx(other),
    }
}

/// Pooled connection whose sessions are pinned to one tenant schema
pub struct PgTenantConnection {
    partition: PartitionName,
    pool: PgPool,
}

impl PgTenantConnection {
    async fn fetch_rows(&self, statement: SqlStatement) -> Result<Vec<Row>, DatabaseError> {
        let mut q = sqlx::query(&statement.query);
        for p in statement.params {
            q = dynamic::bind_param(q, p);
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_pool_error(&self.partition, e))?;
        rows.iter().map(dynamic::row_object).collect()
    }
}

#[async_trait]
impl TenantConnection for PgTenantConnection {
    fn partition(&self) -> &PartitionName {
        &self.partition
    }

    async fn insert(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        row: Row,
    ) -> Result<Row, DatabaseError> {
        ensure_bound(&self.partition, partition)?;
        check_columns(table, &row)?;
        self.fetch_rows(dynamic::insert_sql(&self.partition, table, row))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", table.name)))
    }

    async fn select(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        filter: &Row,
    ) -> Result<Vec<Row>, DatabaseError> {
        ensure_bound(&self.partition, partition)?;
        check_columns(table, filter)?;
        self.fetch_rows(dynamic::select_sql(&self.partition, table, filter)).await
    }

    async fn update(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        id: i64,
        patch: Row,
    ) -> Result<Option<Row>, DatabaseError> {
        ensure_bound(&self.partition, partition)?;
        check_columns(table, &patch)?;
        Ok(self
            .fetch_rows(dynamic::update_sql(&self.partition, table, id, patch))
            .await?
            .into_iter()
            .next())
    }

    async fn delete(
        &self,
        partition: &PartitionName,
        table: &TableDef,
        id: i64,
    ) -> Result<bool, DatabaseError> {
        ensure_bound(&self.partition, partition)?;
        let statement = dynamic::delete_sql(&self.partition, table, id);
        let mut q = sqlx::query(&statement.query);
        for p in statement.params {
            q = dynamic::bind_param(q, p);
        }
        let result = q
            .execute(&self.pool)
            .await
            .map_err(|e| map_pool_error(&self.partition, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_pool_error(&self.partition, e))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool: {}", self.partition);
    }
}
