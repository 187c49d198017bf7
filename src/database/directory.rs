//! Central tenant registry: the one data set that is not partitioned, so a
//! slug can be resolved before any tenant connection exists.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::dynamic::quote_identifier;
use super::error::DatabaseError;
use super::models::Tenant;
use super::schema::REGISTRY_DDL;
use crate::tenancy::{PartitionName, TenantSlug};

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub slug: TenantSlug,
    pub display_name: String,
    pub partition: PartitionName,
}

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find(&self, slug: &TenantSlug) -> Result<Option<Tenant>, DatabaseError>;

    /// Insert a new tenant; `None` when the slug is already registered.
    async fn create(&self, tenant: NewTenant) -> Result<Option<Tenant>, DatabaseError>;

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError>;

    async fn set_active(&self, slug: &TenantSlug, active: bool) -> Result<Option<Tenant>, DatabaseError>;

    /// Change the display name only; slug and partition are immutable.
    async fn rename(&self, slug: &TenantSlug, display_name: &str) -> Result<Option<Tenant>, DatabaseError>;

    async fn remove(&self, slug: &TenantSlug) -> Result<bool, DatabaseError>;
}

const TENANT_COLUMNS: &str = "id, slug, display_name, partition, is_active, created_at, updated_at";

/// Registry stored in the shared schema of the same PostgreSQL database
pub struct PgTenantDirectory {
    pool: PgPool,
    table: String,
}

impl PgTenantDirectory {
    pub fn new(pool: PgPool, registry_schema: &str) -> Self {
        Self {
            pool,
            table: format!("{}.\"restaurants\"", quote_identifier(registry_schema)),
        }
    }

    /// Create the registry table if absent. Runs once at startup.
    pub async fn ensure_registry(&self, registry_schema: &str) -> Result<(), DatabaseError> {
        let schema = quote_identifier(registry_schema);
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
            .execute(&self.pool)
            .await?;
        sqlx::query(&REGISTRY_DDL.replace("{schema}", &schema))
            .execute(&self.pool)
            .await?;
        info!("Tenant registry ready in schema {}", registry_schema);
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn find(&self, slug: &TenantSlug) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {} FROM {} WHERE slug = $1",
            TENANT_COLUMNS, self.table
        ))
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn create(&self, tenant: NewTenant) -> Result<Option<Tenant>, DatabaseError> {
        let created = sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO {} (slug, display_name, partition, is_active)
             VALUES ($1, $2, $3, true)
             ON CONFLICT (slug) DO NOTHING
             RETURNING {}",
            self.table, TENANT_COLUMNS
        ))
        .bind(tenant.slug.as_str())
        .bind(&tenant.display_name)
        .bind(tenant.partition.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {} FROM {} ORDER BY created_at DESC",
            TENANT_COLUMNS, self.table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tenants)
    }

    async fn set_active(&self, slug: &TenantSlug, active: bool) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE {} SET is_active = $2, updated_at = NOW() WHERE slug = $1 RETURNING {}",
            self.table, TENANT_COLUMNS
        ))
        .bind(slug.as_str())
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn rename(&self, slug: &TenantSlug, display_name: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE {} SET display_name = $2, updated_at = NOW() WHERE slug = $1 RETURNING {}",
            self.table, TENANT_COLUMNS
        ))
        .bind(slug.as_str())
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn remove(&self, slug: &TenantSlug) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = $1", self.table))
            .bind(slug.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
