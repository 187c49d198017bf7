use std::sync::Arc;

use tracing::{debug, error, info};

use super::error::TenantError;
use super::namer::{partition_name, PartitionName};
use super::registry::ConnectionRegistry;
use super::slug::TenantSlug;
use crate::database::{DatabaseError, StorageBackend, TENANT_TABLES};

/// Creates tenant partitions and their table set on the shared server.
///
/// Both steps are idempotent and safe to run concurrently from several
/// processes; the backend absorbs "already exists" races.
#[derive(Clone)]
pub struct PartitionProvisioner {
    backend: Arc<dyn StorageBackend>,
}

impl PartitionProvisioner {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub async fn ensure_partition(&self, slug: &TenantSlug) -> Result<PartitionName, TenantError> {
        let partition = partition_name(slug);
        debug!("Ensuring partition {} for tenant {}", partition, slug);

        self.backend
            .create_partition(&partition)
            .await
            .map_err(|e| provisioning_error(&partition, e))?;

        Ok(partition)
    }

    /// Create any missing tenant tables. Existing tables and rows are untouched.
    pub async fn ensure_tables(
        &self,
        slug: &TenantSlug,
        partition: &PartitionName,
    ) -> Result<(), TenantError> {
        self.backend
            .create_tables(partition, TENANT_TABLES)
            .await
            .map_err(|e| provisioning_error(partition, e))?;

        info!("Tenant {} provisioned in partition {}", slug, partition);
        Ok(())
    }
}

fn provisioning_error(partition: &PartitionName, source: DatabaseError) -> TenantError {
    error!("Provisioning failed for partition {}: {}", partition, source);
    TenantError::Provisioning {
        partition: partition.to_string(),
        source,
    }
}

/// Tears down a tenant's partition.
///
/// The registry entry is evicted and closed before anything is dropped, so no
/// cached handle can outlive its storage.
#[derive(Clone)]
pub struct PartitionDestroyer {
    registry: Arc<ConnectionRegistry>,
    backend: Arc<dyn StorageBackend>,
}

impl PartitionDestroyer {
    pub fn new(registry: Arc<ConnectionRegistry>, backend: Arc<dyn StorageBackend>) -> Self {
        Self { registry, backend }
    }

    pub async fn destroy(&self, slug: &TenantSlug) -> Result<PartitionName, TenantError> {
        let partition = partition_name(slug);

        if self.registry.evict(slug).await {
            debug!("Evicted cached handle for {} before drop", slug);
        }

        self.backend
            .drop_partition(&partition)
            .await
            .map_err(|e| provisioning_error(&partition, e))?;

        info!("Dropped partition {} for tenant {}", partition, slug);
        Ok(partition)
    }
}
