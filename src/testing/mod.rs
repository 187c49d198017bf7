use std::sync::Arc;
use std::time::Duration;

use crate::database::{MemoryBackend, MemoryDirectory, NewTenant, StorageBackend, TenantDirectory};
use crate::services::TenantService;
use crate::tenancy::{partition_name, ConnectionRegistry, PartitionProvisioner, TenantSlug};

/// In-memory tenancy stack for unit tests
pub struct Fixture {
    pub backend: MemoryBackend,
    pub directory: Arc<MemoryDirectory>,
    pub registry: Arc<ConnectionRegistry>,
    pub service: TenantService,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30)).await
    }

    pub async fn with_timeout(provision_timeout: Duration) -> Self {
        let backend = MemoryBackend::new();
        let directory = Arc::new(MemoryDirectory::new());
        let registry = Arc::new(ConnectionRegistry::new(
            directory.clone(),
            PartitionProvisioner::new(Arc::new(backend.clone())),
            provision_timeout,
        ));
        let service = TenantService::new(registry.clone(), 10);

        Self {
            backend,
            directory,
            registry,
            service,
        }
    }

    pub fn backend_arc(&self) -> Arc<dyn StorageBackend> {
        Arc::new(self.backend.clone())
    }

    /// Add a registry row without provisioning, as a signup on another
    /// instance would leave it.
    pub async fn register(&self, slug: &str) -> TenantSlug {
        let slug = TenantSlug::parse(slug).expect("test slug");
        self.directory
            .create(NewTenant {
                slug: slug.clone(),
                display_name: slug.to_string(),
                partition: partition_name(&slug),
            })
            .await
            .expect("directory create")
            .expect("slug not yet registered");
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::EntryState;

    #[tokio::test]
    async fn register_does_not_provision() {
        let fixture = Fixture::new().await;
        let slug = fixture.register("spice-garden").await;

        assert_eq!(fixture.registry.state(&slug).await, EntryState::Absent);
        assert_eq!(fixture.backend.partition_count().await, 0);
    }
}
