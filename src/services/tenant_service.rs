use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::database::models::Tenant;
use crate::database::{NewTenant, StorageBackend, TenantDirectory};
use crate::tenancy::{
    partition_name, slugify, ConnectionRegistry, EntryState, PartitionDestroyer, TenantError,
    TenantSlug,
};

/// Patch accepted by [`TenantService::update_tenant`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Liveness of one tenant's partition and cached connection
#[derive(Debug, Clone, Serialize)]
pub struct TenantHealth {
    pub slug: String,
    pub is_active: bool,
    pub partition_exists: bool,
    pub connection: EntryState,
    pub reachable: bool,
}

/// Administrative tenant lifecycle: signup, listing, deactivation, deletion.
pub struct TenantService {
    directory: Arc<dyn TenantDirectory>,
    registry: Arc<ConnectionRegistry>,
    destroyer: PartitionDestroyer,
    max_slug_attempts: u32,
}

impl TenantService {
    pub fn new(registry: Arc<ConnectionRegistry>, max_slug_attempts: u32) -> Self {
        let backend = registry.provisioner().backend().clone();
        Self {
            directory: registry.directory().clone(),
            destroyer: PartitionDestroyer::new(registry.clone(), backend),
            registry,
            max_slug_attempts: max_slug_attempts.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    fn backend(&self) -> &Arc<dyn StorageBackend> {
        self.registry.provisioner().backend()
    }

    /// Register `slug` (if new) and eagerly provision and bind it.
    ///
    /// Idempotent: racing calls for the same slug all succeed against the
    /// single registry row and single partition.
    pub async fn provision_tenant(
        &self,
        slug: &TenantSlug,
        display_name: &str,
    ) -> Result<Tenant, TenantError> {
        let display_name = clean_display_name(display_name)?;

        let tenant = match self.directory.create(new_tenant(slug, &display_name)).await? {
            Some(created) => {
                info!("Registered tenant {} ({})", slug, created.id);
                created
            }
            None => self
                .directory
                .find(slug)
                .await?
                .ok_or_else(|| TenantError::TenantNotFound(slug.to_string()))?,
        };

        self.registry.get(slug).await?;
        Ok(tenant)
    }

    /// Signup from a display name. Collisions get `-2`, `-3`, ... suffixes.
    pub async fn signup(&self, display_name: &str) -> Result<Tenant, TenantError> {
        let display_name = clean_display_name(display_name)?;
        let base = slugify(&display_name);

        for attempt in 1..=self.max_slug_attempts {
            let slug = if attempt == 1 { base.clone() } else { base.with_suffix(attempt) };

            if let Some(tenant) = self.directory.create(new_tenant(&slug, &display_name)).await? {
                if let Err(err) = self.registry.get(&slug).await {
                    self.abandon_signup(&slug).await;
                    return Err(err);
                }
                info!("Signed up {} as {}", display_name, slug);
                return Ok(tenant);
            }
        }

        warn!("No free slug for {} after {} attempts", base, self.max_slug_attempts);
        Err(TenantError::Validation(format!(
            "no free identifier for '{}'; choose a slug explicitly",
            display_name
        )))
    }

    /// Undo a signup whose provisioning failed, so a retry gets the same slug.
    async fn abandon_signup(&self, slug: &TenantSlug) {
        warn!("Provisioning failed for new tenant {}; releasing the slug", slug);
        if let Err(e) = self.destroyer.destroy(slug).await {
            warn!("Could not drop partial partition for {}: {}", slug, e);
        }
        if let Err(e) = self.directory.remove(slug).await {
            error!("Could not release slug {}: {}", slug, e);
        }
    }

    /// Delete a tenant and all of its data.
    ///
    /// Deactivation comes first so no request can re-provision the partition
    /// while it is being dropped; the registry row goes last.
    pub async fn deprovision_tenant(&self, slug: &TenantSlug) -> Result<(), TenantError> {
        if self.directory.set_active(slug, false).await?.is_none() {
            return Err(TenantError::TenantNotFound(slug.to_string()));
        }

        self.destroyer.destroy(slug).await?;
        self.directory.remove(slug).await?;

        info!("Deprovisioned tenant {}", slug);
        Ok(())
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, TenantError> {
        Ok(self.directory.list().await?)
    }

    pub async fn get_tenant(&self, slug: &TenantSlug) -> Result<Tenant, TenantError> {
        self.directory
            .find(slug)
            .await?
            .ok_or_else(|| TenantError::TenantNotFound(slug.to_string()))
    }

    /// Rename and/or toggle activation. Deactivating evicts the cached handle.
    pub async fn update_tenant(
        &self,
        slug: &TenantSlug,
        update: TenantUpdate,
    ) -> Result<Tenant, TenantError> {
        let mut tenant = self.get_tenant(slug).await?;

        if let Some(display_name) = update.display_name {
            let display_name = clean_display_name(&display_name)?;
            tenant = self
                .directory
                .rename(slug, &display_name)
                .await?
                .ok_or_else(|| TenantError::TenantNotFound(slug.to_string()))?;
            // Cached contexts carry the display name
            self.registry.evict(slug).await;
        }

        if let Some(active) = update.is_active {
            tenant = self
                .directory
                .set_active(slug, active)
                .await?
                .ok_or_else(|| TenantError::TenantNotFound(slug.to_string()))?;
            if !active {
                self.registry.evict(slug).await;
                info!("Deactivated tenant {}", slug);
            }
        }

        Ok(tenant)
    }

    pub async fn tenant_health(&self, slug: &TenantSlug) -> Result<TenantHealth, TenantError> {
        let tenant = self.get_tenant(slug).await?;
        let partition = partition_name(slug);
        let partition_exists = self.backend().partition_exists(&partition).await?;

        let reachable = if tenant.is_active && partition_exists {
            match self.registry.get(slug).await {
                Ok(ctx) => ctx.handle.ping().await.is_ok(),
                Err(e) => {
                    warn!("Health check could not bind {}: {}", slug, e);
                    false
                }
            }
        } else {
            false
        };

        Ok(TenantHealth {
            slug: tenant.slug,
            is_active: tenant.is_active,
            partition_exists,
            connection: self.registry.state(slug).await,
            reachable,
        })
    }
}

fn new_tenant(slug: &TenantSlug, display_name: &str) -> NewTenant {
    NewTenant {
        slug: slug.clone(),
        display_name: display_name.to_string(),
        partition: partition_name(slug),
    }
}

fn clean_display_name(display_name: &str) -> Result<String, TenantError> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(TenantError::Validation("display name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::database::models::NewMenuItem;
    use crate::testing::Fixture;

    fn slug(raw: &str) -> TenantSlug {
        TenantSlug::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn provision_registers_and_binds() {
        let fixture = Fixture::new().await;
        let tenant = fixture
            .service
            .provision_tenant(&slug("sourabh-upadhyay"), "Sourabh Upadhyay")
            .await
            .unwrap();

        assert_eq!(tenant.partition, "tenant_sourabh_upadhyay");
        assert_eq!(
            fixture.registry.state(&slug("sourabh-upadhyay")).await,
            EntryState::Ready
        );
    }

    #[tokio::test]
    async fn concurrent_signups_share_one_partition() {
        let fixture = Fixture::new().await;
        let target = slug("new-place");

        let a = fixture.service.provision_tenant(&target, "New Place");
        let b = fixture.service.provision_tenant(&target, "New Place");
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(fixture.backend.stats().partitions_created, 1);
        assert_eq!(fixture.backend.partition_count().await, 1);
        assert_eq!(fixture.service.list_tenants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signup_disambiguates_collisions() {
        let fixture = Fixture::new().await;
        let first = fixture.service.signup("Spice Garden").await.unwrap();
        let second = fixture.service.signup("Spice Garden!").await.unwrap();
        let third = fixture.service.signup("spice garden").await.unwrap();

        assert_eq!(first.slug, "spice-garden");
        assert_eq!(second.slug, "spice-garden-2");
        assert_eq!(third.slug, "spice-garden-3");
        assert_eq!(fixture.backend.stats().partitions_created, 3);
    }

    #[tokio::test]
    async fn deprovision_then_get_is_not_found() {
        let fixture = Fixture::new().await;
        let target = slug("sourabh-upadhyay");
        fixture
            .service
            .provision_tenant(&target, "Sourabh Upadhyay")
            .await
            .unwrap();
        let stale = fixture.registry.get(&target).await.unwrap();

        fixture.service.deprovision_tenant(&target).await.unwrap();

        let err = fixture.registry.get(&target).await.unwrap_err();
        assert!(matches!(err, TenantError::TenantNotFound(_)));
        assert!(stale.handle.ping().await.is_err());
        assert_eq!(fixture.backend.partition_count().await, 0);

        let again = fixture.service.deprovision_tenant(&target).await.unwrap_err();
        assert!(matches!(again, TenantError::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn deactivation_evicts_and_blocks_access() {
        let fixture = Fixture::new().await;
        let target = slug("dosa-hut");
        fixture.service.provision_tenant(&target, "Dosa Hut").await.unwrap();

        let update = TenantUpdate { display_name: None, is_active: Some(false) };
        let tenant = fixture.service.update_tenant(&target, update).await.unwrap();
        assert!(!tenant.is_active);
        assert_eq!(fixture.registry.state(&target).await, EntryState::Absent);
        assert!(matches!(
            fixture.registry.get(&target).await,
            Err(TenantError::TenantNotFound(_))
        ));

        // Data survives deactivation
        let update = TenantUpdate { display_name: None, is_active: Some(true) };
        fixture.service.update_tenant(&target, update).await.unwrap();
        assert!(fixture.registry.get(&target).await.is_ok());
    }

    #[tokio::test]
    async fn rename_keeps_partition() {
        let fixture = Fixture::new().await;
        let target = slug("dosa-hut");
        fixture.service.provision_tenant(&target, "Dosa Hut").await.unwrap();
        let ctx = fixture.registry.get(&target).await.unwrap();
        ctx.handle
            .menu_items()
            .create(&NewMenuItem {
                name: "Masala Dosa".to_string(),
                description: None,
                category: None,
                price_paise: 11000,
                is_available: true,
            })
            .await
            .unwrap();

        let update = TenantUpdate { display_name: Some("Dosa Hut Express".into()), is_active: None };
        let renamed = fixture.service.update_tenant(&target, update).await.unwrap();
        assert_eq!(renamed.display_name, "Dosa Hut Express");
        assert_eq!(renamed.partition, "tenant_dosa_hut");

        let ctx = fixture.registry.get(&target).await.unwrap();
        assert_eq!(ctx.display_name, "Dosa Hut Express");
        assert_eq!(ctx.handle.menu_items().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn health_reports_partition_and_connection() {
        let fixture = Fixture::new().await;
        let target = slug("dosa-hut");
        fixture.service.provision_tenant(&target, "Dosa Hut").await.unwrap();

        let health = fixture.service.tenant_health(&target).await.unwrap();
        assert!(health.partition_exists);
        assert!(health.reachable);
        assert_eq!(health.connection, EntryState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_signup_releases_its_slug() {
        let fixture = Fixture::with_timeout(Duration::from_secs(1)).await;
        fixture.backend.set_connect_latency(Duration::from_secs(5));

        for _ in 0..2 {
            let err = fixture.service.signup("Spice Garden").await.unwrap_err();
            assert!(matches!(err, TenantError::ProvisioningTimeout(ref s) if s == "spice-garden"));
            assert!(fixture.service.list_tenants().await.unwrap().is_empty());
            assert_eq!(fixture.backend.partition_count().await, 0);
        }

        fixture.backend.set_connect_latency(Duration::ZERO);
        let tenant = fixture.service.signup("Spice Garden").await.unwrap();
        assert_eq!(tenant.slug, "spice-garden");
        assert_eq!(fixture.service.list_tenants().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deprovision_waits_for_inflight_provisioning() {
        let fixture = Fixture::new().await;
        let target = fixture.register("spice-garden").await;
        fixture.backend.set_partition_latency(Duration::from_secs(2));

        let pending = {
            let registry = fixture.registry.clone();
            let target = target.clone();
            tokio::spawn(async move { registry.get(&target).await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;

        fixture.service.deprovision_tenant(&target).await.unwrap();

        assert!(matches!(
            pending.await.unwrap(),
            Err(TenantError::TenantNotFound(_))
        ));
        assert!(fixture.directory.find(&target).await.unwrap().is_none());
        assert_eq!(fixture.backend.partition_count().await, 0);
        assert_eq!(fixture.backend.stats().create_tables_calls, 0);
    }

    #[tokio::test]
    async fn blank_display_name_is_rejected() {
        let fixture = Fixture::new().await;
        assert!(matches!(
            fixture.service.signup("   ").await,
            Err(TenantError::Validation(_))
        ));
    }
}
