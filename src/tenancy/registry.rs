//! Process-wide cache of bound tenant handles.
//!
//! One slot per tenant. The map lock is held only to find or insert a slot.
//! Provisioning runs under the slot's own attempt lock, so a slow tenant never
//! blocks another and concurrent first requests for one tenant share a single
//! provisioning sequence, including its failure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use super::binder::TenantBinder;
use super::context::TenantContext;
use super::error::TenantError;
use super::namer::{partition_name, PartitionName};
use super::provisioner::PartitionProvisioner;
use super::slug::TenantSlug;
use crate::database::{DatabaseError, TenantDirectory};

/// Observable lifecycle of one registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Absent,
    Provisioning,
    Ready,
}

#[derive(Default)]
struct Slot {
    cell: OnceCell<TenantContext>,
    /// Held for the whole provisioning attempt. Holds the failure once the
    /// attempt has failed; such a slot is already out of the map.
    attempt: Mutex<Option<TenantError>>,
    /// Callers currently inside `get` for this slot
    waiters: AtomicUsize,
    evicted: AtomicBool,
}

struct Waiting(Arc<Slot>);

impl Drop for Waiting {
    fn drop(&mut self) {
        self.0.waiters.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ConnectionRegistry {
    slots: RwLock<HashMap<TenantSlug, Arc<Slot>>>,
    directory: Arc<dyn TenantDirectory>,
    provisioner: PartitionProvisioner,
    provision_timeout: Duration,
}

impl ConnectionRegistry {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        provisioner: PartitionProvisioner,
        provision_timeout: Duration,
    ) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            directory,
            provisioner,
            provision_timeout,
        }
    }

    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    pub fn provisioner(&self) -> &PartitionProvisioner {
        &self.provisioner
    }

    /// Resolve the bound context for `slug`, provisioning it on first use.
    ///
    /// Callers that queue behind an attempt receive its outcome: the shared
    /// context, or the same failure. Nobody waits longer than one attempt.
    pub async fn get(&self, slug: &TenantSlug) -> Result<TenantContext, TenantError> {
        if let Some(ctx) = self.cached(slug).await {
            debug!("Registry hit for {}", slug);
            return Ok(ctx);
        }

        let (slot, _waiting) = {
            let mut slots = self.slots.write().await;
            let slot = slots.entry(slug.clone()).or_default().clone();
            slot.waiters.fetch_add(1, Ordering::SeqCst);
            (slot.clone(), Waiting(slot))
        };

        let mut outcome = slot.attempt.lock().await;
        if let Some(ctx) = slot.cell.get() {
            return Ok(ctx.clone());
        }
        if let Some(failure) = outcome.as_ref() {
            debug!("Sharing failed provisioning of {}", slug);
            return Err(failure.reissue());
        }
        if slot.evicted.load(Ordering::SeqCst) {
            return Err(TenantError::TenantNotFound(slug.to_string()));
        }

        match self.establish(slug, &slot.evicted).await {
            Ok(ctx) if slot.evicted.load(Ordering::SeqCst) => {
                // The evictor is waiting on this attempt and finds no handle
                warn!("Tenant {} was evicted during provisioning", slug);
                ctx.handle.close().await;
                let err = TenantError::TenantNotFound(slug.to_string());
                *outcome = Some(err.reissue());
                Err(err)
            }
            Ok(ctx) => {
                if slot.cell.set(ctx.clone()).is_err() {
                    error!("Registry slot for {} was initialised twice", slug);
                }
                Ok(ctx)
            }
            Err(err) => {
                *outcome = Some(err.reissue());
                self.discard_failed(slug, &slot).await;
                Err(err)
            }
        }
    }

    async fn cached(&self, slug: &TenantSlug) -> Option<TenantContext> {
        self.slots
            .read()
            .await
            .get(slug)
            .and_then(|slot| slot.cell.get().cloned())
    }

    async fn establish(
        &self,
        slug: &TenantSlug,
        evicted: &AtomicBool,
    ) -> Result<TenantContext, TenantError> {
        let attempt = self.provision_and_bind(slug, evicted);
        match tokio::time::timeout(self.provision_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Provisioning {} exceeded {:?}; entry reverts to absent",
                    slug, self.provision_timeout
                );
                Err(TenantError::ProvisioningTimeout(slug.to_string()))
            }
        }
    }

    async fn provision_and_bind(
        &self,
        slug: &TenantSlug,
        evicted: &AtomicBool,
    ) -> Result<TenantContext, TenantError> {
        let tenant = match self.directory.find(slug).await? {
            Some(tenant) if tenant.is_active => tenant,
            Some(_) => {
                warn!("Tenant {} is inactive", slug);
                return Err(TenantError::TenantNotFound(slug.to_string()));
            }
            None => {
                warn!("Tenant {} is not registered", slug);
                return Err(TenantError::TenantNotFound(slug.to_string()));
            }
        };

        let expected = partition_name(slug);
        if PartitionName::from_stored(&tenant.partition).as_ref() != Some(&expected) {
            error!(
                "Registry partition {} for {} does not match {}",
                tenant.partition, slug, expected
            );
            return Err(TenantError::CrossTenantAccessAttempt {
                bound: tenant.partition,
                attempted: expected.to_string(),
            });
        }

        let still_wanted = || {
            if evicted.load(Ordering::SeqCst) {
                warn!("Tenant {} was evicted before provisioning finished", slug);
                return Err(TenantError::TenantNotFound(slug.to_string()));
            }
            Ok(())
        };

        still_wanted()?;
        let partition = self.provisioner.ensure_partition(slug).await?;
        still_wanted()?;
        self.provisioner.ensure_tables(slug, &partition).await?;

        let connection = self
            .provisioner
            .backend()
            .connect(&partition)
            .await
            .map_err(|e| connect_error(&partition, e))?;

        let handle = match TenantBinder::bind(connection.clone(), &partition) {
            Ok(handle) => handle,
            Err(err) => {
                connection.close().await;
                return Err(err);
            }
        };

        info!("Tenant {} ready (restaurant {})", slug, tenant.id);
        Ok(TenantContext {
            slug: slug.clone(),
            restaurant_id: tenant.id,
            display_name: tenant.display_name,
            handle,
        })
    }

    /// Take a failed slot out of the map. Callers already queued on it get
    /// the recorded failure; the next caller starts a fresh attempt.
    async fn discard_failed(&self, slug: &TenantSlug, slot: &Arc<Slot>) {
        let mut slots = self.slots.write().await;
        if slots.get(slug).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(slug);
        }
    }

    pub async fn state(&self, slug: &TenantSlug) -> EntryState {
        match self.slots.read().await.get(slug) {
            Some(slot) if slot.cell.initialized() => EntryState::Ready,
            Some(slot) if slot.waiters.load(Ordering::SeqCst) > 0 => EntryState::Provisioning,
            _ => EntryState::Absent,
        }
    }

    /// Remove and close the entry for `slug`. Returns whether one existed.
    ///
    /// Returns only after any in-flight provisioning attempt has settled, so
    /// no DDL for `slug` runs after this.
    pub async fn evict(&self, slug: &TenantSlug) -> bool {
        let Some(slot) = self.slots.write().await.remove(slug) else {
            return false;
        };

        slot.evicted.store(true, Ordering::SeqCst);
        let _settled = slot.attempt.lock().await;
        if let Some(ctx) = slot.cell.get() {
            ctx.handle.close().await;
            info!("Closed connection for tenant {}", slug);
        }
        true
    }

    /// Close every cached handle. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let slots: Vec<(TenantSlug, Arc<Slot>)> = self.slots.write().await.drain().collect();

        let mut closed = 0;
        for (slug, slot) in slots {
            slot.evicted.store(true, Ordering::SeqCst);
            let _settled = slot.attempt.lock().await;
            if let Some(ctx) = slot.cell.get() {
                ctx.handle.close().await;
                debug!("Closed connection for tenant {}", slug);
                closed += 1;
            }
        }
        info!("Closed {} tenant connections", closed);
        closed
    }

    /// Number of tenants with a ready handle
    pub async fn ready_count(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.cell.initialized())
            .count()
    }
}

fn connect_error(partition: &PartitionName, err: DatabaseError) -> TenantError {
    match err {
        DatabaseError::PoolExhausted(_) => {
            warn!("Connection pool exhausted for {}", partition);
            TenantError::ConnectionExhausted(partition.to_string())
        }
        source => {
            error!("Failed to connect to {}: {}", partition, source);
            TenantError::Provisioning {
                partition: partition.to_string(),
                source,
            }
        }
    }
}
