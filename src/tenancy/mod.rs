//! Tenant isolation and connection lifecycle.
//!
//! A tenant is a restaurant identified by its slug. Each one owns a storage
//! partition named by [`partition_name`], provisioned by
//! [`PartitionProvisioner`], bound into a [`TenantHandle`] by [`TenantBinder`]
//! and cached by the [`ConnectionRegistry`].

pub mod binder;
pub mod context;
pub mod error;
pub mod namer;
pub mod provisioner;
pub mod registry;
pub mod relations;
pub mod slug;

pub use binder::{TenantBinder, TenantHandle};
pub use context::{TenantContext, TenantSummary};
pub use error::TenantError;
pub use namer::{partition_name, PartitionName, PARTITION_PREFIX};
pub use provisioner::{PartitionDestroyer, PartitionProvisioner};
pub use registry::{ConnectionRegistry, EntryState};
pub use relations::{Orders, Ratings};
pub use slug::{slugify, TenantSlug};
