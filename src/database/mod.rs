pub mod backend;
pub mod directory;
pub mod dynamic;
pub mod error;
pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

pub use backend::{Row, StorageBackend, TenantConnection};
pub use directory::{NewTenant, PgTenantDirectory, TenantDirectory};
pub use error::DatabaseError;
pub use manager::{DatabaseManager, PoolSettings};
pub use memory::{BackendStats, MemoryBackend, MemoryDirectory};
pub use repository::{where_eq, Collection, Entity};
pub use schema::{TableDef, TENANT_TABLES};
