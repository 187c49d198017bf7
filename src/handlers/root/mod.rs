pub mod tenant;

pub use tenant::{tenant_create, tenant_delete, tenant_health, tenant_list, tenant_show, tenant_update};
