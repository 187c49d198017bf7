pub mod auth;
pub mod resolve_tenant;
pub mod response;
pub mod root;

pub use auth::{authenticate, AuthUser};
pub use resolve_tenant::{resolve_slug, resolve_tenant_middleware, TENANT_HEADER};
pub use response::{ApiResponse, ApiResult};
pub use root::root_access_middleware;
