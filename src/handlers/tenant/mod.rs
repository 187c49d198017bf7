//! Tenant-scoped routes. Every handler takes a [`TenantContext`]; the
//! resolution middleware guarantees it is present and bound.

pub mod menu;
pub mod orders;
pub mod ratings;
pub mod tables;
pub mod users;

pub use menu::{menu_create, menu_delete, menu_get, menu_list};
pub use orders::{order_get, order_list, order_place, order_status};
pub use ratings::{rating_list, rating_submit};
pub use tables::{table_create, table_list};
pub use users::{user_create, user_list};

use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::{TenantContext, TenantSummary};

/// GET /api/t/:tenant - the resolved restaurant
pub async fn tenant_show(ctx: TenantContext) -> ApiResult<TenantSummary> {
    Ok(ApiResponse::success(ctx.summary()))
}
