// handlers/root/tenant.rs - /api/root/tenant routes (root token required)

use axum::extract::{Json, Path, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{TenantHealth, TenantUpdate};
use crate::tenancy::TenantSlug;

#[derive(Debug, Deserialize)]
pub struct CreateTenant {
    pub display_name: String,
    /// Explicit slug; derived from the display name when absent
    #[serde(default)]
    pub slug: Option<String>,
}

/// POST /api/root/tenant - register and provision a restaurant
pub async fn tenant_create(
    State(state): State<AppState>,
    Json(body): Json<CreateTenant>,
) -> ApiResult<Tenant> {
    let tenant = match body.slug {
        Some(raw) => {
            let slug = TenantSlug::parse(&raw)?;
            state.tenants.provision_tenant(&slug, &body.display_name).await?
        }
        None => state.tenants.signup(&body.display_name).await?,
    };
    Ok(ApiResponse::created(tenant))
}

/// GET /api/root/tenant
pub async fn tenant_list(State(state): State<AppState>) -> ApiResult<Vec<Tenant>> {
    Ok(ApiResponse::success(state.tenants.list_tenants().await?))
}

/// GET /api/root/tenant/:slug
pub async fn tenant_show(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Tenant> {
    let slug = TenantSlug::parse(&slug)?;
    Ok(ApiResponse::success(state.tenants.get_tenant(&slug).await?))
}

/// PATCH /api/root/tenant/:slug - rename, activate or deactivate
pub async fn tenant_update(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<TenantUpdate>,
) -> ApiResult<Tenant> {
    let slug = TenantSlug::parse(&slug)?;
    Ok(ApiResponse::success(state.tenants.update_tenant(&slug, body).await?))
}

/// DELETE /api/root/tenant/:slug - drop the partition and forget the tenant
pub async fn tenant_delete(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<()> {
    let slug = TenantSlug::parse(&slug)?;
    state.tenants.deprovision_tenant(&slug).await?;
    Ok(ApiResponse::no_content())
}

/// GET /api/root/tenant/:slug/health
pub async fn tenant_health(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<TenantHealth> {
    let slug = TenantSlug::parse(&slug)?;
    Ok(ApiResponse::success(state.tenants.tenant_health(&slug).await?))
}
