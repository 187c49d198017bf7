// handlers/tenant/menu.rs - /menu routes

use axum::extract::{Json, Path};

use crate::database::models::{MenuItem, NewMenuItem};
use crate::error::ApiError;
use crate::handlers::IdPath;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::TenantContext;

pub async fn menu_list(ctx: TenantContext) -> ApiResult<Vec<MenuItem>> {
    Ok(ApiResponse::success(ctx.handle.menu_items().list().await?))
}

pub async fn menu_create(ctx: TenantContext, Json(body): Json<NewMenuItem>) -> ApiResult<MenuItem> {
    body.validate()?;
    let item = ctx.handle.menu_items().create(&body).await?;
    tracing::debug!("Created menu item {} for {}", item.id, ctx.slug);
    Ok(ApiResponse::created(item))
}

pub async fn menu_get(ctx: TenantContext, Path(path): Path<IdPath>) -> ApiResult<MenuItem> {
    Ok(ApiResponse::success(ctx.handle.menu_items().select_404(path.id).await?))
}

pub async fn menu_delete(ctx: TenantContext, Path(path): Path<IdPath>) -> ApiResult<()> {
    if !ctx.handle.menu_items().delete(path.id).await? {
        return Err(ApiError::not_found(format!("menu item {} not found", path.id)));
    }
    Ok(ApiResponse::no_content())
}
