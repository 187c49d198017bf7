// handlers/tenant/orders.rs - /orders routes

use axum::extract::{Json, Path};
use serde::Deserialize;

use crate::database::models::{Order, OrderDetails, OrderStatus, PlaceOrder};
use crate::handlers::IdPath;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::TenantContext;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

pub async fn order_list(ctx: TenantContext) -> ApiResult<Vec<Order>> {
    Ok(ApiResponse::success(ctx.handle.orders().list().await?))
}

/// Menu items and table are resolved inside this restaurant only
pub async fn order_place(ctx: TenantContext, Json(body): Json<PlaceOrder>) -> ApiResult<OrderDetails> {
    let details = ctx.handle.orders().place(body).await?;
    tracing::info!(
        "Order {} placed at {} for {} paise",
        details.order.id,
        ctx.slug,
        details.order.total_paise
    );
    Ok(ApiResponse::created(details))
}

pub async fn order_get(ctx: TenantContext, Path(path): Path<IdPath>) -> ApiResult<OrderDetails> {
    Ok(ApiResponse::success(ctx.handle.orders().get(path.id).await?))
}

pub async fn order_status(
    ctx: TenantContext,
    Path(path): Path<IdPath>,
    Json(body): Json<StatusChange>,
) -> ApiResult<Order> {
    Ok(ApiResponse::success(
        ctx.handle.orders().set_status(path.id, body.status).await?,
    ))
}
