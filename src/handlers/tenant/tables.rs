// handlers/tenant/tables.rs - /tables routes

use axum::extract::Json;
use serde::Deserialize;

use crate::database::models::{DiningTable, NewDiningTable};
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::TenantContext;

#[derive(Debug, Deserialize)]
pub struct CreateTable {
    pub label: String,
    #[serde(default = "default_seats")]
    pub seats: i64,
}

fn default_seats() -> i64 {
    4
}

pub async fn table_list(ctx: TenantContext) -> ApiResult<Vec<DiningTable>> {
    Ok(ApiResponse::success(ctx.handle.tables().list().await?))
}

pub async fn table_create(ctx: TenantContext, Json(body): Json<CreateTable>) -> ApiResult<DiningTable> {
    let table = NewDiningTable::new(body.label, body.seats)?;
    Ok(ApiResponse::created(ctx.handle.tables().create(&table).await?))
}
