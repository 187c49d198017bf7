// handlers/tenant/ratings.rs - /ratings routes

use axum::extract::Json;

use crate::database::models::{NewRating, Rating};
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::TenantContext;

pub async fn rating_list(ctx: TenantContext) -> ApiResult<Vec<Rating>> {
    Ok(ApiResponse::success(ctx.handle.ratings().list().await?))
}

pub async fn rating_submit(ctx: TenantContext, Json(body): Json<NewRating>) -> ApiResult<Rating> {
    Ok(ApiResponse::created(ctx.handle.ratings().submit(body).await?))
}
