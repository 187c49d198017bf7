// handlers/tenant/users.rs - /users routes (restaurant staff)

use axum::extract::Json;

use crate::database::models::{NewStaffUser, StaffUser};
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenancy::TenantContext;

pub async fn user_list(ctx: TenantContext) -> ApiResult<Vec<StaffUser>> {
    Ok(ApiResponse::success(ctx.handle.users().list().await?))
}

pub async fn user_create(ctx: TenantContext, Json(body): Json<NewStaffUser>) -> ApiResult<StaffUser> {
    body.validate()?;
    Ok(ApiResponse::created(ctx.handle.users().create(&body).await?))
}
