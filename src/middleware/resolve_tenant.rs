use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::auth::{authenticate, AuthUser};
use crate::app::AppState;
use crate::error::ApiError;
use crate::tenancy::{TenantError, TenantSlug};

/// Explicit tenant header for callers that cannot put the slug in the path
pub const TENANT_HEADER: &str = "x-tenant-slug";

/// Route parameter carrying the slug in `/api/t/:tenant/...`
pub const TENANT_PARAM: &str = "tenant";

/// Pick the tenant slug from the request's sources.
///
/// Precedence is path, then header, then token claim, but every source that
/// is present must name the same tenant. A disagreement means the caller is
/// trying to reach a tenant other than the one it claims.
pub fn resolve_slug(
    path: Option<&str>,
    header: Option<&str>,
    claim: Option<&str>,
) -> Result<TenantSlug, TenantError> {
    let mut resolved: Option<TenantSlug> = None;

    for raw in [path, header, claim].into_iter().flatten() {
        let slug = TenantSlug::parse(raw)?;
        match &resolved {
            None => resolved = Some(slug),
            Some(first) if *first == slug => {}
            Some(first) => {
                return Err(TenantError::CrossTenantAccessAttempt {
                    bound: first.to_string(),
                    attempted: slug.to_string(),
                })
            }
        }
    }

    resolved.ok_or_else(|| TenantError::InvalidTenantIdentifier("no tenant identifier".to_string()))
}

fn header_slug(headers: &HeaderMap) -> Result<Option<&str>, TenantError> {
    headers
        .get(TENANT_HEADER)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| TenantError::InvalidTenantIdentifier("non-ASCII tenant header".to_string()))
        })
        .transpose()
}

/// Resolve the request's tenant and attach its [`TenantContext`](crate::tenancy::TenantContext)
/// before any handler runs. Unknown tenants are rejected here and never provisioned.
pub async fn resolve_tenant_middleware(
    State(state): State<AppState>,
    path: Option<Path<HashMap<String, String>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user: Option<AuthUser> = authenticate(request.headers(), &state.config.security.jwt_secret)?;

    let path_slug = path.as_ref().and_then(|Path(params)| params.get(TENANT_PARAM).cloned());
    let slug = resolve_slug(
        path_slug.as_deref(),
        header_slug(request.headers())?,
        user.as_ref().and_then(|u| u.tenant.as_deref()),
    )
    .map_err(|e| {
        tracing::warn!("Tenant resolution failed for {}: {}", request.uri().path(), e);
        e
    })?;

    let context = state.registry.get(&slug).await?;

    if let Some(claimed) = user.as_ref().and_then(|u| u.restaurant_id) {
        if claimed != context.restaurant_id {
            return Err(TenantError::CrossTenantAccessAttempt {
                bound: context.restaurant_id.to_string(),
                attempted: claimed.to_string(),
            }
            .into());
        }
    }

    tracing::debug!(
        "Resolved tenant {} (restaurant {}) for {}",
        context.slug,
        context.restaurant_id,
        request.uri().path()
    );

    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
