use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;

use super::binder::TenantHandle;
use super::slug::TenantSlug;
use crate::error::ApiError;

/// Resolved tenant attached to a request by the resolution middleware.
///
/// Handlers take this as an extractor; a route that was not wrapped by the
/// middleware fails loudly instead of running without a tenant.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub slug: TenantSlug,
    pub restaurant_id: i64,
    pub display_name: String,
    pub handle: TenantHandle,
}

/// Client-safe view of a context
#[derive(Debug, Serialize)]
pub struct TenantSummary {
    pub slug: String,
    pub restaurant_id: i64,
    pub display_name: String,
}

impl TenantContext {
    pub fn summary(&self) -> TenantSummary {
        TenantSummary {
            slug: self.slug.to_string(),
            restaurant_id: self.restaurant_id,
            display_name: self.display_name.clone(),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<TenantContext>().cloned().ok_or_else(|| {
            tracing::error!(
                "No tenant context on {}; route is missing tenant resolution",
                parts.uri.path()
            );
            ApiError::internal_server_error("Tenant context unavailable")
        })
    }
}
