// handlers/health.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Restro API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "tenant": "/api/t/:tenant/* (path-scoped tenant routes)",
                "staff": "/api/staff/* (tenant from X-Tenant-Slug or token)",
                "root": "/api/root/tenant[/:slug] (requires root token)",
            }
        }
    }))
}

/// Shared database liveness plus how many tenants are currently bound
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();
    let ready = state.registry.ready_count().await;

    match state.backend.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "tenants_ready": ready
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "tenants_ready": ready
                    }
                })),
            )
        }
    }
}
