use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager, PgTenantDirectory, StorageBackend, TenantDirectory};
use crate::handlers::{self, root, tenant};
use crate::middleware::{resolve_tenant_middleware, root_access_middleware};
use crate::services::TenantService;
use crate::tenancy::{ConnectionRegistry, PartitionProvisioner};

/// Shared application state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn StorageBackend>,
    pub registry: Arc<ConnectionRegistry>,
    pub tenants: Arc<TenantService>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        backend: Arc<dyn StorageBackend>,
        directory: Arc<dyn TenantDirectory>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(
            directory,
            PartitionProvisioner::new(backend.clone()),
            config.tenancy.provision_timeout(),
        ));
        let tenants = Arc::new(TenantService::new(
            registry.clone(),
            config.tenancy.max_slug_attempts,
        ));

        Self {
            config,
            backend,
            registry,
            tenants,
        }
    }

    /// PostgreSQL-backed state: one schema per tenant plus the shared registry.
    pub async fn connect(config: Arc<AppConfig>) -> Result<Self, DatabaseError> {
        let manager = DatabaseManager::connect(&config.database).await?;
        let directory = PgTenantDirectory::new(manager.admin_pool().clone(), &config.database.registry_schema);
        directory.ensure_registry(&config.database.registry_schema).await?;

        Ok(Self::new(config, Arc::new(manager), Arc::new(directory)))
    }
}

pub fn app(state: AppState) -> Router {
    let tenant_scoped = tenant_routes("/api/t/:tenant")
        .merge(tenant_routes("/api/staff"))
        .route_layer(from_fn_with_state(state.clone(), resolve_tenant_middleware));

    let root_scoped = root_routes()
        .route_layer(from_fn_with_state(state.clone(), root_access_middleware));

    Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .merge(tenant_scoped)
        .merge(root_scoped)
        // Global middleware
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The same tenant surface under a path-scoped and a token/header-scoped prefix
fn tenant_routes(prefix: &str) -> Router<AppState> {
    let at = |path: &str| format!("{}{}", prefix, path);

    Router::new()
        .route(prefix, get(tenant::tenant_show))
        .route(&at("/menu"), get(tenant::menu_list).post(tenant::menu_create))
        .route(&at("/menu/:id"), get(tenant::menu_get).delete(tenant::menu_delete))
        .route(&at("/tables"), get(tenant::table_list).post(tenant::table_create))
        .route(&at("/users"), get(tenant::user_list).post(tenant::user_create))
        .route(&at("/orders"), get(tenant::order_list).post(tenant::order_place))
        .route(&at("/orders/:id"), get(tenant::order_get))
        .route(&at("/orders/:id/status"), patch(tenant::order_status))
        .route(&at("/ratings"), get(tenant::rating_list).post(tenant::rating_submit))
}

fn root_routes() -> Router<AppState> {
    Router::new()
        .route("/api/root/tenant", post(root::tenant_create).get(root::tenant_list))
        .route(
            "/api/root/tenant/:slug",
            get(root::tenant_show)
                .patch(root::tenant_update)
                .delete(root::tenant_delete),
        )
        .route("/api/root/tenant/:slug/health", get(root::tenant_health))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
