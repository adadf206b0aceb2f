use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::handlers::{category, entity, user};
use crate::middleware::identity_middleware;
use crate::services::{CategoryService, EntityService, UserService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub entities: Arc<EntityService>,
    pub categories: Arc<CategoryService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(entities: EntityService, categories: CategoryService, users: UserService) -> Self {
        Self {
            entities: Arc::new(entities),
            categories: Arc::new(categories),
            users: Arc::new(users),
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(
            EntityService::from_pool(pool.clone()),
            CategoryService::from_pool(pool.clone()),
            UserService::from_pool(pool),
        )
    }
}

pub fn app(state: AppState) -> Router {
    let settings = config::config();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(category_routes())
        // Caller identity required
        .merge(entity_routes())
        .merge(user_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes));

    if settings.security.enable_cors {
        router = router.layer(cors_layer(&settings.security.cors_origins));
    }
    if settings.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn entity_routes() -> Router<AppState> {
    Router::new()
        .route("/entity/root", post(entity::create_root))
        .route("/entity/sub", post(entity::create_sub))
        .route("/entity/:entity_id/children", get(entity::list_children))
        .route("/entity/:entity_id/hierarchy", get(entity::get_hierarchy))
        .route_layer(middleware::from_fn(identity_middleware))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/has-entity", get(entity::has_entity))
        .route("/user/details", get(user::get_details).post(user::update_details))
        .route("/user/check-parent-id", get(user::check_parent))
        .route("/user/children", get(user::list_children))
        .route_layer(middleware::from_fn(identity_middleware))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/category", post(category::add_category))
        .route("/category/all", get(category::list_all))
        .route("/category/type/:kind", get(category::list_by_kind))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        if crate::is_production!() {
            tracing::warn!("CORS allows any origin in production");
        }
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Zolaris API (Rust)",
            "version": version,
            "description": "Entity hierarchy service for IoT fleets and accounts",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "category": "/category, /category/all, /category/type/:kind (public)",
                "entity": "/entity/root, /entity/sub, /entity/:id/children, /entity/:id/hierarchy (X-User-ID)",
                "user": "/user/has-entity, /user/details, /user/check-parent-id, /user/children (X-User-ID)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    health_report(DatabaseManager::health_check().await)
}

/// Database failures are logged; clients only see a degraded status
fn health_report(database: Result<(), DatabaseError>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match database {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
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
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
