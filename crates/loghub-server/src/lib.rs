//! loghub REST + WebSocket Server
//!
//! HTTP/JSON API for submitting and querying log records, plus a WebSocket
//! endpoint for persistent-connection ingestion and real-time fan-out.
//!
//! ## Architecture
//! The server wires four components around a shared `AppState`:
//! - **SQLite store**: durable records and owner identities
//! - **Ingestion gateway**: the single validate/resolve/persist/broadcast
//!   path shared by the HTTP and WebSocket entry points
//! - **Broadcaster**: identity-scoped fan-out to live connections
//! - **Retention sweeper**: hourly deletion of expired records

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use loghub_core::KeepaliveConfig;

pub mod broadcast;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod retention;
pub mod store;
pub mod ws;

use broadcast::Broadcaster;
use ingest::LogIngest;
use store::{IdentityStore, RecordStore};

/// Application state shared across handlers and connection tasks
#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<dyn IdentityStore>,
    pub records: Arc<dyn RecordStore>,
    pub broadcaster: Arc<Broadcaster>,
    pub ingest: Arc<LogIngest>,
    pub keepalive: KeepaliveConfig,
}

impl AppState {
    /// Build the state graph: a broadcaster plus an ingestion gateway wired
    /// to the given stores.
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        records: Arc<dyn RecordStore>,
        keepalive: KeepaliveConfig,
    ) -> Self {
        let broadcaster = Arc::new(Broadcaster::new());
        let ingest = Arc::new(LogIngest::new(
            identities.clone(),
            records.clone(),
            broadcaster.clone(),
        ));
        Self {
            identities,
            records,
            broadcaster,
            ingest,
            keepalive,
        }
    }
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Logs
        .route(
            "/logs",
            post(handlers::logs::create_log).get(handlers::logs::get_logs),
        )
        // Owners
        .route("/owners", post(handlers::owners::register_owner))
        .route("/owners/me", get(handlers::owners::get_me))
        .route("/owners/alias", put(handlers::owners::update_alias))
        .route("/owners/retention", put(handlers::owners::update_retention))
        .with_state(state.clone());

    // WebSocket routes
    let ws_routes = Router::new()
        .route("/logs", get(ws::logs_websocket))
        .with_state(state);

    // OpenAPI documentation
    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/ws", ws_routes)
        .merge(swagger)
        .route("/health", get(handlers::health::health_check))
        .layer(CorsLayer::permissive())
}

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::logs::create_log,
        handlers::logs::get_logs,
        handlers::owners::register_owner,
        handlers::owners::get_me,
        handlers::owners::update_alias,
        handlers::owners::update_retention,
        handlers::health::health_check,
    ),
    components(schemas(
        models::IngestRequest,
        models::IngestResponse,
        models::LogsResponse,
        models::ErrorResponse,
        models::RegisterOwnerRequest,
        models::OwnerResponse,
        models::UpdateAliasRequest,
        models::UpdateRetentionRequest,
        models::HealthResponse,
    )),
    tags(
        (name = "logs", description = "Log ingestion and catch-up queries"),
        (name = "owners", description = "Owner accounts and settings"),
        (name = "health", description = "Health checks"),
    ),
    info(
        title = "loghub API",
        version = "0.1.0",
        description = "Real-time log distribution: identity-scoped ingestion, fan-out, and retention"
    )
)]
struct ApiDoc;
