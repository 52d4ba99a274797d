//! Warehouse analytics server
//!
//! Consumption history, issuance summaries and purchase projections computed
//! over a remote tabular store that serves capped pages.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;

use external::BackingStore;
use services::ViewRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BackingStore>,
    pub views: Arc<ViewRegistry>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BackingStore>) -> Self {
        Self {
            views: Arc::new(ViewRegistry::from_config(&config)),
            config: Arc::new(config),
            store,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Almacen Analytics API v1.0"
}
