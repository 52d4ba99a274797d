//! Route definitions for the warehouse analytics server

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/articulos", article_routes())
        .nest("/salidas", issue_routes())
        .nest("/compras", purchase_routes())
}

/// Per-article views
fn article_routes() -> Router<AppState> {
    Router::new().route("/:codigo/historial", get(handlers::get_item_history))
}

/// Issuance views
fn issue_routes() -> Router<AppState> {
    Router::new().route("/resumen", get(handlers::get_issue_summary))
}

/// Purchasing views
fn purchase_routes() -> Router<AppState> {
    Router::new().route("/proyeccion", get(handlers::get_purchase_projection))
}
