//! Warehouse analytics server - binary entry point

use std::{net::SocketAddr, sync::Arc};

use almacen_backend::config::{Config, LogFormat};
use almacen_backend::external::StoreClient;
use almacen_backend::{create_app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "almacen_server=debug,almacen_backend=debug,tower_http=debug".into());
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!("Starting warehouse analytics server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!(
        store = %config.store.url,
        page_size = config.store.page_size,
        max_rows = config.store.max_rows,
        "Backing store configured"
    );

    let store = StoreClient::new(&config.store)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create application state
    let state = AppState::new(config, Arc::new(store));

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
