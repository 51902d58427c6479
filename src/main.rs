use anyhow::Result;
use axum::Router;
use census_services::{config, logging, routes, AppState};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.bind_addr;
    let max_file_size = config.max_file_size;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .merge(routes::routes(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
