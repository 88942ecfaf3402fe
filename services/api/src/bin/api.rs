//! services/api/src/bin/api.rs

use api_lib::{
    adapters::RestGateway,
    config::Config,
    error::ApiError,
    web::{state::AppState, ws_handler},
};
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Build the Gateway Client ---
    let gateway = Arc::new(RestGateway::new(
        config.gateway_url.clone(),
        config.gateway_anon_key.clone(),
    )?);
    info!("Gateway client ready for {}", config.gateway_url);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        gateway,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?,
        )
        .allow_methods([Method::GET]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}
