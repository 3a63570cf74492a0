// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::application::device_view::{DeviceViewService, spawn_idle_sweeper};
use crate::infrastructure::config::load_fleet_config;
use crate::infrastructure::fleet_api::FleetApiClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    change_page, change_window, close_device_view, get_device_view, health_check,
    open_device_view, stream_view_events,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive("info".parse().expect("invalid filter"))
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_fleet_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(FleetApiClient::new(
        config.backend.base_url,
        config.backend.api_token,
        Duration::from_secs(config.backend.request_timeout_secs),
    )?);

    // Create services (application layer)
    let device_views = Arc::new(DeviceViewService::new(repository));
    spawn_idle_sweeper(device_views.clone());

    // Create application state
    let state = Arc::new(AppState { device_views });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/device-views", post(open_device_view))
        .route(
            "/device-views/:view_id",
            get(get_device_view).delete(close_device_view),
        )
        .route("/device-views/:view_id/window", put(change_window))
        .route("/device-views/:view_id/page", put(change_page))
        .route("/device-views/:view_id/events", get(stream_view_events))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.listen_addr.parse()?;
    tracing::info!(%addr, "starting fleet-telemetry service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
