mod handlers;
mod state;

pub use state::AppState;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::source::{ProfileClient, ProfileSource};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/cities", get(handlers::city_list))
        .route("/api/countries", get(handlers::country_list))
        .route("/api/map", get(handlers::map_frame))
        .route("/api/entities", put(handlers::put_entities))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/viewport", get(handlers::viewport_state))
        .route("/api/viewport/size", post(handlers::viewport_size))
        .route("/api/focus", post(handlers::focus))
        .layer(CorsLayer::permissive())
        // Frames reflect live presenter state.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

pub async fn start(config: Config, offline: bool) -> std::io::Result<()> {
    let client = config
        .api_url
        .as_ref()
        .map(|url| ProfileClient::new(url.clone(), config.api_token.clone()));
    let mut source = ProfileSource::new(client);
    source.set_offline(offline);

    let state = Arc::new(AppState::new(source, config.presenter.clone()));
    initial_load(&state).await;

    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("matchmap server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn initial_load(state: &Arc<AppState>) {
    let loader = Arc::clone(state);
    let loaded = tokio::task::spawn_blocking(move || {
        loader.source.lock().unwrap_or_else(|e| e.into_inner()).load()
    })
    .await;

    match loaded {
        Ok(Ok(entities)) => {
            let mut presenter = state.presenter.lock().unwrap_or_else(|e| e.into_inner());
            presenter.set_entities(entities);
        }
        Ok(Err(e)) => warn!("Starting with an empty map: {}", e),
        Err(e) => warn!("Initial load task failed: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
