use axum::{
    http::{header, HeaderValue, Method},
    routing::post,
    Router,
};
use ahoy_core::config::RelayConfig;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::chat_handler;
use crate::state::AppState;

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    if allowed_origin.trim() == "*" {
        return CorsLayer::permissive();
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    match allowed_origin.trim().parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!("Ignoring invalid CORS origin {:?}: {}", allowed_origin, e);
            layer
        }
    }
}

pub fn router(state: AppState, allowed_origin: &str) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .layer(cors_layer(allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    config: &RelayConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(state, &config.allowed_origin);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}
