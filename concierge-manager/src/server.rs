use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat_handler, health_handler, index_handler, reset_handler};
use crate::state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/chat", post(chat_handler))
        .route("/reset", post(reset_handler))
        .route("/health", get(health_handler));

    let router = match &state.ui_path {
        Some(path) => router.route_service("/", ServeFile::new(path)),
        None => router.route("/", get(index_handler)),
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}
