//! Scrape endpoint for the metrics exporter.
//!
//! `GET /metrics` renders the registry at scrape time. `GET /health`
//! answers 503 until today's attendance status has been loaded once.

use super::MetricsExporter;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Routes for the exporter.
pub fn router(exporter: Arc<MetricsExporter>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(exporter)
}

/// Serves the exporter on `addr` until the listener fails.
pub async fn serve(addr: SocketAddr, exporter: Arc<MetricsExporter>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Metrics exporter listening");
    axum::serve(listener, router(exporter)).await
}

async fn scrape(State(exporter): State<Arc<MetricsExporter>>) -> impl IntoResponse {
    match exporter.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("failed to encode metrics: {e}"),
        ),
    }
}

async fn health(State(exporter): State<Arc<MetricsExporter>>) -> impl IntoResponse {
    if exporter.has_status() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "attendance status not loaded")
    }
}
