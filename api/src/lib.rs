//! # Training Kit API
//!
//! HTTP surface over the generation pipeline:
//!
//! - `POST /api/generate`: run one generation request
//! - `GET /api/usage?email=`: lifetime quota position of a requester
//! - `GET /health`, `GET /metrics`

pub mod errors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post}
};
use config::ServerConfig;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use errors::{ApiError, ApiResult};
pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health_handler))
        .route("/metrics", get(routes::metrics_handler))
        .route("/api/generate", post(routes::generate_handler))
        .route("/api/usage", get(routes::usage_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn socket_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", server.host, server.port).parse()?)
}
