use metrics_exporter_prometheus::PrometheusBuilder;
use pipeline::{Orchestrator, RateLimitSweeper, RateLimiter};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{AppState, create_router, socket_addr};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.logging_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting training kit API");

    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let sweeper = RateLimitSweeper::new(limiter.clone(), config.rate_limit.sweep_interval()).start();

    let orchestrator = Arc::new(Orchestrator::from_config(&config, limiter)?);
    let mut state = AppState::new(orchestrator);
    if config.observability.metrics_enabled {
        state = state.with_metrics(PrometheusBuilder::new().install_recorder()?);
        info!("Prometheus recorder installed");
    }

    let app = create_router(state);

    let addr = socket_addr(&config.server)?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}
