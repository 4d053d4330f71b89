mod http;

use anyhow::{Context, Result};
use coordination::config::AwConfig;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    coordination::telemetry::init_subscriber();

    let config = AwConfig::default();
    info!(
        bind_addr = %config.bind_addr,
        planners = config.planner_urls.len(),
        builders = config.builder_urls.len(),
        reviewers = config.reviewer_urls.len(),
        str_parallelism = config.str_parallelism,
        "agent-wrangler orchestrator starting"
    );

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(http::AppState::new(config));
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .await
        .context("orchestrator server exited")?;

    Ok(())
}
