use std::sync::Arc;

use anyhow::Context;

use arena_api::app::{build_app, AppServices};
use arena_infra::PipelineConfig;

const ENV_BIND_ADDR: &str = "ARENA_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    arena_observability::init();

    let config = PipelineConfig::from_env();
    let bind_addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| {
        tracing::warn!("{ENV_BIND_ADDR} not set; using {DEFAULT_BIND_ADDR}");
        DEFAULT_BIND_ADDR.to_string()
    });

    let services = Arc::new(AppServices::in_memory(config));
    let workers = services.start();
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("server error")?;

    tracing::info!("draining background workers");
    workers.shutdown().await;
    Ok(())
}
