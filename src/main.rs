use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wan_gateway::{build_app, worker, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config)?);

    if state.videos.is_some() && state.config.download_videos {
        let worker_state = state.clone();
        tokio::spawn(async move {
            worker::run_cleanup_worker(worker_state).await;
        });
    }

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
