use anyhow::{Context, Result};
use catalog_admin::config::Config;
use catalog_admin::scheduler;
use catalog_admin::server::{self, AppState};
use catalog_admin::workspace::Workspace;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalog_admin=info".parse()?),
        )
        .init();

    info!("Starting catalog admin server");

    let config = Config::from_env()?;
    let workspace = Workspace::from_config(&config)?;
    if config.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY not set, every mutating endpoint will answer 401");
    }

    let state = AppState::new(workspace, config.admin_api_key.clone());

    let mut jobs = if config.snapshot_schedule.is_empty() {
        info!("SNAPSHOT_SCHEDULE not set, no scheduled snapshots");
        None
    } else {
        Some(scheduler::start_scheduler(Arc::clone(&state.workspace), &config.snapshot_schedule).await?)
    };

    let app = server::router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    if let Some(scheduler) = jobs.as_mut() {
        scheduler.shutdown().await?;
    }
    info!("Server shutdown complete");
    Ok(())
}
