//! taskward-server: HTTP front end for the inference task manager.
//!
//! Config comes from `config/<ENV>.yaml` (or `--config <path>`).
//! Logging: `RUST_LOG` overrides `logging.level`; output goes to stderr and,
//! with `logging.file_enabled`, to a daily-rolling file.

mod cli;
mod config;
mod logging;
mod routes;
mod schemas;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use taskward_core::{SimulatedExecutor, TaskManagerBuilder};

use crate::cli::Cli;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(config_path_from_env);
    let loaded = config::load(&path)?;
    let found = loaded.is_some();
    let app_config = loaded.unwrap_or_default();

    let _log_guard = logging::init(&app_config.logging)?;

    if found {
        tracing::info!(path = %path.display(), "configuration loaded");
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
    }

    let manager = TaskManagerBuilder::new(app_config.inference.clone())
        .executor(SimulatedExecutor::default())
        .build()
        .context("invalid inference configuration")?;
    let manager = Arc::new(manager);
    manager.start_periodic_cleanup().await;

    let app = routes::router(
        AppState::new(Arc::clone(&manager), &app_config),
        &app_config.api.prefix,
    );
    let bind = cli.bind.unwrap_or_else(|| app_config.server.bind_addr());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(
        bind = %bind,
        app_name = %app_config.app_name,
        title = %app_config.api.title,
        prefix = %app_config.api.prefix,
        "listening (Ctrl+C/SIGTERM to stop)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    tracing::info!("server stopped");
    Ok(())
}

fn config_path_from_env() -> PathBuf {
    config::default_path(std::env::var("ENV").ok().as_deref())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
