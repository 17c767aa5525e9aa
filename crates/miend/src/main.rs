use std::sync::Arc;

use anyhow::{Context, Result};
use mien_rekognition::RekognitionAnalyzer;
use tracing_subscriber::EnvFilter;

use miend::app::build_router;
use miend::config::Config;
use miend::engine::{spawn_engine, EngineSettings};
use miend::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("miend=info,mien_core=info,tower_http=info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "miend starting");

    let config = Config::load().context("failed to load configuration")?;
    let addr = config.socket_addr()?;
    tracing::info!(
        %addr,
        region = config.aws_region.as_deref().unwrap_or("default chain"),
        default_mode = %config.default_mode,
        max_upload_bytes = config.max_upload_bytes,
        "configuration loaded"
    );

    let analyzer =
        RekognitionAnalyzer::from_env(config.aws_region.clone(), config.upstream_timeout()).await;
    let engine = spawn_engine(
        Arc::new(analyzer),
        EngineSettings {
            max_upload_bytes: config.max_upload_bytes,
            label_options: config.label_options(),
            max_concurrent: config.max_concurrent_analyses,
            upstream_timeout: config.upstream_timeout(),
        },
    );

    let state = AppState {
        engine,
        config: Arc::new(config),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "miend ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("miend shut down");
    Ok(())
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
