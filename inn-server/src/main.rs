//! inn-server - Contest backend for I'M GOING INN
//!
//! Serves team registration, round submissions, AI-assisted evaluation and
//! the leaderboard as a JSON API, with an SSE stream for live contest state.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use inn_common::config::{database_path, ensure_root_folder};
use inn_common::db::init_database;
use inn_server::api::health::BUILD;
use inn_server::config::{Args, ServerConfig};
use inn_server::db::jobs::fail_abandoned_jobs;
use inn_server::grading::{GeminiClient, Grader, KeyRing};
use inn_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting inn-server v{} [{}] built {} ({})",
        BUILD.version, BUILD.git_hash, BUILD.build_timestamp, BUILD.build_profile
    );

    let args = Args::parse();
    let config = ServerConfig::load(args).context("Invalid configuration")?;

    ensure_root_folder(&config.root_folder).context("Failed to create root folder")?;
    info!("Root folder: {}", config.root_folder.display());

    let db_path = database_path(&config.root_folder);
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let abandoned = fail_abandoned_jobs(&pool).await?;
    if abandoned > 0 {
        warn!("Marked {} interrupted evaluation job(s) as failed", abandoned);
    }

    let mut state = AppState::new(
        pool,
        &config.admin_password,
        config.root_folder.join("uploads"),
    )
    .with_frontend_url(config.frontend_url.clone());

    if config.api_keys.is_empty() {
        warn!("No generative API keys configured; AI evaluation is disabled");
    } else {
        let client = GeminiClient::new(&config.gemini_base_url, &config.gemini_model)
            .context("Failed to create generative API client")?;
        info!(
            "AI evaluation enabled: model {} with {} key(s)",
            config.gemini_model,
            config.api_keys.len()
        );
        state = state.with_grader(Grader::new(client, KeyRing::new(config.api_keys.clone())));
    }

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("inn-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
