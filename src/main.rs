use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campus_dialogue_hub::auth::cleanup::{run_cleanup_worker, CleanupConfig};
use campus_dialogue_hub::auth::sender_from_config;
use campus_dialogue_hub::config::{Config, StorageBackend};
use campus_dialogue_hub::db::Database;
use campus_dialogue_hub::forum::AlertMonitor;
use campus_dialogue_hub::web::{self, AppState};
use campus_dialogue_hub::storage;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting campus-dialogue-hub");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        public_url = %config.public_url,
        storage = ?config.storage_backend,
        "Configuration loaded"
    );
    if config.mail_webhook_url.is_none() {
        warn!("MAIL_WEBHOOK_URL not set - sign-in links will only be logged");
    }
    if config.admin_emails.is_empty() {
        warn!("ADMIN_EMAILS not set - nobody can manage courses and subjects");
    }

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    let store = storage::from_config(&config)
        .await
        .context("Failed to initialize attachment storage")?;
    if config.storage_backend == StorageBackend::S3 {
        info!(bucket = ?config.s3_bucket, "Using S3 attachment storage");
    }

    let mailer = sender_from_config(&config).context("Failed to initialize mail delivery")?;

    let (monitor, alerts) = AlertMonitor::new(
        db.pool().clone(),
        config.alert_poll_interval,
        config.stale_post_after,
    )?;

    let shutdown = CancellationToken::new();

    let monitor_handle = tokio::spawn(monitor.run(shutdown.clone()));

    let cleanup_handle = tokio::spawn(run_cleanup_worker(
        db.pool().clone(),
        CleanupConfig::default(),
        shutdown.clone(),
    ));

    let state = AppState {
        db,
        config: Arc::new(config),
        store,
        mailer,
        alerts,
    };
    let web_shutdown = shutdown.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(state, web_shutdown.clone()).await {
            error!("Web server error: {e:#}");
            web_shutdown.cancel();
        }
    });

    tokio::select! {
        () = shutdown_signal() => {}
        () = shutdown.cancelled() => {}
    }

    info!("Shutting down...");
    shutdown.cancel();

    for (name, handle) in [
        ("web server", web_handle),
        ("alert monitor", monitor_handle),
        ("cleanup worker", cleanup_handle),
    ] {
        if let Err(e) = handle.await {
            error!("{name} task failed: {e}");
        }
    }

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,campus_dialogue_hub=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
