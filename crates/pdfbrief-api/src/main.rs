use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfbrief_api::{router, AppState};
use pdfbrief_core::AppConfig;
use pdfbrief_db::{Database, FilesystemArtifactStore};
use pdfbrief_gateway::SummarizerClient;
use pdfbrief_jobs::{Orchestrator, SummaryProcessor, SummaryWorker, UploadLimits, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "pdfbrief_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pdfbrief_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("pdfbrief-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            layer = layer.with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Database
    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;
    info!("Database ready");

    // Artifact store
    let store = FilesystemArtifactStore::new(&config.storage_dir);
    store
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("storage directory {:?} is not usable: {}", config.storage_dir, e))?;
    info!(storage_dir = %config.storage_dir.display(), "Artifact store ready");

    // Summarizer gateway
    let backend = SummarizerClient::from_config(&config);
    info!(summarize_url = %backend.endpoints().summarize, "Summarizer gateway configured");

    // Worker + orchestrator
    let processor = Arc::new(SummaryProcessor::new(
        Arc::new(db.documents.clone()),
        Arc::new(store),
        Arc::new(backend),
    ));
    let worker = SummaryWorker::new(processor.clone(), WorkerConfig::from_app_config(&config)).start();
    let orchestrator = Orchestrator::new(
        processor,
        worker.submitter(),
        UploadLimits::from_app_config(&config),
    );

    let app = router(AppState { orchestrator }, &config.allowed_origins);

    // Start server
    let addr: SocketAddr = config.listen_addr().parse()?;
    info!(
        max_upload_mb = config.max_upload_mb,
        max_upload_bytes = config.max_upload_bytes(),
        "Starting server on {}",
        addr
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining summary queue");
    if let Err(e) = worker.shutdown().await {
        warn!(error = %e, "Summary worker did not shut down cleanly");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
