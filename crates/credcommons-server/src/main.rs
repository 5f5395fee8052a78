//! Credit Commons server entry point.
//!
//! Loads configuration, opens the storage backend, seeds the borrower
//! directory, registers the file audit sink, then serves the Axum
//! application until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use credcommons_core::audit::AuditTrail;
use credcommons_core::audit_file::FileAuditSink;
use credcommons_server::app::build_router;
use credcommons_server::config::{ServerConfig, StorageBackendType};
use credcommons_server::seed::seed_borrowers;
use credcommons_server::state::AppState;
use credcommons_storage::{CommonsStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        storage = ?config.storage_backend,
        issuer = %config.issuer,
        bearer_gate = config.expected_bearer.is_some(),
        "Credit Commons starting"
    );

    let store = open_store(&config.storage_backend)?;
    seed_borrowers(store.as_ref(), config.borrower_seed_file.as_deref()).await?;

    let audit = Arc::new(AuditTrail::new());
    if let Some(ref path) = config.audit_log_path {
        audit.add_sink(Arc::new(FileAuditSink::new(path))).await;
        info!(path = %path.display(), "file audit sink registered");
    }

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::from_config(config, store, audit));
    info!(
        public_key = %state.disclosure.signer().public_key_base64(),
        "presentation signing key loaded"
    );
    let app = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;

    info!(addr = %bind_addr, "Credit Commons listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Credit Commons stopped");
    Ok(())
}

fn open_store(backend: &StorageBackendType) -> anyhow::Result<Arc<dyn CommonsStore>> {
    match backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "rocksdb-backend")]
        StorageBackendType::RocksDb { path } => {
            info!(path = %path, "using RocksDB storage");
            Ok(Arc::new(
                credcommons_storage::RocksDbStore::open(path)
                    .context("failed to open RocksDB storage")?,
            ))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackendType::RocksDb { .. } => {
            anyhow::bail!("RocksDB backend requested but feature 'rocksdb-backend' is not enabled");
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
