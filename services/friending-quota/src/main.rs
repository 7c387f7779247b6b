use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use friending_quota::{
    create_router, ApiState, FriendingQuotaConfig, FriendingQuotaManager, QuotaDatabase,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = FriendingQuotaConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config)?;

    let host = config.server_host.clone();
    let port = config.server_port;

    info!(
        host = %host,
        port,
        data_dir = %config.data_dir.display(),
        default_max_allowed = config.default_max_allowed,
        unlimited_emails = config.unlimited_emails.len(),
        "starting friending-quota service"
    );

    let database = Arc::new(
        QuotaDatabase::new(config.data_dir.clone()).context("failed to open quota database")?,
    );
    let manager = Arc::new(FriendingQuotaManager::new(Arc::clone(&database), &config));

    let loaded = match manager.load_from_database() {
        Ok(val) => val,
        Err(err) => {
            warn!(error = %err, "failed to warm friending quota cache");
            0
        }
    };
    info!(loaded_quotas = loaded, "restored friending quotas from persistence");

    let state = Arc::new(ApiState::new(Arc::clone(&manager), config));
    let router = create_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("invalid server bind address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    info!(local_addr = %listener.local_addr()?, "friending-quota listening");

    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an unrecoverable error")?;

    info!("friending-quota service shutting down");
    Ok(())
}

fn init_tracing(config: &FriendingQuotaConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
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
}
