//! Receivables Ledger - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! RECEIVABLES_DATABASE_URL=postgres://... cargo run --bin receivables-api
//! ```
//!
//! # Environment Variables
//!
//! * `RECEIVABLES_HOST` - Server host (default: 0.0.0.0)
//! * `RECEIVABLES_PORT` - Server port (default: 8080)
//! * `RECEIVABLES_DATABASE_URL` - PostgreSQL connection string
//! * `RECEIVABLES_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `RECEIVABLES_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `RECEIVABLES_LEDGER__BUSINESS_TIMEZONE` - Timezone date filters are read in
//! * `RECEIVABLES_LEDGER__MAX_APPEND_ATTEMPTS` - Append retries on conflict
//! * `RECEIVABLES_LEDGER__BACKFILL_LABEL` - Suffix of backfilled descriptions

use std::net::SocketAddr;
use std::sync::Arc;

use domain_receivables::{LedgerPorts, ReceivablesService, ReconciledEventSource};
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, PostgresBusinessRecords, PostgresLedgerStore,
};
use interface_api::{config::ApiConfig, create_router};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Local development convenience
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting receivables ledger API server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone()).max_connections(config.max_connections),
    )
    .await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let records = Arc::new(PostgresBusinessRecords::new(pool.clone()));
    let returns: Arc<dyn ReconciledEventSource> = records.clone();
    let ports = LedgerPorts {
        store: Arc::new(PostgresLedgerStore::new(pool)),
        customers: records.clone(),
        reconciled_sources: vec![returns],
        pending_credits: records.clone(),
        sales: records,
    };
    let service = ReceivablesService::new(ports, config.ledger.clone());

    let app = create_router(service, config.clone());
    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
