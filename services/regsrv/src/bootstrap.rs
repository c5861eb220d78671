//! Service Bootstrap and Initialization
//!
//! Command line, logging, log store selection and wiring of the executor
//! into shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use common::service_bootstrap::{self, ServiceInfo};
use tracing::info;

use crate::api::routes::AppState;
use crate::config::{RegsrvConfig, DEFAULT_PORT, SERVICE_NAME};
use crate::core::{OutcomeRecorder, TransactionExecutor};
use crate::error::{RegSrvError, Result};
use crate::storage::{LogStore, MemoryLogStore, SqliteLogStore};
use crate::transport::{DeviceConnector, TcpConnector};

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "regsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Register Service - Modbus TCP operator console"
)]
pub struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bind address, overrides api.host/api.port
    #[arg(short = 'b', long)]
    pub bind_address: Option<String>,

    /// Console log level
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,

    /// Disable colored output and the startup banner
    #[arg(long)]
    pub no_color: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Keep the transaction log in memory instead of SQLite
    #[arg(long)]
    pub ephemeral: bool,
}

pub fn create_service_info() -> ServiceInfo {
    ServiceInfo::new(
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        "Register Service - Modbus TCP Operator Console",
        DEFAULT_PORT,
    )
}

/// Initialize logging and print the banner
pub fn initialize_logging(
    args: &Args,
    service_info: &ServiceInfo,
    config: &RegsrvConfig,
) -> Result<()> {
    let level = service_bootstrap::parse_level(&args.log_level);
    service_bootstrap::init_logging(service_info, &config.logging.dir, level, !args.no_color)
        .map_err(|e| RegSrvError::config(format!("Failed to initialize logging: {}", e)))?;

    if !args.no_color {
        service_bootstrap::print_startup_banner(service_info);
    }
    Ok(())
}

/// CLI bind address wins over configuration
pub fn determine_bind_address(cli: Option<String>, config: &RegsrvConfig) -> String {
    cli.unwrap_or_else(|| config.bind_address())
}

/// Open the configured log store
pub async fn open_store(config: &RegsrvConfig, ephemeral: bool) -> Result<Arc<dyn LogStore>> {
    if ephemeral {
        info!("Transaction log kept in memory (--ephemeral)");
        return Ok(Arc::new(MemoryLogStore::new()));
    }

    info!("SQLite: {}", config.database.path.display());
    let store = SqliteLogStore::open(&config.database.path).await?;
    Ok(Arc::new(store))
}

/// Wire executor, recorder and store into handler state
pub fn build_state(
    config: &RegsrvConfig,
    store: Arc<dyn LogStore>,
    connector: Arc<dyn DeviceConnector>,
    service_info: ServiceInfo,
) -> Arc<AppState> {
    let recorder = OutcomeRecorder::new(store.clone());
    let executor = TransactionExecutor::new(connector, recorder.clone(), config.executor_config());
    Arc::new(AppState::new(
        Arc::new(executor),
        recorder,
        store,
        config.device.clone(),
        service_info,
    ))
}

/// Production state: real TCP connector with the configured exchange timeout
pub async fn initialize_state(config: &RegsrvConfig, ephemeral: bool) -> Result<Arc<AppState>> {
    let store = open_store(config, ephemeral).await?;
    let connector = Arc::new(TcpConnector::new(config.exchange_timeout()));
    Ok(build_state(config, store, connector, create_service_info()))
}
