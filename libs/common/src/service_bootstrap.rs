//! Unified service bootstrap utilities
//!
//! Startup banner and logging initialization shared by all services.

use crate::logging::{self, LogConfig};
use std::path::Path;
use tracing::{info, Level};

/// Service metadata for startup
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Service name (e.g., "regsrv")
    pub name: String,
    /// Service version from Cargo.toml
    pub version: String,
    /// Service description
    pub description: String,
    /// Default port
    pub default_port: u16,
}

impl ServiceInfo {
    /// Create new service info
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        default_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            default_port,
        }
    }
}

/// Print unified startup banner for any service
pub fn print_startup_banner(service: &ServiceInfo) {
    let banner = match service.name.as_str() {
        "regsrv" => {
            r#"
 ██████╗ ███████╗ ██████╗ ███████╗██████╗ ██╗   ██╗
 ██╔══██╗██╔════╝██╔════╝ ██╔════╝██╔══██╗██║   ██║
 ██████╔╝█████╗  ██║  ███╗███████╗██████╔╝██║   ██║
 ██╔══██╗██╔══╝  ██║   ██║╚════██║██╔══██╗╚██╗ ██╔╝
 ██║  ██║███████╗╚██████╔╝███████║██║  ██║ ╚████╔╝
 ╚═╝  ╚═╝╚══════╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝  ╚═══╝
            "#
        },
        _ => "",
    };

    if !banner.is_empty() {
        info!("{}", banner);
    }
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
}

/// Initialize logging for a service with standard configuration
///
/// Files land under `<log_root>/<service>/`.
pub fn init_logging(
    service: &ServiceInfo,
    log_root: &Path,
    console_level: Level,
    ansi: bool,
) -> anyhow::Result<()> {
    let log_config = LogConfig {
        service_name: service.name.clone(),
        log_dir: log_root.join(&service.name),
        console_level,
        enable_json: false,
        enable_api_log: true,
        ansi,
    };

    logging::init_with_config(log_config).map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Parse a level name, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    level.parse::<Level>().unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }
}
