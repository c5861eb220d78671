//! Shared building blocks for the register console services
//!
//! Provides functions shared by all services, including:
//! - logging initialization and HTTP access logging
//! - SQLite connection handling
//! - standard API response envelopes
//! - service bootstrap and graceful shutdown

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod api_types;
pub mod hex;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

// Re-export commonly used API types
pub use api_types::{HealthStatus, ServiceStatus, SuccessResponse};
pub use errors::ErrorBody;

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use serde_json;
pub use tokio;

// Pre-import common types
pub mod prelude {
    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::SqliteClient;
    pub use crate::{HealthStatus, ServiceStatus, SuccessResponse};
}
