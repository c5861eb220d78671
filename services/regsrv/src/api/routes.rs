//! API Route Configuration
//!
//! Central route definition for all Register Service endpoints

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, patch},
    Router,
};
use common::service_bootstrap::ServiceInfo;

#[cfg(feature = "swagger-ui")]
use utoipa::OpenApi;

use crate::api::handlers::health::health_check;
use crate::api::handlers::log_handlers::{enrich_log, list_logs};
use crate::api::handlers::transaction_handlers::execute_transaction;
use crate::config::DeviceConfig;
use crate::core::{OutcomeRecorder, TransactionExecutor};
use crate::storage::LogStore;

/// Application state shared by all handlers
pub struct AppState {
    /// Runs register transactions
    pub executor: Arc<TransactionExecutor>,
    /// Same store as the executor's recorder; used for enrichment
    pub recorder: OutcomeRecorder,
    pub store: Arc<dyn LogStore>,
    /// Target fallbacks for requests without host/port/unitId
    pub device_defaults: DeviceConfig,
    pub service_info: ServiceInfo,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        executor: Arc<TransactionExecutor>,
        recorder: OutcomeRecorder,
        store: Arc<dyn LogStore>,
        device_defaults: DeviceConfig,
        service_info: ServiceInfo,
    ) -> Self {
        Self {
            executor,
            recorder,
            store,
            device_defaults,
            service_info,
            started_at: Instant::now(),
        }
    }
}

// OpenAPI documentation - only compiled when swagger-ui feature is enabled
#[cfg(feature = "swagger-ui")]
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::transaction_handlers::execute_transaction,
        crate::api::handlers::log_handlers::list_logs,
        crate::api::handlers::log_handlers::enrich_log,
        crate::api::handlers::health::health_check
    ),
    components(
        schemas(
            crate::api::dto::TransactionRequestDto,
            crate::api::dto::TransactionResponse,
            crate::api::dto::EnrichRequest,
            crate::core::derive::DerivedKind,
            crate::core::TransactionMetrics,
            crate::storage::LogEntry,
            common::HealthStatus,
            common::ServiceStatus
        )
    ),
    tags(
        (name = "regsrv", description = "Register Service API")
    )
)]
pub struct RegsrvApiDoc;

/// Create all API routes for the Register Service
pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Transactions and their log
        .route("/api/modbus", get(list_logs).post(execute_transaction))
        .route("/api/modbus/{id}", patch(enrich_log))
        // Apply HTTP request logging middleware
        .layer(axum::middleware::from_fn(common::logging::http_request_logger))
        .with_state(state)
}
