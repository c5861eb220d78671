//! Register Service (regsrv)
//!
//! Modbus TCP operator console backend.

use std::net::SocketAddr;

use axum::serve;
use clap::Parser;
use tracing::info;
#[cfg(feature = "swagger-ui")]
use utoipa::OpenApi;
#[cfg(feature = "swagger-ui")]
use utoipa_swagger_ui::SwaggerUi;

use common::shutdown::wait_for_shutdown;
#[cfg(feature = "swagger-ui")]
use regsrv::api::routes::RegsrvApiDoc;
use regsrv::{
    api::create_routes,
    bootstrap::{self, Args},
    config::RegsrvConfig,
    RegSrvError, Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration first: it decides where logs go
    let config = RegsrvConfig::load(args.config.as_deref())?;
    let service_info = bootstrap::create_service_info();
    bootstrap::initialize_logging(&args, &service_info, &config)?;

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    info!(
        "Device defaults: {}:{} unit {}, connect timeout {} ms",
        config.device.default_host,
        config.device.default_port,
        config.device.unit_id,
        config.timeouts.connection_timeout_ms
    );

    let state = bootstrap::initialize_state(&config, args.ephemeral).await?;
    let app = create_routes(state);

    #[cfg(feature = "swagger-ui")]
    let app = {
        info!("Swagger UI feature ENABLED - initializing at /docs");
        app.merge(SwaggerUi::new("/docs").url("/openapi.json", RegsrvApiDoc::openapi()))
    };

    #[cfg(not(feature = "swagger-ui"))]
    info!("Swagger UI feature DISABLED");

    let bind_address = bootstrap::determine_bind_address(args.bind_address.clone(), &config);
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        RegSrvError::config(format!("Invalid bind address '{}': {}", bind_address, e))
    })?;

    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()
    } else {
        tokio::net::TcpSocket::new_v6()
    }
    .map_err(|e| RegSrvError::internal(format!("Failed to create socket: {}", e)))?;
    socket
        .set_reuseaddr(true)
        .map_err(|e| RegSrvError::internal(format!("Failed to set SO_REUSEADDR: {}", e)))?;
    socket
        .bind(addr)
        .map_err(|e| RegSrvError::internal(format!("Failed to bind to {}: {}", addr, e)))?;
    let listener = socket
        .listen(1024)
        .map_err(|e| RegSrvError::internal(format!("Failed to listen: {}", e)))?;

    info!("API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    serve(listener, app)
        .with_graceful_shutdown(async {
            wait_for_shutdown().await;
        })
        .await
        .map_err(|e| RegSrvError::internal(format!("Server error: {}", e)))?;

    info!("Register Service stopped");
    Ok(())
}
