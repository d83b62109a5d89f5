//! # IPN Relay Service
//!
//! Binary entry point for the IPN relay HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Wires the notification pipeline and its collaborators
//! - Starts the HTTP server from ipn-relay-api

mod bootstrap;

use ipn_relay_api::{start_server, LoggingConfig, ServiceConfig, ServiceError, CONFIG_FILE_ENV};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::var(CONFIG_FILE_ENV).ok();

    let config = match ServiceConfig::load(explicit_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            bootstrap::init_tracing(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(bootstrap::exit_code(&ServiceError::Configuration(e)));
        }
    };

    bootstrap::init_tracing(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting IPN relay service");
    if let Some(path) = explicit_path.as_deref().filter(|p| !p.is_empty()) {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    let pipeline = match bootstrap::build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Failed to build notification pipeline; aborting");
            std::process::exit(bootstrap::exit_code(&e));
        }
    };

    info!(
        host = %config.server.host,
        port = config.server.port,
        endpoint = %config.webhook.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(config, Arc::new(pipeline)).await {
        error!(error = %e, "Server terminated with an error");
        std::process::exit(bootstrap::exit_code(&e));
    }
}
