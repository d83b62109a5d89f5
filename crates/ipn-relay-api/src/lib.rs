//! # IPN Relay HTTP Service
//!
//! HTTP server receiving payment notifications (IPN) and relaying the buyer
//! to the email-marketing provider.
//!
//! This service provides:
//! - The IPN endpoint (`POST /ipn` by default)
//! - A health check endpoint
//! - Prometheus metrics

pub mod config;
pub mod errors;
pub mod metrics;
pub mod request;

pub use crate::config::{
    ConfigError, LoggingConfig, ProviderConfig, ServerConfig, ServiceConfig, WebhookConfig,
    CONFIG_FILE_ENV, ENV_PREFIX,
};
pub use errors::{IpnHandlerError, ServiceError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{DefaultBodyLimit, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use ipn_relay_core::IpnPipeline;
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<ServiceConfig>,

    /// Notification pipeline
    pub pipeline: Arc<IpnPipeline>,

    /// Prometheus metrics
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(config: ServiceConfig, pipeline: Arc<IpnPipeline>, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let ipn_routes = Router::new().route(&state.config.webhook.endpoint_path, post(handle_ipn));

    let observability_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint));

    let mut router = Router::new()
        .merge(ipn_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
                .into_inner(),
        );

    if state.config.server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

/// Start HTTP server
///
/// Serves until SIGINT or SIGTERM, then lets in-flight requests finish.
pub async fn start_server(config: ServiceConfig, pipeline: Arc<IpnPipeline>) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, pipeline, metrics);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C signal handler");
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
                    error!(error = %e, "Failed to install SIGTERM signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown");
            },
        }
    };

    // In-flight requests complete before the server returns.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// IPN Handler
// ============================================================================

/// Handle a payment notification
///
/// Answers `200 OK` with body `OK` once the notification is verified and
/// either relayed or found to need no action. Failures carry the status
/// code only, see [`IpnHandlerError`].
#[instrument(skip_all)]
pub async fn handle_ipn(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, IpnHandlerError> {
    let start = Instant::now();

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let message = request::decode_message(content_type, query.as_deref(), &body).await;

    let result = state.pipeline.process(&message).await;
    state.metrics.record_outcome(&result, start.elapsed());

    result.map(|_| "OK").map_err(IpnHandlerError::from)
}

// ============================================================================
// Health and Metrics
// ============================================================================

/// Basic health check endpoint
#[instrument(skip_all)]
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation IDs
///
/// Takes `x-correlation-id` from the request or generates one, and echoes it
/// on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri().path(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

// ============================================================================
// Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
