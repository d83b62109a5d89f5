//! Error types for the HTTP service

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ipn_relay_core::adapters::BrevoClientError;
use ipn_relay_core::IpnError;
use tracing::{error, warn};

/// IPN handler errors with HTTP status code mapping
///
/// - `403 Forbidden`: signature missing or wrong
/// - `400 Bad Request`: no usable email address
/// - `502 Bad Gateway`: the provider call failed or could not be made
///
/// Responses carry the status code only. The sender does not read error
/// bodies and details stay in the server logs.
#[derive(Debug, thiserror::Error)]
pub enum IpnHandlerError {
    #[error("IPN rejected: {0}")]
    Rejected(#[from] IpnError),
}

impl IpnHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for IpnHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = %status, error = %self, "IPN processing failed");
        } else {
            warn!(status = %status, error = %self, "IPN rejected");
        }

        status.into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Provider client error: {0}")]
    ProviderClient(#[from] BrevoClientError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
