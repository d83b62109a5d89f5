//! # Brevo Contact Client
//!
//! [`ContactUpsert`] implementation for the Brevo v3 REST API.

use crate::settings::SecretValue;
use crate::upsert::{ContactUpsert, UpsertOutcome, UpsertRequest};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default Brevo API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.brevo.com/v3/";

/// Configuration for [`BrevoClient`].
///
/// # Examples
///
/// ```
/// use ipn_relay_core::adapters::BrevoClientConfig;
/// use std::time::Duration;
///
/// let config = BrevoClientConfig::default()
///     .with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct BrevoClientConfig {
    /// API base URL; `contacts` is resolved against it.
    pub base_url: String,
    /// Total request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for BrevoClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("ipn-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BrevoClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

/// Errors raised while constructing a [`BrevoClient`].
#[derive(Debug, thiserror::Error)]
pub enum BrevoClientError {
    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Failed to create HTTP client: {message}")]
    HttpClient { message: String },
}

/// Brevo contacts API client.
#[derive(Debug, Clone)]
pub struct BrevoClient {
    http_client: reqwest::Client,
    contacts_url: Url,
}

impl BrevoClient {
    /// Create a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BrevoClientError`] if the base URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(config: BrevoClientConfig) -> Result<Self, BrevoClientError> {
        let contacts_url = contacts_url(&config.base_url)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| BrevoClientError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            contacts_url,
        })
    }

    /// Endpoint contacts are posted to.
    pub fn contacts_url(&self) -> &Url {
        &self.contacts_url
    }
}

fn contacts_url(base_url: &str) -> Result<Url, BrevoClientError> {
    let invalid = |message: String| BrevoClientError::InvalidBaseUrl {
        url: base_url.to_string(),
        message,
    };

    // Without a trailing slash `join` would replace the last path segment.
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };

    Url::parse(&normalized)
        .and_then(|base| base.join("contacts"))
        .map_err(|e| invalid(e.to_string()))
}

#[async_trait]
impl ContactUpsert for BrevoClient {
    async fn upsert(&self, request: &UpsertRequest, api_key: &SecretValue) -> UpsertOutcome {
        let body = match serde_json::to_vec(request) {
            Ok(body) => body,
            Err(e) => return UpsertOutcome::transport_failure(e.to_string()),
        };

        debug!(
            url = %self.contacts_url,
            list_count = request.list_ids.len(),
            "Posting contact upsert"
        );

        let response = match self
            .http_client
            .post(self.contacts_url.clone())
            .header("api-key", api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Contact upsert request failed");
                return UpsertOutcome::transport_failure(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_else(|e| {
            warn!(error = %e, status, "Failed to read provider response body");
            String::new()
        });

        debug!(status, "Provider responded");
        UpsertOutcome::from_response(status, body)
    }
}

#[cfg(test)]
#[path = "brevo_client_tests.rs"]
mod tests;
