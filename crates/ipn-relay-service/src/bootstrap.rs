//! Start-up helpers: tracing and collaborator wiring.

use ipn_relay_api::{LoggingConfig, ServiceConfig, ServiceError};
use ipn_relay_core::adapters::{BrevoClient, FileActivityLog};
use ipn_relay_core::{ActivityLog, IpnPipeline, SecretName, StaticSettings, TracingActivityLog};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!(
        "ipn_relay_service={level},ipn_relay_api={level},ipn_relay_core={level},ipn_activity={level},tower_http=info"
    )
}

/// Install the global tracing subscriber.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the notification pipeline from configuration.
///
/// Missing secrets are logged, not rejected: the pipeline refuses the
/// affected notifications instead.
///
/// # Errors
///
/// [`ServiceError::ProviderClient`] when the provider HTTP client cannot be
/// built.
pub fn build_pipeline(config: &ServiceConfig) -> Result<IpnPipeline, ServiceError> {
    for name in config.settings.missing_secrets() {
        match name {
            SecretName::SigningSecret => warn!(
                secret = %name,
                "Signing secret not configured; every notification will be rejected"
            ),
            SecretName::ProviderApiKey => warn!(
                secret = %name,
                "Provider API key not configured; payments cannot be relayed"
            ),
        }
    }

    let upsert = BrevoClient::new(config.provider.client_config())?;
    info!(url = %upsert.contacts_url(), "Contact provider client ready");

    let activity: Arc<dyn ActivityLog> = match &config.logging.activity_log_path {
        Some(path) => {
            info!(path = %path, "Writing activity log to file");
            Arc::new(FileActivityLog::new(path))
        }
        None => Arc::new(TracingActivityLog),
    };

    Ok(IpnPipeline::new(
        Arc::new(StaticSettings::new(config.settings.clone())),
        Arc::new(upsert),
        activity,
        config.webhook.signature,
    ))
}

/// Process exit code for a fatal service error.
pub fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
        ServiceError::ProviderClient(_) => 4,
    }
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
