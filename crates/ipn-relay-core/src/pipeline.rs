//! # IPN Pipeline
//!
//! Runs one notification through verification, contact extraction, list
//! resolution and the provider upsert. Each step is a terminal state on
//! failure; nothing is retried.
//!
//! ```text
//! received -> verify signature -> check email -> event == on_payment?
//!                                                  no  -> acknowledged
//!                                                  yes -> resolve lists -> upsert
//! ```

use crate::activity_log::{ActivityLevel, ActivityLog};
use crate::contact::{self, ContactRecord, ORDER_ID_FIELD, PRODUCT_ID_FIELD};
use crate::lists::{resolve_lists, ListId};
use crate::message::InboundMessage;
use crate::settings::{SecretName, SettingsProvider};
use crate::signing::{SignatureOptions, SignatureVerifier};
use crate::upsert::{dispatch, ContactUpsert, DispatchError};
use crate::IpnError;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::field::Empty;
use tracing::{error, info, instrument, warn};

/// Field carrying the notification type.
pub const EVENT_FIELD: &str = "event";

/// The only event type that leads to a contact upsert.
pub const PAYMENT_EVENT: &str = "on_payment";

/// Successful terminal state of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Contact was upserted into these lists.
    Dispatched { list_ids: BTreeSet<ListId> },

    /// Valid notification for an event that needs no action.
    Acknowledged { event: Option<String> },
}

/// Verify-transform-dispatch pipeline.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct IpnPipeline {
    settings: Arc<dyn SettingsProvider>,
    upsert: Arc<dyn ContactUpsert>,
    activity: Arc<dyn ActivityLog>,
    verifier: SignatureVerifier,
}

impl IpnPipeline {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        upsert: Arc<dyn ContactUpsert>,
        activity: Arc<dyn ActivityLog>,
        options: SignatureOptions,
    ) -> Self {
        Self {
            settings,
            upsert,
            activity,
            verifier: SignatureVerifier::new(options),
        }
    }

    /// Process one notification.
    ///
    /// # Errors
    ///
    /// - [`IpnError::SignatureInvalid`] when the signature is missing or wrong,
    ///   or no signing secret is configured
    /// - [`IpnError::MissingEmail`] when no email address can be selected
    /// - [`IpnError::ConfigurationMissing`] when no provider API key is set
    /// - [`IpnError::DispatchTransport`] / [`IpnError::DispatchHttp`] when the
    ///   provider call fails
    #[instrument(skip_all, fields(order_id = Empty, product_id = Empty))]
    pub async fn process(&self, message: &InboundMessage) -> Result<PipelineOutcome, IpnError> {
        let event = message.non_empty_text(EVENT_FIELD);
        let order_id = message.text(ORDER_ID_FIELD).unwrap_or("");
        let product_id = message.text(PRODUCT_ID_FIELD).unwrap_or("");
        tracing::Span::current()
            .record("order_id", order_id)
            .record("product_id", product_id);

        info!(
            event = event.unwrap_or(""),
            fields = ?message.field_names(),
            "IPN received"
        );
        self.record(
            ActivityLevel::Info,
            format!(
                "IPN received: event={}, order_id={}, product_id={}",
                event.unwrap_or(""),
                order_id,
                product_id
            ),
        )
        .await;

        self.verify(message).await?;

        let contact = match contact::extract(message) {
            Ok(contact) => contact,
            Err(e) => {
                warn!(error = %e, "IPN has no usable email address");
                self.record(ActivityLevel::Error, format!("Rejected: {}", e))
                    .await;
                return Err(IpnError::MissingEmail);
            }
        };

        if event != Some(PAYMENT_EVENT) {
            info!(event = event.unwrap_or(""), "Event needs no contact update");
            self.record(
                ActivityLevel::Info,
                format!("Event '{}' acknowledged without update", event.unwrap_or("")),
            )
            .await;
            return Ok(PipelineOutcome::Acknowledged {
                event: event.map(str::to_string),
            });
        }

        self.dispatch(&contact).await
    }

    async fn verify(&self, message: &InboundMessage) -> Result<(), IpnError> {
        let secret = self.settings.secret(SecretName::SigningSecret);
        let secret = secret.as_ref().map(|s| s.expose_secret()).unwrap_or("");

        match self.verifier.check(message, secret) {
            Ok(()) => {
                info!("Signature verified");
                self.record(ActivityLevel::Info, "Signature verified".to_string())
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Signature verification failed");
                self.record(
                    ActivityLevel::Error,
                    format!("Signature verification failed: {}", e),
                )
                .await;
                Err(IpnError::SignatureInvalid(e))
            }
        }
    }

    async fn dispatch(&self, contact: &ContactRecord) -> Result<PipelineOutcome, IpnError> {
        let Some(api_key) = self.settings.secret(SecretName::ProviderApiKey) else {
            error!("Provider API key is not configured");
            self.record(
                ActivityLevel::Error,
                "Contact not sent: provider API key is not configured".to_string(),
            )
            .await;
            return Err(IpnError::ConfigurationMissing {
                key: SecretName::ProviderApiKey,
            });
        };

        let mut mapping = self.settings.list_mapping();
        mapping.add_to_newsletter = self.settings.is_newsletter_enabled();
        let list_ids = resolve_lists(contact.product_id.as_deref(), &mapping);

        let outcome = dispatch(
            self.upsert.as_ref(),
            contact,
            list_ids.clone(),
            &self.settings.attribute_names(),
            &api_key,
        )
        .await;
        let status = outcome.http_status;
        let lists = list_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        match outcome.into_result() {
            Ok(_) => {
                info!(status, lists = %lists, "Contact upserted");
                self.record(
                    ActivityLevel::Info,
                    format!(
                        "Contact {} upserted (HTTP {}, lists [{}])",
                        contact.email, status, lists
                    ),
                )
                .await;
                Ok(PipelineOutcome::Dispatched { list_ids })
            }
            Err(e) => {
                error!(error = %e, status, "Contact upsert failed");
                self.record(
                    ActivityLevel::Error,
                    format!("Contact upsert for {} failed: {}", contact.email, e),
                )
                .await;
                Err(match e {
                    DispatchError::Transport { message } => IpnError::DispatchTransport { message },
                    DispatchError::Http { status, body } => IpnError::DispatchHttp { status, body },
                })
            }
        }
    }

    async fn record(&self, level: ActivityLevel, message: String) {
        self.activity.log(&message, level).await;
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
