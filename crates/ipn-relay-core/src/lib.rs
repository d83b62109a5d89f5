//! # IPN Relay Core
//!
//! Core logic for relaying payment notifications (IPN) to an email-marketing
//! provider.
//!
//! A notification is a flat set of form fields signed by the payment
//! processor. The core verifies the signature, extracts the buyer's contact
//! details, works out which mailing lists the buyer belongs on and upserts
//! the contact at the provider.
//!
//! ## Architecture
//!
//! - Business logic depends only on trait abstractions ([`SettingsProvider`],
//!   [`ContactUpsert`], [`ActivityLog`])
//! - Infrastructure implementations live in [`adapters`] and are injected at
//!   start-up
//!
//! ## Usage
//!
//! ```rust
//! use ipn_relay_core::message::InboundMessage;
//! use ipn_relay_core::signing::{sign, verify, SignatureOptions};
//!
//! let mut message = InboundMessage::from_pairs([("event", "on_payment"), ("order_id", "A1")]);
//! let signature = sign(&message, "passphrase", SignatureOptions::default());
//! message.insert("sha_sign", signature.as_str());
//!
//! assert!(verify(&message, "passphrase"));
//! ```

pub mod activity_log;
pub mod adapters;
pub mod contact;
pub mod lists;
pub mod message;
pub mod pipeline;
pub mod settings;
pub mod signing;
pub mod upsert;

pub use activity_log::{ActivityLevel, ActivityLog, TracingActivityLog};
pub use contact::{ContactRecord, ExtractionError};
pub use lists::{resolve_lists, ListId, ListMapping};
pub use message::{FieldValue, InboundMessage};
pub use pipeline::{IpnPipeline, PipelineOutcome};
pub use settings::{
    AttributeNames, IpnSettings, SecretName, SecretValue, SettingsProvider, StaticSettings,
};
pub use signing::{sign, verify, Signature, SignatureError, SignatureOptions, SignatureVerifier};
pub use upsert::{ContactUpsert, DispatchError, UpsertOutcome, UpsertRequest};

/// Standard result type for IPN processing
pub type IpnResult<T> = Result<T, IpnError>;

// ============================================================================
// Error Types
// ============================================================================

/// Validation error for configuration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' is out of range: {message}")]
    OutOfRange { field: String, message: String },
}

/// Terminal failure of one notification.
///
/// Every variant maps to exactly one HTTP status, see [`IpnError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum IpnError {
    #[error("Signature invalid: {0}")]
    SignatureInvalid(SignatureError),

    #[error("No email address in notification")]
    MissingEmail,

    #[error("Provider unreachable: {message}")]
    DispatchTransport { message: String },

    #[error("Provider returned HTTP {status}: {body}")]
    DispatchHttp { status: u16, body: String },

    #[error("Configuration missing: {key}")]
    ConfigurationMissing { key: SecretName },
}

impl IpnError {
    /// HTTP status returned to the notification sender.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SignatureInvalid(_) => 403,
            Self::MissingEmail => 400,
            Self::DispatchTransport { .. }
            | Self::DispatchHttp { .. }
            | Self::ConfigurationMissing { .. } => 502,
        }
    }

    /// Short label used for metrics and logs.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::SignatureInvalid(_) => "rejected_signature",
            Self::MissingEmail => "rejected_no_email",
            Self::DispatchTransport { .. } | Self::DispatchHttp { .. } => "dispatch_failed",
            Self::ConfigurationMissing { .. } => "configuration_missing",
        }
    }

    /// Whether the provider call itself failed.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            Self::DispatchTransport { .. } | Self::DispatchHttp { .. }
        )
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
