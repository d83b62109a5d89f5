//! # Infrastructure Adapters
//!
//! Implementations of the provider and activity-log interfaces.

pub mod brevo_client;
pub mod file_activity_log;

pub use brevo_client::{BrevoClient, BrevoClientConfig, BrevoClientError, DEFAULT_BASE_URL};
pub use file_activity_log::FileActivityLog;
