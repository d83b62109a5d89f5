//! # Activity Log
//!
//! Operator-facing record of what happened to each notification. Separate
//! from diagnostic tracing: entries are short human-readable lines, and a
//! logging failure must never fail the request.

use async_trait::async_trait;
use std::fmt;

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityLevel {
    Info,
    Error,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for activity entries.
///
/// Implementations swallow their own failures.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn log(&self, message: &str, level: ActivityLevel);

    async fn info(&self, message: &str) {
        self.log(message, ActivityLevel::Info).await;
    }

    async fn error(&self, message: &str) {
        self.log(message, ActivityLevel::Error).await;
    }
}

/// Activity log that forwards entries to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn log(&self, message: &str, level: ActivityLevel) {
        match level {
            ActivityLevel::Info => tracing::info!(target: "ipn_activity", "{}", message),
            ActivityLevel::Error => tracing::error!(target: "ipn_activity", "{}", message),
        }
    }
}
