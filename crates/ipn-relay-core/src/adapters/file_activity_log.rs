//! # File Activity Log
//!
//! Appends activity entries to a local text file, one line per entry:
//!
//! ```text
//! [2024-05-01 12:30:00] [INFO] IPN received
//! ```

use crate::activity_log::{ActivityLevel, ActivityLog};
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Activity log backed by an append-only file.
///
/// Writers sharing one instance are serialized by an in-process lock. Across
/// instances and processes there is no advisory lock: each entry is a single
/// `write_all` of one whole line on an `O_APPEND` handle, so concurrent
/// appends land as complete lines.
///
/// # Examples
///
/// ```rust
/// use ipn_relay_core::activity_log::ActivityLog;
/// use ipn_relay_core::adapters::FileActivityLog;
///
/// # tokio_test::block_on(async {
/// let dir = tempfile::tempdir().unwrap();
/// let log = FileActivityLog::new(dir.path().join("activity.log"));
///
/// log.error("Contact upsert failed").await;
///
/// let contents = std::fs::read_to_string(log.path()).unwrap();
/// assert!(contents.ends_with("[ERROR] Contact upsert failed\n"));
/// # });
/// ```
#[derive(Debug)]
pub struct FileActivityLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileActivityLog {
    /// Log to `path`. The file and its parent directory are created on the
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // One write per line; O_APPEND positions it at the end atomically.
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// Render one log line including the trailing newline.
pub fn format_entry(timestamp: &str, message: &str, level: ActivityLevel) -> String {
    format!("[{}] [{}] {}\n", timestamp, level, message)
}

#[async_trait]
impl ActivityLog for FileActivityLog {
    async fn log(&self, message: &str, level: ActivityLevel) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format_entry(&timestamp, message, level);

        if let Err(e) = self.append(&line).await {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to write activity log entry"
            );
        }
    }
}

#[cfg(test)]
#[path = "file_activity_log_tests.rs"]
mod tests;
