//! Tests for the file activity log.

use super::*;
use std::sync::Arc;
use tempfile::TempDir;

fn is_entry(line: &str, level: &str, message: &str) -> bool {
    // "[YYYY-MM-DD HH:MM:SS] [LEVEL] message"
    line.len() > 22
        && line.starts_with('[')
        && line.as_bytes()[20] == b']'
        && line[22..] == format!("[{}] {}", level, message)
}

#[test]
fn test_format_entry() {
    let line = format_entry("2024-05-01 12:30:00", "IPN received", ActivityLevel::Info);

    assert_eq!(line, "[2024-05-01 12:30:00] [INFO] IPN received\n");
}

#[tokio::test]
async fn test_entries_are_appended_in_order() {
    let dir = TempDir::new().unwrap();
    let log = FileActivityLog::new(dir.path().join("ipn.log"));

    log.info("IPN received").await;
    log.error("Signature invalid").await;

    let content = tokio::fs::read_to_string(log.path()).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(is_entry(lines[0], "INFO", "IPN received"), "{}", lines[0]);
    assert!(is_entry(lines[1], "ERROR", "Signature invalid"), "{}", lines[1]);
}

#[tokio::test]
async fn test_existing_content_is_preserved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ipn.log");
    tokio::fs::write(&path, "previous line\n").await.unwrap();

    FileActivityLog::new(&path).info("next").await;

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(content.starts_with("previous line\n"));
    assert!(content.ends_with("[INFO] next\n"));
}

#[tokio::test]
async fn test_parent_directories_are_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("nested").join("ipn.log");

    FileActivityLog::new(&path).info("created").await;

    assert!(path.exists());
}

#[tokio::test]
async fn test_write_failure_is_swallowed() {
    let dir = TempDir::new().unwrap();
    // A directory cannot be opened for appending.
    let log = FileActivityLog::new(dir.path());

    log.error("dropped").await;

    assert!(dir.path().is_dir());
}

#[tokio::test]
async fn test_concurrent_writers_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(FileActivityLog::new(dir.path().join("ipn.log")));

    let mut handles = Vec::new();
    for i in 0..20 {
        let log = Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            log.info(&format!("entry {}", i)).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let content = tokio::fs::read_to_string(log.path()).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 20);
    assert!(lines.iter().all(|line| line.contains("[INFO] entry ")));
}

#[tokio::test]
async fn test_separate_instances_sharing_a_file_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.log");

    let mut handles = Vec::new();
    for i in 0..20 {
        let log = FileActivityLog::new(path.clone());
        handles.push(tokio::spawn(async move {
            log.error(&format!("writer {} {}", i, "x".repeat(200))).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), 20);
    for line in lines {
        assert!(line.contains("[ERROR] writer "), "torn line: {}", line);
        assert!(line.ends_with(&"x".repeat(200)), "torn line: {}", line);
    }
}
