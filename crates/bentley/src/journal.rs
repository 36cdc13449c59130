//! JSONL journaling for services
//!
//! This module provides persistent, structured records with:
//! - JSONL disk storage, one record per line, append-only
//! - Thread-safe async operations with internal locking
//! - A generic [`Journal`] for arbitrary serde records
//! - [`ServiceLog`], a leveled log built on the journal with optional console echo

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[cfg(feature = "schemars")]
use schemars::JsonSchema;

// Types and Data Structures
// =========================

/// Errors raised while writing or reading a journal
#[derive(Debug, Error)]
pub enum JournalError {
  #[error("journal I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("journal record could not be encoded: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Request context information for logs
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct LogContext {
  /// Request ID for correlation
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,

  /// HTTP method
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,

  /// Request path
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,

  /// User agent
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_agent: Option<String>,

  /// Request duration in milliseconds
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,

  /// HTTP status code
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
}

/// A structured log entry
#[derive(Debug, Serialize, Deserialize, Clone)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: String,
  pub message: String,
  pub component: String,

  /// Optional request context
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<LogContext>,
}

// Journal
// =======

/// Thread-safe append-only JSONL file of `T` records
pub struct Journal<T> {
  path: Arc<Mutex<PathBuf>>,
  _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Journal<T> {
  fn clone(&self) -> Self {
    Self { path: self.path.clone(), _record: PhantomData }
  }
}

impl<T> Journal<T>
where
  T: Serialize + DeserializeOwned,
{
  /// Open (or create) a journal at the given path, creating parent directories
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, JournalError> {
    let path = path.as_ref().to_path_buf();

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    // Create file if it doesn't exist (but don't truncate if it does)
    if !path.exists() {
      std::fs::File::create(&path)?;
    }

    Ok(Self { path: Arc::new(Mutex::new(path)), _record: PhantomData })
  }

  /// Append one record as a JSON line
  pub async fn append(&self, record: &T) -> Result<(), JournalError> {
    let line = serde_json::to_string(record)?;
    let path = self.path.lock().await;

    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&*path)?;
    writeln!(file, "{line}")?;
    file.flush()?;

    Ok(())
  }

  /// Append a batch of records with a single write
  ///
  /// Every record is encoded before the file is touched. A failed write is
  /// truncated back to the previous length, so the batch lands whole or not at all.
  pub async fn append_all(&self, records: &[T]) -> Result<(), JournalError> {
    let mut buffer = String::new();
    for record in records {
      buffer.push_str(&serde_json::to_string(record)?);
      buffer.push('\n');
    }
    if buffer.is_empty() {
      return Ok(());
    }

    let path = self.path.lock().await;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&*path)?;
    let original_len = file.metadata()?.len();

    if let Err(e) = file.write_all(buffer.as_bytes()).and_then(|_| file.flush()) {
      let _ = file.set_len(original_len);
      return Err(e.into());
    }

    Ok(())
  }

  /// Read every record in file order, skipping malformed lines
  pub async fn read_all(&self) -> Result<Vec<T>, JournalError> {
    let path = self.path.lock().await;
    read_records(&path)
  }

  /// Get the path of the journal file
  pub async fn path(&self) -> PathBuf {
    self.path.lock().await.clone()
  }

  /// Check if the journal file exists and has content
  pub async fn has_records(&self) -> bool {
    let path = self.path.lock().await;
    std::fs::metadata(&*path).map(|m| m.len() > 0).unwrap_or(false)
  }

  /// Get the size of the journal file in bytes
  pub async fn file_size(&self) -> Result<u64, JournalError> {
    let path = self.path.lock().await;
    Ok(std::fs::metadata(&*path)?.len())
  }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, JournalError> {
  use std::io::{BufRead, BufReader};

  if !path.exists() {
    return Ok(Vec::new());
  }

  let reader = BufReader::new(std::fs::File::open(path)?);
  let mut records = Vec::new();

  for line in reader.lines() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }

    // Skip malformed lines
    if let Ok(record) = serde_json::from_str::<T>(&line) {
      records.push(record);
    }
  }

  Ok(records)
}

// Service Log
// ===========

/// Leveled service log persisted to a JSONL journal, echoed to the console unless silent
#[derive(Clone)]
pub struct ServiceLog {
  journal: Journal<LogEntry>,
  silent: bool,
}

impl ServiceLog {
  /// Create a service log that also echoes to the console
  pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, JournalError> {
    Self::new_with_silent(path, false)
  }

  /// Create a service log with the console echo optionally disabled
  pub fn new_with_silent<P: AsRef<Path>>(path: P, silent: bool) -> Result<Self, JournalError> {
    Ok(Self { journal: Journal::open(path)?, silent })
  }

  /// Add an entry, reporting storage failures
  pub async fn add_log(
    &self,
    level: &str,
    message: &str,
    component: &str,
    context: Option<LogContext>,
  ) -> Result<(), JournalError> {
    let entry = LogEntry {
      timestamp: Utc::now(),
      level: level.to_string(),
      message: message.to_string(),
      component: component.to_string(),
      context,
    };
    self.journal.append(&entry).await
  }

  /// Add an entry (fire-and-forget, ignores errors) and echo it
  pub async fn log(&self, level: &str, message: &str, component: &str, context: Option<LogContext>) {
    let _ = self.add_log(level, message, component, context).await;

    if self.silent {
      return;
    }

    match level {
      "warn" => crate::warn(message),
      "error" => crate::error(message),
      "success" => crate::success(message),
      "debug" => crate::debug(message),
      "verbose" => crate::verbose(message),
      _ => crate::info(message),
    }
  }

  pub async fn info(&self, message: &str, component: &str) {
    self.log("info", message, component, None).await;
  }

  pub async fn warn(&self, message: &str, component: &str) {
    self.log("warn", message, component, None).await;
  }

  pub async fn error(&self, message: &str, component: &str) {
    self.log("error", message, component, None).await;
  }

  pub async fn success(&self, message: &str, component: &str) {
    self.log("success", message, component, None).await;
  }

  pub async fn debug(&self, message: &str, component: &str) {
    self.log("debug", message, component, None).await;
  }

  /// Most recent `limit` entries matching `level_filter` ("all" or None matches everything),
  /// returned oldest first
  pub async fn get_logs(
    &self,
    limit: Option<usize>,
    level_filter: Option<&str>,
  ) -> Result<Vec<LogEntry>, JournalError> {
    let mut logs: Vec<LogEntry> = self
      .journal
      .read_all()
      .await?
      .into_iter()
      .filter(|entry| level_filter.is_none_or(|filter| filter == "all" || entry.level == filter))
      .collect();

    // Stable sort keeps file order for identical timestamps
    logs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    if let Some(limit) = limit {
      let skip = logs.len().saturating_sub(limit);
      logs.drain(..skip);
    }

    Ok(logs)
  }

  /// Get the path to the log file
  pub async fn log_file_path(&self) -> PathBuf {
    self.journal.path().await
  }
}

// Tests
// =====
