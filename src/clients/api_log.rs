//! Append-only record of outbound API traffic.
//!
//! Every attempt the HTTP client makes is written here, request first and
//! then the response or error, independent of whether the call succeeds.
//! Entries are redacted before they are handed to a sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;
use url::Url;

use crate::logging::{redact_url, redact_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiLogKind {
    Request,
    Response,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiLogEntry {
    #[serde(rename = "type")]
    pub kind: ApiLogKind,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub attempt: u32,
    pub payload: Value,
}

impl ApiLogEntry {
    #[must_use]
    pub fn new(kind: ApiLogKind, url: &Url, attempt: u32, payload: &Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            url: redact_url(url),
            attempt,
            payload: redact_value(payload),
        }
    }

    /// `[timestamp]`, pretty JSON, then an 80-column rule.
    #[must_use]
    pub fn render(&self) -> String {
        let body = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
        format!(
            "[{}]\n{}\n{}\n\n",
            self.timestamp.to_rfc3339(),
            body,
            "=".repeat(80)
        )
    }
}

pub trait ApiLogSink: Send + Sync {
    fn append(&self, entry: &ApiLogEntry);
}

/// Writes requests to `<prefix>-requests.log` and responses/errors to
/// `<prefix>-responses.log` inside `dir`.
pub struct FileApiLog {
    request_file: PathBuf,
    response_file: PathBuf,
    lock: Mutex<()>,
}

impl FileApiLog {
    pub fn new(dir: impl AsRef<Path>, prefix: &str) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        Ok(Self {
            request_file: dir.join(format!("{prefix}-requests.log")),
            response_file: dir.join(format!("{prefix}-responses.log")),
            lock: Mutex::new(()),
        })
    }

    fn write_line(&self, path: &Path, text: &str) -> std::io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())
    }
}

impl ApiLogSink for FileApiLog {
    fn append(&self, entry: &ApiLogEntry) {
        let path = match entry.kind {
            ApiLogKind::Request => &self.request_file,
            ApiLogKind::Response | ApiLogKind::Error => &self.response_file,
        };

        if let Err(e) = self.write_line(path, &entry.render()) {
            warn!(path = %path.display(), error = %e, "Failed to append API log entry");
        }
    }
}

/// Keeps rendered entries in memory.
#[derive(Default)]
pub struct MemoryApiLog {
    entries: Mutex<Vec<ApiLogEntry>>,
}

impl MemoryApiLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<ApiLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn contents(&self) -> String {
        self.entries().iter().map(ApiLogEntry::render).collect()
    }
}

impl ApiLogSink for MemoryApiLog {
    fn append(&self, entry: &ApiLogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(entry.clone());
    }
}

/// Discards everything. Used when API logging is switched off.
pub struct NullApiLog;

impl ApiLogSink for NullApiLog {
    fn append(&self, _entry: &ApiLogEntry) {}
}

/// File sink under `dir` when enabled, otherwise (or when the directory
/// cannot be created) a sink that drops everything.
pub fn open_api_log(enabled: bool, dir: &str, prefix: &str) -> Arc<dyn ApiLogSink> {
    if !enabled {
        return Arc::new(NullApiLog);
    }

    match FileApiLog::new(dir, prefix) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            warn!(
                dir = %dir,
                error = %e,
                "Failed to open API log directory, API traffic will not be recorded"
            );
            Arc::new(NullApiLog)
        }
    }
}
