//! Run results and preview script sinks.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{MigrateError, Result};

/// Outcome of one runner operation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    /// `up` or `down`.
    pub operation: String,

    /// Final status.
    pub status: String,

    /// SQL was generated but not executed.
    pub preview: bool,

    /// Versions applied, in order.
    pub applied: Vec<i64>,

    /// Versions reverted, in order.
    pub reverted: Vec<i64>,

    /// Execution errors captured in silently-fail mode.
    pub errors: Vec<CapturedError>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Hash of the configuration the run was started from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

/// An execution error that did not abort the run.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedError {
    pub version: Option<i64>,
    pub message: String,
}

impl CapturedError {
    pub(crate) fn from_error(error: &MigrateError) -> Self {
        Self {
            version: error.version(),
            message: error.to_string(),
        }
    }
}

impl RunReport {
    pub(crate) fn start(operation: &str, preview: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            status: "running".to_string(),
            preview,
            applied: Vec::new(),
            reverted: Vec::new(),
            errors: Vec::new(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            config_hash: None,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.completed_at = Utc::now();
        self.duration_seconds =
            (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.status = if self.errors.is_empty() {
            "completed"
        } else {
            "completed_with_errors"
        }
        .to_string();

        info!(
            "Run {} {}: {} applied, {} reverted, {} captured error(s) in {:.1}s",
            self.operation,
            self.status,
            self.applied.len(),
            self.reverted.len(),
            self.errors.len(),
            self.duration_seconds
        );
        self
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-migration status for display.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub applied: bool,
    pub applied_on: Option<NaiveDateTime>,
    /// The highest applied version.
    pub current: bool,
    pub breaking_change: bool,
}

/// Receives the SQL of preview runs.
pub trait ScriptSink: Send + Sync {
    fn write(&self, sql: &str);
}

/// Logs each statement at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ScriptSink for TracingSink {
    fn write(&self, sql: &str) {
        info!("{}", sql);
    }
}

/// Keeps statements in memory; clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    statements: Arc<Mutex<Vec<String>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// All statements joined by newlines.
    pub fn script(&self) -> String {
        self.statements().join("\n")
    }
}

impl ScriptSink for CollectingSink {
    fn write(&self, sql: &str) {
        if let Ok(mut statements) = self.statements.lock() {
            statements.push(sql.to_string());
        }
    }
}
