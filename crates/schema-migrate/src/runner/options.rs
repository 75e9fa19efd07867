//! Runner behavior switches.

use crate::config::Config;
use crate::state::VersionTableMetaData;

/// How a [`MigrationRunner`](super::MigrationRunner) runs.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Generate SQL for the script sink instead of executing it.
    pub preview_only: bool,

    /// Capture execution errors and keep going.
    pub silently_fail: bool,

    /// Active tags for discovery.
    pub tags: Vec<String>,

    /// Wrap each migration in a transaction unless it opts out.
    pub transaction_per_migration: bool,

    /// Apply migrations flagged as breaking changes.
    pub allow_breaking_changes: bool,

    pub version_table: VersionTableMetaData,

    /// Copied into every [`RunReport`](super::RunReport).
    pub config_hash: Option<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            preview_only: false,
            silently_fail: false,
            tags: Vec::new(),
            transaction_per_migration: true,
            allow_breaking_changes: false,
            version_table: VersionTableMetaData::default(),
            config_hash: None,
        }
    }
}

impl RunnerOptions {
    pub fn from_config(config: &Config) -> Self {
        let runner = &config.runner;
        Self {
            preview_only: runner.preview_only,
            silently_fail: runner.silently_fail,
            tags: runner.tags.clone(),
            transaction_per_migration: runner.transaction_per_migration,
            allow_breaking_changes: runner.allow_breaking_changes,
            version_table: config.version_table.clone(),
            config_hash: Some(config.hash()),
        }
    }

    pub fn preview(mut self, preview_only: bool) -> Self {
        self.preview_only = preview_only;
        self
    }

    pub fn silently_fail(mut self, silently_fail: bool) -> Self {
        self.silently_fail = silently_fail;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
