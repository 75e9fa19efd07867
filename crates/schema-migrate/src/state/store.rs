//! Cached view of the VersionInfo table.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use super::VersionTableMetaData;
use crate::error::{MigrateError, Result};
use crate::processor::Processor;

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedVersion {
    pub version: i64,
    pub applied_on: Option<NaiveDateTime>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
enum Change {
    CreatedTable,
    Added(AppliedVersion),
    Removed(i64),
}

/// Reads the ledger once, then serves queries from memory.
///
/// Mutations are executed immediately on the processor's current scope but
/// only reach the cache through [`VersionInfoStore::commit`]; a rollback
/// calls [`VersionInfoStore::discard`] instead.
#[derive(Debug)]
pub struct VersionInfoStore {
    meta: VersionTableMetaData,
    applied: Option<BTreeMap<i64, AppliedVersion>>,
    table_exists: bool,
    pending: Vec<Change>,
}

impl VersionInfoStore {
    pub fn new(meta: VersionTableMetaData) -> Self {
        Self {
            meta,
            applied: None,
            table_exists: false,
            pending: Vec::new(),
        }
    }

    pub fn meta(&self) -> &VersionTableMetaData {
        &self.meta
    }

    pub fn is_loaded(&self) -> bool {
        self.applied.is_some()
    }

    pub fn table_exists(&self) -> bool {
        self.table_exists
    }

    /// Load the ledger. Later calls are no-ops.
    pub async fn load(&mut self, processor: &dyn Processor) -> Result<()> {
        if self.applied.is_some() {
            return Ok(());
        }

        let schema = self.meta.schema_name.as_deref();
        self.table_exists = processor.table_exists(schema, &self.meta.table_name).await?;

        let mut applied = BTreeMap::new();
        if self.table_exists {
            let dialect = processor.dialect();
            let sql = format!(
                "SELECT {}, {}, {} FROM {} ORDER BY {};",
                dialect.quote_ident(&self.meta.version_column),
                dialect.quote_ident(&self.meta.applied_on_column),
                dialect.quote_ident(&self.meta.description_column),
                dialect.qualify(schema, &self.meta.table_name),
                dialect.quote_ident(&self.meta.version_column),
            );
            for row in processor.read(&sql).await? {
                let Some(version) = row.first().and_then(|v| v.as_i64()) else {
                    return Err(MigrateError::Processor(format!(
                        "Unreadable {} row in {}: {:?}",
                        self.meta.version_column, self.meta.table_name, row.first()
                    )));
                };
                applied.insert(
                    version,
                    AppliedVersion {
                        version,
                        applied_on: row.get(1).and_then(|v| v.as_datetime()),
                        description: row.get(2).and_then(|v| v.as_str()).map(str::to_string),
                    },
                );
            }
        }

        debug!(
            "Loaded {} applied version(s) from {}",
            applied.len(),
            self.meta.table_name
        );
        self.applied = Some(applied);
        Ok(())
    }

    fn applied_map(&self) -> impl Iterator<Item = &AppliedVersion> {
        self.applied.iter().flat_map(|m| m.values())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn has_applied(&self, version: i64) -> bool {
        self.applied
            .as_ref()
            .is_some_and(|m| m.contains_key(&version))
    }

    /// Highest applied version, 0 when none.
    pub fn latest(&self) -> i64 {
        self.applied
            .as_ref()
            .and_then(|m| m.keys().next_back().copied())
            .unwrap_or(0)
    }

    /// Applied versions, ascending.
    pub fn applied_versions(&self) -> Vec<i64> {
        self.applied_map().map(|a| a.version).collect()
    }

    pub fn applied(&self, version: i64) -> Option<&AppliedVersion> {
        self.applied.as_ref().and_then(|m| m.get(&version))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create the table (and schema) when it does not exist yet.
    pub async fn ensure_table(&mut self, processor: &dyn Processor) -> Result<()> {
        if self.table_exists || self.pending.iter().any(|c| matches!(c, Change::CreatedTable)) {
            return Ok(());
        }
        let create_schema = match &self.meta.schema_name {
            Some(schema) => !processor.schema_exists(schema).await?,
            None => false,
        };
        for expression in self.meta.create_expressions(create_schema) {
            processor.process(&expression).await?;
        }
        self.pending.push(Change::CreatedTable);
        Ok(())
    }

    /// Record `version` as applied.
    pub async fn add(
        &mut self,
        processor: &dyn Processor,
        version: i64,
        description: &str,
    ) -> Result<()> {
        self.ensure_table(processor).await?;
        let entry = AppliedVersion {
            version,
            applied_on: Some(chrono::Utc::now().naive_utc()),
            description: Some(description.to_string()),
        };
        processor.process(&self.meta.insert_expression(&entry)).await?;
        self.pending.push(Change::Added(entry));
        Ok(())
    }

    /// Remove `version` from the ledger.
    pub async fn remove(&mut self, processor: &dyn Processor, version: i64) -> Result<()> {
        if !self.table_exists {
            return Ok(());
        }
        processor
            .process(&self.meta.delete_expression(version))
            .await?;
        self.pending.push(Change::Removed(version));
        Ok(())
    }

    /// Drop the ledger table.
    pub async fn drop_table(&mut self, processor: &dyn Processor) -> Result<()> {
        if !self.table_exists {
            return Ok(());
        }
        processor
            .process(&self.meta.delete_table_expression())
            .await?;
        info!("Dropped {}", self.meta.table_name);
        self.table_exists = false;
        self.applied = Some(BTreeMap::new());
        Ok(())
    }

    /// Apply pending mutations to the cache after the scope committed.
    pub fn commit(&mut self) {
        let applied = self.applied.get_or_insert_with(BTreeMap::new);
        for change in self.pending.drain(..) {
            match change {
                Change::CreatedTable => self.table_exists = true,
                Change::Added(entry) => {
                    applied.insert(entry.version, entry);
                }
                Change::Removed(version) => {
                    applied.remove(&version);
                }
            }
        }
    }

    /// Forget pending mutations after a rollback.
    pub fn discard(&mut self) {
        self.pending.clear();
    }
}
