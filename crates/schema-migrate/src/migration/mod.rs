//! Migrations and their metadata.
//!
//! A [`Migration`] declares its changes through a
//! [`MigrationContext`](crate::builder::MigrationContext). Versions, tags,
//! transaction behavior and maintenance stages live on [`MigrationInfo`],
//! set when the migration is added to a [`MigrationRegistry`].

mod discovery;
mod registry;

pub use discovery::{discover, MigrationPlan};
pub use registry::MigrationRegistry;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::MigrationContext;
use crate::error::{MigrateError, Result};
use crate::model::Expression;

/// A versioned schema change.
pub trait Migration: Send + Sync {
    /// Record the forward changes.
    fn up(&self, ctx: &mut MigrationContext);

    /// Record the reverse changes.
    ///
    /// The default replays `up` and records the inverse of each expression
    /// in reverse order; it fails when any expression has no inverse.
    fn down(&self, ctx: &mut MigrationContext) -> Result<()> {
        auto_reverse(ctx, |scratch| self.up(scratch))
    }
}

/// Record the inverses of what `build` records, last first.
pub fn auto_reverse<F>(ctx: &mut MigrationContext, build: F) -> Result<()>
where
    F: FnOnce(&mut MigrationContext),
{
    let mut scratch = MigrationContext::new(ctx.database());
    build(&mut scratch);

    let mut inverses = Vec::new();
    for expression in scratch.into_expressions().iter().rev() {
        match expression.reverse() {
            Some(inverse) => inverses.push(inverse),
            None => {
                return Err(MigrateError::validation(
                    expression.to_string(),
                    format!(
                        "{} cannot be reversed automatically; implement down()",
                        expression.kind()
                    ),
                ))
            }
        }
    }
    for inverse in inverses {
        ctx.push(inverse);
    }
    Ok(())
}

/// Whether a migration runs inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionBehavior {
    #[default]
    Default,
    None,
}

/// How the names of one tag group are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagBehavior {
    /// Every name must be active.
    #[default]
    RequireAll,
    /// At least one name must be active.
    RequireAny,
}

/// Tag names evaluated together under one behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub names: BTreeSet<String>,
    pub behavior: TagBehavior,
}

impl TagGroup {
    pub fn all<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            behavior: TagBehavior::RequireAll,
        }
    }

    pub fn any<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            behavior: TagBehavior::RequireAny,
        }
    }

    pub fn matches(&self, active: &HashSet<&str>) -> bool {
        match self.behavior {
            TagBehavior::RequireAll => self.names.iter().all(|n| active.contains(n.as_str())),
            TagBehavior::RequireAny => self.names.iter().any(|n| active.contains(n.as_str())),
        }
    }
}

/// Fixed points at which maintenance migrations run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceStage {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

/// A registered migration and its metadata.
#[derive(Clone)]
pub struct MigrationInfo {
    version: i64,
    name: String,
    description: Option<String>,
    transaction_behavior: TransactionBehavior,
    tags: Vec<TagGroup>,
    maintenance: Option<MaintenanceStage>,
    traits: BTreeMap<String, String>,
    breaking_change: bool,
    migration: Arc<dyn Migration>,
}

impl MigrationInfo {
    pub fn new<M: Migration + 'static>(version: i64, migration: M) -> Self {
        Self {
            version,
            name: short_type_name::<M>(),
            description: None,
            transaction_behavior: TransactionBehavior::Default,
            tags: Vec::new(),
            maintenance: None,
            traits: BTreeMap::new(),
            breaking_change: false,
            migration: Arc::new(migration),
        }
    }

    /// Maintenance migration pinned to `stage`; it carries no version.
    pub fn maintenance<M: Migration + 'static>(stage: MaintenanceStage, migration: M) -> Self {
        let mut info = Self::new(0, migration);
        info.maintenance = Some(stage);
        info
    }

    // =========================================================================
    // Metadata setters
    // =========================================================================

    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_transaction_behavior(&mut self, behavior: TransactionBehavior) -> &mut Self {
        self.transaction_behavior = behavior;
        self
    }

    /// Add a tag group; several groups must all match.
    pub fn tagged(&mut self, group: TagGroup) -> &mut Self {
        self.tags.push(group);
        self
    }

    pub fn with_trait(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.traits.insert(key.into(), value.into());
        self
    }

    pub fn breaking_change(&mut self) -> &mut Self {
        self.breaking_change = true;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Description, or the migration's type name when none was given.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transaction_behavior(&self) -> TransactionBehavior {
        self.transaction_behavior
    }

    pub fn tags(&self) -> &[TagGroup] {
        &self.tags
    }

    pub fn maintenance_stage(&self) -> Option<MaintenanceStage> {
        self.maintenance
    }

    pub fn traits(&self) -> &BTreeMap<String, String> {
        &self.traits
    }

    pub fn is_breaking_change(&self) -> bool {
        self.breaking_change
    }

    /// Untagged migrations always apply; tagged ones need every group to
    /// match a non-empty active set.
    pub fn is_included(&self, active: &HashSet<&str>) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        !active.is_empty() && self.tags.iter().all(|group| group.matches(active))
    }

    // =========================================================================
    // Expression building
    // =========================================================================

    /// Expressions recorded by `up` for `database`.
    pub fn up_expressions(&self, database: &str) -> Vec<Expression> {
        let mut ctx = MigrationContext::new(database);
        self.migration.up(&mut ctx);
        ctx.into_expressions()
    }

    /// Expressions recorded by `down` for `database`.
    pub fn down_expressions(&self, database: &str) -> Result<Vec<Expression>> {
        let mut ctx = MigrationContext::new(database);
        self.migration
            .down(&mut ctx)
            .map_err(|e| e.in_migration(self.version))?;
        Ok(ctx.into_expressions())
    }
}

impl fmt::Debug for MigrationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationInfo")
            .field("version", &self.version)
            .field("description", &self.description())
            .field("transaction_behavior", &self.transaction_behavior)
            .field("tags", &self.tags)
            .field("maintenance", &self.maintenance)
            .field("breaking_change", &self.breaking_change)
            .finish_non_exhaustive()
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
