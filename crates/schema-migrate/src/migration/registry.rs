//! Explicit registry of the migrations compiled into a host.

use super::{MaintenanceStage, Migration, MigrationInfo};

/// Migrations registered at startup, in registration order.
///
/// ```
/// use schema_migrate::builder::MigrationContext;
/// use schema_migrate::migration::{Migration, MigrationRegistry, TagGroup};
///
/// struct CreateUsers;
///
/// impl Migration for CreateUsers {
///     fn up(&self, ctx: &mut MigrationContext) {
///         ctx.create().table("Users").with_column("Id").as_int64().primary_key();
///     }
/// }
///
/// let mut registry = MigrationRegistry::new();
/// registry
///     .add(20240101120000, CreateUsers)
///     .describe("Create users")
///     .tagged(TagGroup::any(["EU", "US"]));
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    entries: Vec<MigrationInfo>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a versioned migration and return its metadata for chaining.
    pub fn add<M: Migration + 'static>(&mut self, version: i64, migration: M) -> &mut MigrationInfo {
        self.register(MigrationInfo::new(version, migration))
    }

    /// Register a maintenance migration for `stage`.
    pub fn add_maintenance<M: Migration + 'static>(
        &mut self,
        stage: MaintenanceStage,
        migration: M,
    ) -> &mut MigrationInfo {
        self.register(MigrationInfo::maintenance(stage, migration))
    }

    pub fn register(&mut self, info: MigrationInfo) -> &mut MigrationInfo {
        self.entries.push(info);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn entries(&self) -> &[MigrationInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
