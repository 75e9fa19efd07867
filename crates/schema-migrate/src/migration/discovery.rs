//! Ordering and tag filtering of registered migrations.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::{MaintenanceStage, MigrationInfo, MigrationRegistry};
use crate::error::{MigrateError, Result};

/// Migrations selected for one run.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    /// Regular migrations, ascending by version.
    pub migrations: Vec<MigrationInfo>,
    pub before_all: Vec<MigrationInfo>,
    pub before_each: Vec<MigrationInfo>,
    pub after_each: Vec<MigrationInfo>,
    pub after_all: Vec<MigrationInfo>,
}

impl MigrationPlan {
    pub fn get(&self, version: i64) -> Option<&MigrationInfo> {
        self.migrations
            .binary_search_by_key(&version, |m| m.version())
            .ok()
            .map(|i| &self.migrations[i])
    }

    pub fn maintenance(&self, stage: MaintenanceStage) -> &[MigrationInfo] {
        match stage {
            MaintenanceStage::BeforeAll => &self.before_all,
            MaintenanceStage::BeforeEach => &self.before_each,
            MaintenanceStage::AfterEach => &self.after_each,
            MaintenanceStage::AfterAll => &self.after_all,
        }
    }
}

/// Build the plan for `active_tags`.
///
/// Duplicate versions are rejected across the whole registry, before tag
/// filtering. Maintenance migrations keep registration order.
pub fn discover(registry: &MigrationRegistry, active_tags: &[String]) -> Result<MigrationPlan> {
    let active: HashSet<&str> = active_tags.iter().map(String::as_str).collect();

    let mut seen: BTreeMap<i64, &MigrationInfo> = BTreeMap::new();
    for info in registry.entries() {
        if info.maintenance_stage().is_some() {
            continue;
        }
        if let Some(first) = seen.insert(info.version(), info) {
            return Err(MigrateError::DuplicateVersion {
                version: info.version(),
                first: first.description().to_string(),
                second: info.description().to_string(),
            });
        }
    }

    let mut plan = MigrationPlan::default();
    for info in registry.entries() {
        if !info.is_included(&active) {
            debug!(
                "Skipping {} {}: tags do not match",
                info.version(),
                info.description()
            );
            continue;
        }
        let list = match info.maintenance_stage() {
            None => &mut plan.migrations,
            Some(MaintenanceStage::BeforeAll) => &mut plan.before_all,
            Some(MaintenanceStage::BeforeEach) => &mut plan.before_each,
            Some(MaintenanceStage::AfterEach) => &mut plan.after_each,
            Some(MaintenanceStage::AfterAll) => &mut plan.after_all,
        };
        list.push(info.clone());
    }
    plan.migrations.sort_by_key(|m| m.version());

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MigrationContext;
    use crate::migration::{Migration, TagGroup};

    struct Noop;

    impl Migration for Noop {
        fn up(&self, ctx: &mut MigrationContext) {
            ctx.execute().sql("SELECT 1");
        }
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn versions(plan: &MigrationPlan) -> Vec<i64> {
        plan.migrations.iter().map(|m| m.version()).collect()
    }

    #[test]
    fn test_sorted_ascending() {
        let mut registry = MigrationRegistry::new();
        registry.add(3, Noop);
        registry.add(1, Noop);
        registry.add(2, Noop);

        let plan = discover(&registry, &[]).unwrap();
        assert_eq!(versions(&plan), vec![1, 2, 3]);
        assert!(plan.get(2).is_some());
        assert!(plan.get(4).is_none());
    }

    #[test]
    fn test_duplicate_version_is_fatal() {
        let mut registry = MigrationRegistry::new();
        registry.add(5, Noop).describe("first");
        registry.add(5, Noop).describe("second");

        let err = discover(&registry, &[]).unwrap_err();
        match err {
            MigrateError::DuplicateVersion {
                version,
                first,
                second,
            } => {
                assert_eq!(version, 5);
                assert_eq!(first, "first");
                assert_eq!(second, "second");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tag_filtering() {
        let mut registry = MigrationRegistry::new();
        registry.add(1, Noop).tagged(TagGroup::all(["A"]));
        registry.add(2, Noop).tagged(TagGroup::all(["B"]));
        registry.add(3, Noop).tagged(TagGroup::all(["A", "B"]));
        registry.add(4, Noop).tagged(TagGroup::any(["A", "B"]));
        registry.add(5, Noop);

        let plan = discover(&registry, &tags(&["A"])).unwrap();
        assert_eq!(versions(&plan), vec![1, 4, 5]);

        let plan = discover(&registry, &tags(&["A", "B"])).unwrap();
        assert_eq!(versions(&plan), vec![1, 2, 3, 4, 5]);

        let plan = discover(&registry, &[]).unwrap();
        assert_eq!(versions(&plan), vec![5]);
    }

    #[test]
    fn test_maintenance_lists_keep_registration_order() {
        let mut registry = MigrationRegistry::new();
        registry
            .add_maintenance(MaintenanceStage::BeforeAll, Noop)
            .describe("second");
        registry.add(1, Noop);
        registry
            .add_maintenance(MaintenanceStage::AfterEach, Noop)
            .describe("audit");
        registry
            .add_maintenance(MaintenanceStage::BeforeAll, Noop)
            .describe("first");

        let plan = discover(&registry, &[]).unwrap();
        assert_eq!(versions(&plan), vec![1]);
        let before_all: Vec<&str> = plan.before_all.iter().map(|m| m.description()).collect();
        assert_eq!(before_all, vec!["second", "first"]);
        assert_eq!(plan.maintenance(MaintenanceStage::AfterEach).len(), 1);
        assert!(plan.after_all.is_empty());
    }
}
