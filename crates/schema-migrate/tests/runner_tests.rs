//! Runner integration tests against an in-memory processor.
//!
//! `FakeProcessor` speaks the SQL Server dialect and tracks just enough
//! state (tables, indexes, ledger rows, transactions) to observe what the
//! runner did.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use schema_migrate::builder::MigrationContext;
use schema_migrate::dialect::Dialect;
use schema_migrate::migration::{
    MaintenanceStage, Migration, MigrationRegistry, TagGroup, TransactionBehavior,
};
use schema_migrate::runner::CollectingSink;
use schema_migrate::{
    DialectImpl, MigrateError, MigrationRunner, Processor, Result, RunnerOptions, Value,
};

// =============================================================================
// Fake processor
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Schema {
    tables: BTreeSet<String>,
    /// `(table, index)` pairs.
    indexes: BTreeSet<(String, String)>,
    versions: BTreeMap<i64, String>,
}

#[derive(Default)]
struct FakeState {
    schema: Schema,
    snapshot: Option<Schema>,
    statements: Vec<String>,
    calls: usize,
    commits: usize,
    rollbacks: usize,
    fail_on: Option<String>,
}

struct FakeProcessor {
    dialect: DialectImpl,
    state: Mutex<FakeState>,
}

impl FakeProcessor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            dialect: DialectImpl::from_db_type("mssql").unwrap(),
            state: Mutex::new(FakeState::default()),
        })
    }

    /// Reject any statement containing `marker`.
    fn fail_on(&self, marker: &str) {
        self.state.lock().unwrap().fail_on = Some(marker.to_string());
    }

    /// Pretend `versions` were applied earlier.
    fn seed_versions(&self, versions: &[i64]) {
        let mut state = self.state.lock().unwrap();
        state.schema.tables.insert("VersionInfo".to_string());
        for v in versions {
            state.schema.versions.insert(*v, format!("seeded {}", v));
        }
    }

    fn schema(&self) -> Schema {
        self.state.lock().unwrap().schema.clone()
    }

    fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn has_table(&self, table: &str) -> bool {
        self.state.lock().unwrap().schema.tables.contains(table)
    }
}

/// Last `[bracketed]` segment of the first token in `rest`.
fn object_name(rest: &str) -> String {
    let token = rest
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default();
    token
        .rsplit('[')
        .next()
        .unwrap_or_default()
        .trim_end_matches(']')
        .to_string()
}

fn quoted_after<'a>(sql: &'a str, marker: &str) -> Option<&'a str> {
    let start = sql.find(marker)? + marker.len();
    let rest = &sql[start..];
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

fn apply_statement(schema: &mut Schema, sql: &str) {
    for statement in sql.split('\n') {
        let statement = statement.trim();
        if let Some(rest) = statement.strip_prefix("CREATE TABLE ") {
            schema.tables.insert(object_name(rest));
        } else if let Some(rest) = statement.strip_prefix("DROP TABLE ") {
            let table = object_name(rest);
            schema.indexes.retain(|(t, _)| *t != table);
            schema.tables.remove(&table);
        } else if statement.starts_with("CREATE ") && statement.contains("INDEX [") {
            if let (Some(index), Some(table)) =
                (statement.split("INDEX ").nth(1), statement.split(" ON ").nth(1))
            {
                schema.indexes.insert((object_name(table), object_name(index)));
            }
        } else if let Some(rest) = statement.strip_prefix("DROP INDEX ") {
            let index = object_name(rest);
            schema.indexes.retain(|(_, i)| *i != index);
        } else if statement.starts_with("INSERT INTO [dbo].[VersionInfo]") {
            let values = statement.split("VALUES (").nth(1).unwrap_or_default();
            let version = values.split(',').next().unwrap_or_default().trim();
            let description = values.rsplit("N'").next().unwrap_or_default();
            schema.versions.insert(
                version.parse().unwrap(),
                description.trim_end_matches(");").trim_end_matches('\'').to_string(),
            );
        } else if statement.starts_with("DELETE FROM [dbo].[VersionInfo]") {
            let version = statement.rsplit("= ").next().unwrap_or_default();
            schema
                .versions
                .remove(&version.trim_end_matches(';').parse::<i64>().unwrap());
        }
    }
}

#[async_trait]
impl Processor for FakeProcessor {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_dialect()
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if let Some(marker) = &state.fail_on {
            if sql.contains(marker.as_str()) {
                return Err(MigrateError::Processor(format!("Invalid object name '{}'", marker)));
            }
        }
        state.statements.push(sql.to_string());
        apply_statement(&mut state.schema, sql);
        Ok(())
    }

    async fn read(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if sql.contains("INFORMATION_SCHEMA.TABLES") {
            let table = quoted_after(sql, "TABLE_NAME = '").unwrap_or_default();
            return Ok(if state.schema.tables.contains(table) {
                vec![vec![Value::I32(1)]]
            } else {
                Vec::new()
            });
        }
        if sql.contains("FROM [dbo].[VersionInfo]") {
            return Ok(state
                .schema
                .versions
                .iter()
                .map(|(v, d)| vec![Value::I64(*v), Value::Null, Value::String(d.clone())])
                .collect());
        }
        Ok(Vec::new())
    }

    async fn begin_transaction(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.snapshot = Some(state.schema.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.commits += 1;
        state.snapshot = None;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.rollbacks += 1;
        if let Some(snapshot) = state.snapshot.take() {
            state.schema = snapshot;
        }
        Ok(())
    }
}

// =============================================================================
// Migrations
// =============================================================================

struct CreateUsers;

impl Migration for CreateUsers {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create()
            .table("Users")
            .with_column("Id")
            .as_int32()
            .primary_key()
            .identity()
            .with_column("Name")
            .as_string_sized(50)
            .not_nullable();
    }
}

struct CreateOrders;

impl Migration for CreateOrders {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create()
            .table("Orders")
            .with_column("Id")
            .as_int32()
            .primary_key()
            .with_column("UserId")
            .as_int32()
            .not_nullable()
            .indexed();
    }
}

struct CreateAudit;

impl Migration for CreateAudit {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create()
            .table("Audit")
            .with_column("Id")
            .as_int64()
            .primary_key();
    }
}

/// Fails on `[Broken]`, then creates `Later`.
struct PartlyBroken;

impl Migration for PartlyBroken {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create()
            .table("Before")
            .with_column("Id")
            .as_int32()
            .primary_key();
        ctx.execute().sql("UPDATE [Broken] SET [X] = 1;");
        ctx.create()
            .table("Later")
            .with_column("Id")
            .as_int32()
            .primary_key();
    }

    fn down(&self, ctx: &mut MigrationContext) -> Result<()> {
        ctx.delete().table("Later");
        ctx.delete().table("Before");
        Ok(())
    }
}

/// A connection callback that fails on `[Broken]`, then creates `Later`.
struct BrokenCallback;

impl Migration for BrokenCallback {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.execute().with_connection("touch broken table", |processor| {
            async move { processor.execute("UPDATE [Broken] SET [X] = 1;").await }.boxed()
        });
        ctx.create()
            .table("Later")
            .with_column("Id")
            .as_int32()
            .primary_key();
    }
}

/// A table with no columns never passes validation.
struct Invalid;

impl Migration for Invalid {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create().table("Empty");
    }
}

/// Records a marker statement.
struct Marker(&'static str);

impl Migration for Marker {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.execute().sql(format!("PRINT '{}';", self.0));
    }
}

fn registry() -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    registry.add(3, CreateAudit).describe("Create audit");
    registry.add(1, CreateUsers).describe("Create users");
    registry.add(2, CreateOrders).describe("Create orders");
    registry
}

fn runner(
    processor: &Arc<FakeProcessor>,
    registry: &MigrationRegistry,
    options: RunnerOptions,
) -> MigrationRunner {
    let processor: Arc<dyn Processor> = processor.clone();
    MigrationRunner::new(processor, registry, options).unwrap()
}

// =============================================================================
// Ordering and round trips
// =============================================================================

#[tokio::test]
async fn test_migrate_up_applies_in_ascending_order() {
    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());

    let report = runner.migrate_up(None).await.unwrap();
    assert_eq!(report.applied, vec![1, 2, 3]);
    assert_eq!(runner.store().latest(), 3);

    let creates: Vec<String> = fake
        .statements()
        .into_iter()
        .filter(|s| s.starts_with("CREATE TABLE") && !s.contains("VersionInfo"))
        .collect();
    assert!(creates[0].contains("[Users]"));
    assert!(creates[1].contains("[Orders]"));
    assert!(creates[2].contains("[Audit]"));
    assert_eq!(fake.schema().versions.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_migrate_up_to_target() {
    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());

    let report = runner.migrate_up(Some(2)).await.unwrap();
    assert_eq!(report.applied, vec![1, 2]);
    assert!(!fake.has_table("Audit"));
}

#[tokio::test]
async fn test_round_trip_restores_schema() {
    let fake = FakeProcessor::new();
    let before = fake.schema();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());

    runner.migrate_up(None).await.unwrap();
    assert!(fake.has_table("Users"));
    assert!(fake
        .schema()
        .indexes
        .contains(&("Orders".to_string(), "IX_Orders_UserId".to_string())));

    let report = runner.rollback_to_version(0).await.unwrap();
    assert_eq!(report.reverted, vec![3, 2, 1]);
    assert_eq!(fake.schema(), before);
    assert!(!runner.store().table_exists());
}

#[tokio::test]
async fn test_rollback_steps() {
    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());
    runner.migrate_up(None).await.unwrap();

    let report = runner.rollback(1).await.unwrap();
    assert_eq!(report.reverted, vec![3]);
    assert_eq!(runner.store().latest(), 2);
    assert!(fake.has_table("VersionInfo"));

    let report = runner.rollback(5).await.unwrap();
    assert_eq!(report.reverted, vec![2, 1]);
    assert!(!fake.has_table("VersionInfo"));
}

#[tokio::test]
async fn test_rollback_more_steps_than_applied() {
    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());
    runner.migrate_up(None).await.unwrap();

    let report = runner.rollback(usize::MAX).await.unwrap();
    assert_eq!(report.reverted, vec![3, 2, 1]);
    assert_eq!(runner.store().latest(), 0);
    assert!(!fake.has_table("VersionInfo"));
}

#[tokio::test]
async fn test_second_up_makes_no_processor_calls() {
    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());
    runner.migrate_up(Some(3)).await.unwrap();
    let calls = fake.calls();
    let ledger = fake.schema().versions;

    let report = runner.migrate_up(Some(3)).await.unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(fake.calls(), calls);
    assert_eq!(fake.schema().versions, ledger);
}

#[tokio::test]
async fn test_new_runner_reads_existing_ledger() {
    let fake = FakeProcessor::new();
    fake.seed_versions(&[1, 2]);
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());

    let report = runner.migrate_up(None).await.unwrap();
    assert_eq!(report.applied, vec![3]);
}

// =============================================================================
// Tags
// =============================================================================

#[tokio::test]
async fn test_tag_filtering_selects_matching_migrations() {
    let mut registry = MigrationRegistry::new();
    registry.add(1, Marker("a")).tagged(TagGroup::all(["A"]));
    registry.add(2, Marker("b")).tagged(TagGroup::all(["B"]));
    registry.add(3, Marker("ab-all")).tagged(TagGroup::all(["A", "B"]));
    registry.add(4, Marker("ab-any")).tagged(TagGroup::any(["A", "B"]));
    registry.add(5, Marker("untagged"));

    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry, RunnerOptions::default().with_tags(["A"]));
    let report = runner.migrate_up(None).await.unwrap();
    assert_eq!(report.applied, vec![1, 4, 5]);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_ordering_violation_reports_offender() {
    let fake = FakeProcessor::new();
    fake.seed_versions(&[1, 3]);
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());

    match runner.validate_version_order().await {
        Err(MigrateError::Ordering { offenders }) => {
            assert_eq!(offenders.keys().copied().collect::<Vec<_>>(), vec![2]);
            assert_eq!(offenders[&2].description(), "Create orders");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_ordering_is_valid_when_applied_in_order() {
    let fake = FakeProcessor::new();
    fake.seed_versions(&[1, 2]);
    let mut runner = runner(&fake, &registry(), RunnerOptions::default());
    runner.validate_version_order().await.unwrap();
}

#[tokio::test]
async fn test_validation_error_executes_nothing() {
    let mut registry = registry();
    registry.add(4, Invalid);
    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry, RunnerOptions::default());

    let err = runner.migrate_up(None).await.unwrap_err();
    assert!(matches!(err, MigrateError::Validation { version: Some(4), .. }));
    assert!(fake.statements().is_empty());
    assert!(!fake.has_table("Users"));
}

#[tokio::test]
async fn test_breaking_change_refused_unless_allowed() {
    let mut registry = registry();
    registry.add(4, Marker("drop")).breaking_change();

    let fake = FakeProcessor::new();
    let mut refused = runner(&fake, &registry, RunnerOptions::default());
    let err = refused.migrate_up(None).await.unwrap_err();
    assert_eq!(err.version(), Some(4));
    assert!(fake.statements().is_empty());

    let options = RunnerOptions {
        allow_breaking_changes: true,
        ..RunnerOptions::default()
    };
    let mut allowed = runner(&fake, &registry, options);
    let report = allowed.migrate_up(None).await.unwrap();
    assert_eq!(report.applied, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_duplicate_versions_rejected() {
    let mut registry = registry();
    registry.add(2, Marker("again"));
    let fake = FakeProcessor::new();
    let processor: Arc<dyn Processor> = fake.clone();
    let err = MigrationRunner::new(processor, &registry, RunnerOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, MigrateError::DuplicateVersion { version: 2, .. }));
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_failure_rolls_back_current_migration() {
    let mut registry = MigrationRegistry::new();
    registry.add(1, CreateUsers);
    registry.add(2, PartlyBroken);
    let fake = FakeProcessor::new();
    fake.fail_on("[Broken]");
    let mut runner = runner(&fake, &registry, RunnerOptions::default());

    let err = runner.migrate_up(None).await.unwrap_err();
    match &err {
        MigrateError::Execution {
            version,
            dialect,
            message,
            ..
        } => {
            assert_eq!(*version, Some(2));
            assert_eq!(dialect, "SqlServer");
            assert!(message.contains("Invalid object name"));
        }
        other => panic!("unexpected {:?}", other),
    }

    assert!(fake.has_table("Users"));
    assert!(!fake.has_table("Before"));
    assert!(!fake.has_table("Later"));
    assert_eq!(fake.schema().versions.keys().copied().collect::<Vec<_>>(), vec![1]);
    assert!(runner.store().has_applied(1));
    assert!(!runner.store().has_applied(2));
    assert_eq!(fake.state.lock().unwrap().rollbacks, 1);
}

#[tokio::test]
async fn test_silently_fail_captures_and_continues() {
    let mut registry = MigrationRegistry::new();
    registry.add(2, PartlyBroken);
    let fake = FakeProcessor::new();
    fake.fail_on("[Broken]");
    let mut runner = runner(&fake, &registry, RunnerOptions::default().silently_fail(true));

    let report = runner.migrate_up(None).await.unwrap();
    assert_eq!(report.applied, vec![2]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].version, Some(2));
    assert_eq!(report.status, "completed_with_errors");
    assert!(fake.has_table("Before"));
    assert!(fake.has_table("Later"));
    assert!(runner.store().has_applied(2));
}

#[tokio::test]
async fn test_failing_callback_reports_version_and_expression() {
    let mut registry = MigrationRegistry::new();
    registry.add(4, BrokenCallback);
    let fake = FakeProcessor::new();
    fake.fail_on("[Broken]");
    let mut runner = runner(&fake, &registry, RunnerOptions::default());

    let err = runner.migrate_up(None).await.unwrap_err();
    match &err {
        MigrateError::Execution {
            version,
            expression,
            message,
            ..
        } => {
            assert_eq!(*version, Some(4));
            assert!(expression.contains("touch broken table"));
            assert!(message.contains("Invalid object name"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!fake.has_table("Later"));
}

#[tokio::test]
async fn test_silently_fail_captures_callback_failure() {
    let mut registry = MigrationRegistry::new();
    registry.add(4, BrokenCallback);
    let fake = FakeProcessor::new();
    fake.fail_on("[Broken]");
    let mut runner = runner(&fake, &registry, RunnerOptions::default().silently_fail(true));

    let report = runner.migrate_up(None).await.unwrap();
    assert_eq!(report.applied, vec![4]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].version, Some(4));
    assert!(report.errors[0].message.contains("touch broken table"));
    assert!(fake.has_table("Later"));
    assert!(runner.store().has_applied(4));
}

#[tokio::test]
async fn test_no_transaction_keeps_partial_work() {
    let mut registry = MigrationRegistry::new();
    registry
        .add(2, PartlyBroken)
        .set_transaction_behavior(TransactionBehavior::None);
    let fake = FakeProcessor::new();
    fake.fail_on("[Broken]");
    let mut runner = runner(&fake, &registry, RunnerOptions::default());

    assert!(runner.migrate_up(None).await.is_err());
    assert!(fake.has_table("Before"));
    assert!(!fake.has_table("Later"));
    assert_eq!(fake.state.lock().unwrap().rollbacks, 0);
    assert!(!runner.store().has_applied(2));
}

#[tokio::test]
async fn test_cancelled_before_first_migration() {
    let fake = FakeProcessor::new();
    let (tx, rx) = tokio::sync::watch::channel(false);
    let mut runner = runner(&fake, &registry(), RunnerOptions::default()).with_cancellation(rx);
    tx.send(true).unwrap();

    let err = runner.migrate_up(None).await.unwrap_err();
    assert!(matches!(err, MigrateError::Cancelled));
    assert!(!fake.has_table("Users"));
}

// =============================================================================
// Maintenance
// =============================================================================

#[tokio::test]
async fn test_maintenance_stages_run_in_order() {
    let mut registry = MigrationRegistry::new();
    registry.add(1, Marker("m1"));
    registry.add(2, Marker("m2"));
    registry.add_maintenance(MaintenanceStage::AfterAll, Marker("after-all"));
    registry.add_maintenance(MaintenanceStage::BeforeEach, Marker("before-each"));
    registry.add_maintenance(MaintenanceStage::AfterEach, Marker("after-each"));
    registry.add_maintenance(MaintenanceStage::BeforeAll, Marker("before-all"));

    let fake = FakeProcessor::new();
    let mut runner = runner(&fake, &registry, RunnerOptions::default());
    runner.migrate_up(None).await.unwrap();

    let markers: Vec<String> = fake
        .statements()
        .into_iter()
        .filter_map(|s| s.strip_prefix("PRINT '").map(|m| m.trim_end_matches("';").to_string()))
        .collect();
    assert_eq!(
        markers,
        vec![
            "before-all",
            "before-each",
            "m1",
            "after-each",
            "before-each",
            "m2",
            "after-each",
            "after-all",
        ]
    );
}

#[tokio::test]
async fn test_maintenance_skipped_when_nothing_pending() {
    let mut registry = MigrationRegistry::new();
    registry.add(1, Marker("m1"));
    registry.add_maintenance(MaintenanceStage::BeforeAll, Marker("before-all"));
    let fake = FakeProcessor::new();
    fake.seed_versions(&[1]);
    let mut runner = runner(&fake, &registry, RunnerOptions::default());

    runner.migrate_up(None).await.unwrap();
    assert!(fake.statements().is_empty());
}

// =============================================================================
// Preview
// =============================================================================

#[tokio::test]
async fn test_preview_sends_sql_to_sink_only() {
    let fake = FakeProcessor::new();
    let sink = CollectingSink::new();
    let mut runner = runner(&fake, &registry(), RunnerOptions::default().preview(true))
        .with_sink(sink.clone());

    let report = runner.migrate_up(None).await.unwrap();
    assert!(report.preview);
    assert_eq!(report.applied, vec![1, 2, 3]);
    assert!(fake.statements().is_empty());
    assert_eq!(fake.state.lock().unwrap().commits, 0);
    assert!(!runner.store().has_applied(1));

    let statements = sink.statements();
    assert!(statements.contains(
        &"CREATE TABLE [dbo].[Users] ([Id] INT NOT NULL IDENTITY(1,1), [Name] NVARCHAR(50) NOT NULL, CONSTRAINT [PK_Users] PRIMARY KEY ([Id]));"
            .to_string()
    ));
    assert!(statements.iter().any(|s| s.starts_with("INSERT INTO [dbo].[VersionInfo]")));
    let version_tables = statements
        .iter()
        .filter(|s| s.starts_with("CREATE TABLE [dbo].[VersionInfo]"))
        .count();
    assert_eq!(version_tables, 1);
}

#[tokio::test]
async fn test_list_migrations_reports_status() {
    let fake = FakeProcessor::new();
    let mut registry = registry();
    registry.add(4, Marker("x")).breaking_change();
    fake.seed_versions(&[1, 2]);
    let mut runner = runner(&fake, &registry, RunnerOptions::default());

    let statuses = runner.list_migrations().await.unwrap();
    let summary: Vec<(i64, bool, bool, bool)> = statuses
        .iter()
        .map(|s| (s.version, s.applied, s.current, s.breaking_change))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, true, false, false),
            (2, true, true, false),
            (3, false, false, false),
            (4, false, false, true),
        ]
    );
    assert_eq!(statuses[0].description, "Create users");
}
