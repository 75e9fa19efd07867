//! Applying and reverting migrations against one processor.
//!
//! A run is strictly sequential. Every selected migration is validated and
//! generated before the first statement executes, so validation and
//! capability errors never touch the database. Each migration then runs in
//! its own transaction scope, closed by the VersionInfo mutation and commit.

mod options;
mod report;

pub use options::RunnerOptions;
pub use report::{
    CapturedError, CollectingSink, MigrationStatus, RunReport, ScriptSink, TracingSink,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::migration::{
    discover, MaintenanceStage, MigrationInfo, MigrationPlan, MigrationRegistry,
    TransactionBehavior,
};
use crate::model::{Expression, RawOperation};
use crate::processor::{execution_error, Processor};
use crate::state::{AppliedVersion, VersionInfoStore};

/// One expression ready to run; `sql` is `None` for connection callbacks.
struct Step {
    expression: Expression,
    sql: Option<String>,
}

/// A migration with its prepared steps.
struct Prepared {
    info: MigrationInfo,
    steps: Vec<Step>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Runs a [`MigrationPlan`] against a [`Processor`].
pub struct MigrationRunner {
    processor: Arc<dyn Processor>,
    plan: MigrationPlan,
    options: RunnerOptions,
    store: VersionInfoStore,
    sink: Box<dyn ScriptSink>,
    cancel: Option<watch::Receiver<bool>>,
    previewed_table: bool,
}

impl MigrationRunner {
    /// Discover migrations for the configured tags.
    pub fn new(
        processor: Arc<dyn Processor>,
        registry: &MigrationRegistry,
        options: RunnerOptions,
    ) -> Result<Self> {
        let plan = discover(registry, &options.tags)?;
        info!(
            "Discovered {} migration(s) for {} (tags: {:?})",
            plan.migrations.len(),
            processor.dialect().name(),
            options.tags
        );
        Ok(Self {
            processor,
            plan,
            store: VersionInfoStore::new(options.version_table.clone()),
            options,
            sink: Box::new(TracingSink),
            cancel: None,
            previewed_table: false,
        })
    }

    /// Send preview SQL to `sink` instead of the log.
    pub fn with_sink(mut self, sink: impl ScriptSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Stop between migrations once `cancel` turns true.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn store(&self) -> &VersionInfoStore {
        &self.store
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Apply unapplied migrations up to `target` (all when `None`).
    pub async fn migrate_up(&mut self, target: Option<i64>) -> Result<RunReport> {
        let mut report = self.start_report("up");
        self.load().await?;

        let selected: Vec<MigrationInfo> = self
            .plan
            .migrations
            .iter()
            .filter(|m| !self.store.has_applied(m.version()))
            .filter(|m| target.map_or(true, |t| m.version() <= t))
            .cloned()
            .collect();
        if selected.is_empty() {
            info!("Database is up to date at version {}", self.store.latest());
            return Ok(report.finish());
        }
        self.check_breaking_changes(&selected)?;

        let before_all = self.prepare_maintenance(MaintenanceStage::BeforeAll)?;
        let before_each = self.prepare_maintenance(MaintenanceStage::BeforeEach)?;
        let after_each = self.prepare_maintenance(MaintenanceStage::AfterEach)?;
        let after_all = self.prepare_maintenance(MaintenanceStage::AfterAll)?;
        let migrations = selected
            .into_iter()
            .map(|info| self.prepare(info, Direction::Up))
            .collect::<Result<Vec<_>>>()?;

        for prepared in &before_all {
            self.run_maintenance(prepared, &mut report).await?;
        }
        for prepared in &migrations {
            self.check_cancelled()?;
            for maintenance in &before_each {
                self.run_maintenance(maintenance, &mut report).await?;
            }
            self.apply(prepared, &after_each, &mut report).await?;
        }
        for prepared in &after_all {
            self.run_maintenance(prepared, &mut report).await?;
        }

        Ok(report.finish())
    }

    /// Revert applied migrations above `target`, newest first.
    ///
    /// At target 0 the VersionInfo table is dropped once it is empty.
    pub async fn migrate_down(&mut self, target: i64) -> Result<RunReport> {
        let mut report = self.start_report("down");
        self.load().await?;

        let versions: Vec<i64> = self
            .store
            .applied_versions()
            .into_iter()
            .rev()
            .filter(|v| *v > target)
            .collect();

        let mut migrations = Vec::with_capacity(versions.len());
        for version in versions {
            let info = self.plan.get(version).cloned().ok_or_else(|| {
                MigrateError::validation(
                    "VersionInfo",
                    "applied version has no registered migration to revert",
                )
                .in_migration(version)
            })?;
            migrations.push(self.prepare(info, Direction::Down)?);
        }

        for prepared in &migrations {
            self.check_cancelled()?;
            self.revert(prepared, &mut report).await?;
        }

        if target == 0 && self.store.table_exists() {
            if self.options.preview_only {
                let sql = self
                    .processor
                    .dialect()
                    .generate(&self.store.meta().delete_table_expression())?;
                self.sink.write(&sql);
            } else if self.store.applied_versions().is_empty() {
                self.store.drop_table(self.processor.as_ref()).await?;
            }
        }

        Ok(report.finish())
    }

    /// Same as [`MigrationRunner::migrate_down`].
    pub async fn rollback_to_version(&mut self, version: i64) -> Result<RunReport> {
        self.migrate_down(version).await
    }

    /// Revert the latest `steps` applied migrations.
    pub async fn rollback(&mut self, steps: usize) -> Result<RunReport> {
        self.load().await?;
        if steps == 0 {
            return Ok(self.start_report("down").finish());
        }
        let applied = self.store.applied_versions();
        let target = applied
            .len()
            .checked_sub(steps)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| applied.get(i).copied())
            .unwrap_or(0);
        self.migrate_down(target).await
    }

    /// Fail when an unapplied migration is older than the latest applied one.
    pub async fn validate_version_order(&mut self) -> Result<()> {
        self.load().await?;
        let latest = self.store.latest();
        let offenders: BTreeMap<i64, MigrationInfo> = self
            .plan
            .migrations
            .iter()
            .filter(|m| m.version() < latest && !self.store.has_applied(m.version()))
            .map(|m| (m.version(), m.clone()))
            .collect();

        if offenders.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::Ordering { offenders })
        }
    }

    /// Status of every migration in the plan.
    pub async fn list_migrations(&mut self) -> Result<Vec<MigrationStatus>> {
        self.load().await?;
        let latest = self.store.latest();
        Ok(self
            .plan
            .migrations
            .iter()
            .map(|m| {
                let applied = self.store.applied(m.version());
                MigrationStatus {
                    version: m.version(),
                    description: m.description().to_string(),
                    applied: applied.is_some(),
                    applied_on: applied.and_then(|a| a.applied_on),
                    current: applied.is_some() && m.version() == latest,
                    breaking_change: m.is_breaking_change(),
                }
            })
            .collect())
    }

    // =========================================================================
    // Preparation
    // =========================================================================

    fn start_report(&self, operation: &str) -> RunReport {
        let mut report = RunReport::start(operation, self.options.preview_only);
        report.config_hash = self.options.config_hash.clone();
        report
    }

    async fn load(&mut self) -> Result<()> {
        self.store.load(self.processor.as_ref()).await
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(cancel) if *cancel.borrow() => Err(MigrateError::Cancelled),
            _ => Ok(()),
        }
    }

    fn check_breaking_changes(&self, selected: &[MigrationInfo]) -> Result<()> {
        if self.options.allow_breaking_changes {
            return Ok(());
        }
        match selected.iter().find(|m| m.is_breaking_change()) {
            Some(m) => Err(MigrateError::validation(
                m.description(),
                "flagged as a breaking change; set runner.allow_breaking_changes to apply it",
            )
            .in_migration(m.version())),
            None => Ok(()),
        }
    }

    fn prepare_maintenance(&self, stage: MaintenanceStage) -> Result<Vec<Prepared>> {
        self.plan
            .maintenance(stage)
            .iter()
            .cloned()
            .map(|info| self.prepare(info, Direction::Up))
            .collect()
    }

    /// Validate and generate every expression of `info`.
    fn prepare(&self, info: MigrationInfo, direction: Direction) -> Result<Prepared> {
        let dialect = self.processor.dialect();
        let expressions = match direction {
            Direction::Up => info.up_expressions(dialect.name()),
            Direction::Down => info.down_expressions(dialect.name())?,
        };

        let version = scope_version(&info);
        let stamp = |e: MigrateError| match version {
            Some(v) => e.in_migration(v),
            None => e,
        };

        let mut steps = Vec::with_capacity(expressions.len());
        for expression in expressions {
            expression.validate().map_err(stamp)?;
            let sql = match &expression {
                Expression::PerformRawOperation(RawOperation::Callback(_)) => None,
                _ => Some(
                    dialect
                        .generate(&expression)
                        .map_err(|e| stamp(e.describing(expression.to_string())))?,
                ),
            };
            steps.push(Step { expression, sql });
        }
        Ok(Prepared { info, steps })
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn uses_transaction(&self, info: &MigrationInfo) -> bool {
        !self.options.preview_only
            && self.options.transaction_per_migration
            && info.transaction_behavior() == TransactionBehavior::Default
    }

    async fn apply(
        &mut self,
        prepared: &Prepared,
        after_each: &[Prepared],
        report: &mut RunReport,
    ) -> Result<()> {
        let info = &prepared.info;
        if self.options.preview_only {
            self.sink
                .write(&format!("-- {}: {} migrating", info.version(), info.description()));
        }

        let transaction = self.uses_transaction(info);
        if transaction {
            self.processor.begin_transaction().await?;
        }
        let result = self.apply_in_scope(prepared, after_each, report).await;
        self.close_scope(transaction, result).await?;

        info!("Applied migration {} {}", info.version(), info.description());
        report.applied.push(info.version());
        Ok(())
    }

    async fn apply_in_scope(
        &mut self,
        prepared: &Prepared,
        after_each: &[Prepared],
        report: &mut RunReport,
    ) -> Result<()> {
        let info = &prepared.info;
        self.run_steps(Some(info.version()), &prepared.steps, report)
            .await?;
        for maintenance in after_each {
            self.run_steps(None, &maintenance.steps, report).await?;
        }

        if self.options.preview_only {
            if !self.store.table_exists() && !self.previewed_table {
                for expression in self.store.meta().create_expressions(false) {
                    let sql = self.processor.dialect().generate(&expression)?;
                    self.sink.write(&sql);
                }
                self.previewed_table = true;
            }
            let entry = AppliedVersion {
                version: info.version(),
                applied_on: Some(chrono::Utc::now().naive_utc()),
                description: Some(info.description().to_string()),
            };
            let sql = self
                .processor
                .dialect()
                .generate(&self.store.meta().insert_expression(&entry))?;
            self.sink.write(&sql);
            Ok(())
        } else {
            self.store
                .add(self.processor.as_ref(), info.version(), info.description())
                .await
                .map_err(|e| e.in_migration(info.version()))
        }
    }

    async fn revert(&mut self, prepared: &Prepared, report: &mut RunReport) -> Result<()> {
        let info = &prepared.info;
        if self.options.preview_only {
            self.sink
                .write(&format!("-- {}: {} reverting", info.version(), info.description()));
        }

        let transaction = self.uses_transaction(info);
        if transaction {
            self.processor.begin_transaction().await?;
        }
        let result = self.revert_in_scope(prepared, report).await;
        self.close_scope(transaction, result).await?;

        info!("Reverted migration {} {}", info.version(), info.description());
        report.reverted.push(info.version());
        Ok(())
    }

    async fn revert_in_scope(&mut self, prepared: &Prepared, report: &mut RunReport) -> Result<()> {
        let version = prepared.info.version();
        self.run_steps(Some(version), &prepared.steps, report)
            .await?;

        if self.options.preview_only {
            let sql = self
                .processor
                .dialect()
                .generate(&self.store.meta().delete_expression(version))?;
            self.sink.write(&sql);
            Ok(())
        } else {
            self.store
                .remove(self.processor.as_ref(), version)
                .await
                .map_err(|e| e.in_migration(version))
        }
    }

    /// Run one maintenance migration in its own scope.
    async fn run_maintenance(&mut self, prepared: &Prepared, report: &mut RunReport) -> Result<()> {
        debug!("Running maintenance {}", prepared.info.description());
        let transaction = self.uses_transaction(&prepared.info);
        if transaction {
            self.processor.begin_transaction().await?;
        }
        let result = self.run_steps(None, &prepared.steps, report).await;
        self.close_scope(transaction, result).await
    }

    /// Commit on success, roll back on failure; the ledger cache follows.
    async fn close_scope(&mut self, transaction: bool, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                if transaction {
                    if let Err(e) = self.processor.commit().await {
                        self.store.discard();
                        return Err(e);
                    }
                }
                self.store.commit();
                Ok(())
            }
            Err(e) => {
                if transaction {
                    if let Err(rollback_err) = self.processor.rollback().await {
                        warn!("Rollback failed: {}", rollback_err);
                    }
                }
                self.store.discard();
                Err(e)
            }
        }
    }

    async fn run_steps(
        &mut self,
        version: Option<i64>,
        steps: &[Step],
        report: &mut RunReport,
    ) -> Result<()> {
        for step in steps {
            if self.options.preview_only {
                match &step.sql {
                    Some(sql) => self.sink.write(sql),
                    None => self
                        .sink
                        .write(&format!("-- not run in preview: {}", step.expression)),
                }
                continue;
            }

            let result = match &step.sql {
                Some(sql) => {
                    debug!("{}", sql);
                    self.processor.execute(sql).await
                }
                None => self.processor.process(&step.expression).await,
            }
            .map_err(|e| execution_error(self.processor.dialect(), &step.expression, e));

            if let Err(e) = result {
                let e = match version {
                    Some(v) => e.in_migration(v),
                    None => e,
                };
                if self.options.silently_fail && matches!(e, MigrateError::Execution { .. }) {
                    warn!("Ignoring failure: {}", e);
                    report.errors.push(CapturedError::from_error(&e));
                    continue;
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

fn scope_version(info: &MigrationInfo) -> Option<i64> {
    match info.maintenance_stage() {
        Some(_) => None,
        None => Some(info.version()),
    }
}
