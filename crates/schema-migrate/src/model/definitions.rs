//! Index, constraint, foreign key and sequence definitions.

use std::fmt;

use super::conventions;

/// Sort direction of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub direction: Direction,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }
}

/// Dialect-specific index options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexExtensions {
    /// SQL Server `CLUSTERED` / `NONCLUSTERED`.
    pub clustered: Option<bool>,
    /// Covering columns (`INCLUDE (...)`).
    pub include: Vec<String>,
    /// Filter predicate (`WHERE ...`), spliced verbatim.
    pub filter: Option<String>,
    /// PostgreSQL access method (`USING gin`).
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: Option<String>,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub extensions: IndexExtensions,
}

impl IndexDefinition {
    /// Explicit name, or `IX_<table>_<cols>`.
    pub fn effective_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let cols: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
                conventions::index_name(&self.table, &cols)
            }
        }
    }
}

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyRule {
    #[default]
    None,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyRule {
    /// SQL keyword; `None` renders nothing.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            ForeignKeyRule::None => None,
            ForeignKeyRule::Cascade => Some("CASCADE"),
            ForeignKeyRule::SetNull => Some("SET NULL"),
            ForeignKeyRule::SetDefault => Some("SET DEFAULT"),
        }
    }
}

/// Foreign key from `foreign_table(foreign_columns)` to
/// `primary_table(primary_columns)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub name: Option<String>,
    pub foreign_schema: Option<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub primary_schema: Option<String>,
    pub primary_table: String,
    pub primary_columns: Vec<String>,
    pub on_delete: ForeignKeyRule,
    pub on_update: ForeignKeyRule,
}

impl ForeignKeyDefinition {
    /// Explicit name, or `FK_<table>_<cols>_<reftable>_<refcols>`.
    pub fn effective_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => conventions::foreign_key_name(
                &self.foreign_table,
                &self.foreign_columns,
                &self.primary_table,
                &self.primary_columns,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            ConstraintKind::Unique => write!(f, "UNIQUE"),
        }
    }
}

/// Dialect-specific constraint options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintExtensions {
    /// SQL Server `CLUSTERED` / `NONCLUSTERED`.
    pub clustered: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintDefinition {
    pub kind: ConstraintKind,
    pub name: Option<String>,
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub extensions: ConstraintExtensions,
}

impl ConstraintDefinition {
    pub fn new(kind: ConstraintKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            name: None,
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            extensions: ConstraintExtensions::default(),
        }
    }

    /// Explicit name, or `PK_<table>_<cols>` / `UC_<table>_<cols>`.
    pub fn effective_name(&self) -> String {
        match (&self.name, self.kind) {
            (Some(name), _) => name.clone(),
            (None, ConstraintKind::PrimaryKey) => {
                conventions::primary_key_name(&self.table, &self.columns)
            }
            (None, ConstraintKind::Unique) => {
                conventions::unique_constraint_name(&self.table, &self.columns)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceDefinition {
    pub name: String,
    pub schema: Option<String>,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub start_with: Option<i64>,
    pub cache: Option<i64>,
    pub cycle: bool,
}
