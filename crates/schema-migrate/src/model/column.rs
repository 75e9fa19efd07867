//! Column definitions and the portable type vocabulary.

use std::fmt;

use crate::core::value::Value;

/// Portable logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    String,
    StringFixedLength,
    Binary,
    Boolean,
    Byte,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Single,
    Time,
    Xml,
}

impl DbType {
    /// Types that may carry an identity/auto-increment property.
    pub fn supports_identity(&self) -> bool {
        matches!(
            self,
            DbType::Byte | DbType::Int16 | DbType::Int32 | DbType::Int64 | DbType::Decimal
        )
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A column's type: portable, or a native type string passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Db(DbType),
    Custom(String),
}

/// Database functions usable as column defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemMethod {
    NewGuid,
    NewSequentialId,
    CurrentDateTime,
    CurrentUtcDateTime,
    CurrentDateTimeOffset,
    CurrentUser,
}

impl fmt::Display for SystemMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Column default value.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Literal rendered by the dialect's quoting rules.
    Value(Value),
    /// Native function for the dialect.
    System(SystemMethod),
    /// Unescaped SQL.
    RawSql(String),
}

/// Identity (auto-increment) settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub seed: i64,
    pub increment: i64,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            seed: 1,
            increment: 1,
        }
    }
}

impl Identity {
    pub fn is_default(&self) -> bool {
        self.seed == 1 && self.increment == 1
    }
}

/// SQL Server column options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlServerColumnOptions {
    /// Emit `PRIMARY KEY CLUSTERED` / `NONCLUSTERED` when set.
    pub primary_key_clustered: Option<bool>,
}

/// PostgreSQL column options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostgresColumnOptions {
    /// `GENERATED ALWAYS AS IDENTITY` instead of `BY DEFAULT`.
    pub identity_always: bool,
}

/// Typed per-dialect column extensions, checked at generation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnExtensions {
    pub sql_server: SqlServerColumnOptions,
    pub postgres: PostgresColumnOptions,
}

/// One column as declared by a migration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnDefinition {
    pub name: String,
    pub table_name: String,
    pub column_type: Option<ColumnType>,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    /// `None` renders as `NOT NULL`.
    pub nullable: Option<bool>,
    pub default: Option<DefaultValue>,
    pub primary_key: bool,
    pub primary_key_name: Option<String>,
    pub identity: Option<Identity>,
    pub unique: bool,
    pub collation: Option<String>,
    pub description: Option<String>,
    pub extensions: ColumnExtensions,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set a portable type.
    pub fn with_type(mut self, db_type: DbType) -> Self {
        self.column_type = Some(ColumnType::Db(db_type));
        self
    }

    pub fn db_type(&self) -> Option<DbType> {
        match &self.column_type {
            Some(ColumnType::Db(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable == Some(true) && !self.primary_key
    }

    /// Structural problems with this column, in declaration terms.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.is_empty() {
            problems.push("column name is required".to_string());
        }
        match &self.column_type {
            None => problems.push(format!("column '{}' has no type", self.name)),
            Some(ColumnType::Custom(t)) if t.trim().is_empty() => {
                problems.push(format!("column '{}' has an empty custom type", self.name))
            }
            _ => {}
        }
        if self.identity.is_some() {
            match &self.column_type {
                Some(ColumnType::Db(t)) if !t.supports_identity() => problems.push(format!(
                    "identity column '{}' must be numeric, got {}",
                    self.name, t
                )),
                _ => {}
            }
            if let Some(Identity { increment: 0, .. }) = self.identity {
                problems.push(format!("identity column '{}' has increment 0", self.name));
            }
        }
        if let (Some(p), Some(s)) = (self.precision, self.scale) {
            if s > p {
                problems.push(format!(
                    "column '{}' scale {} exceeds precision {}",
                    self.name, s, p
                ));
            }
        }
        if self.primary_key && self.nullable == Some(true) {
            problems.push(format!("primary key column '{}' cannot be nullable", self.name));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_numeric() {
        let mut col = ColumnDefinition::new("Code").with_type(DbType::String);
        col.identity = Some(Identity::default());
        let problems = col.problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("must be numeric"));

        col.column_type = Some(ColumnType::Db(DbType::Int64));
        assert!(col.problems().is_empty());
    }

    #[test]
    fn test_untyped_column_is_a_problem() {
        let col = ColumnDefinition::new("Name");
        assert!(col.problems()[0].contains("has no type"));
    }

    #[test]
    fn test_primary_key_is_never_nullable() {
        let mut col = ColumnDefinition::new("Id").with_type(DbType::Int32);
        col.primary_key = true;
        assert!(!col.is_nullable());
        col.nullable = Some(true);
        assert!(!col.problems().is_empty());
    }
}
