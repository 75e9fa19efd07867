//! Identifier validation and the per-dialect quoting rule table.
//!
//! SQL identifiers (table names, column names, schema names) cannot be passed as
//! parameters, so every generated statement splices them into the text. The
//! generator therefore never concatenates names or literals directly: it goes
//! through a [`QuoteRules`] table describing the dialect's quote characters,
//! escape doubling, Unicode prefix and literal formats.

use crate::core::value::Value;
use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Validate a predicate fragment (index filter) spliced into DDL.
///
/// Filters are single boolean expressions; statement separators and comment
/// markers are rejected.
pub fn validate_predicate(definition: &str) -> Result<()> {
    if definition.trim().is_empty() {
        return Err(MigrateError::Config("Predicate cannot be empty".to_string()));
    }

    if definition.contains(';') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Predicate contains semicolon (possible injection): {:?}",
            definition
        )));
    }

    if definition.contains("--") || definition.contains("/*") || definition.contains("*/") {
        return Err(MigrateError::Config(format!(
            "SECURITY: Predicate contains SQL comment markers (possible injection): {:?}",
            definition
        )));
    }

    Ok(())
}

/// How a dialect writes binary literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryLiteral {
    /// `0x0A0B`
    HexPrefix,
    /// `'\x0a0b'`
    EscapedHex,
    /// `X'0A0B'`
    XString,
}

/// Quoting and literal-formatting rules for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRules {
    pub open_quote: char,
    pub close_quote: char,
    /// Prefix for Unicode string literals (`N` on SQL Server).
    pub unicode_prefix: &'static str,
    /// Whether backslashes inside string literals must be doubled.
    pub escape_backslash: bool,
    pub true_literal: &'static str,
    pub false_literal: &'static str,
    pub null_literal: &'static str,
    pub binary: BinaryLiteral,
    pub datetime_format: &'static str,
    pub datetime_offset_format: &'static str,
    pub date_format: &'static str,
    pub time_format: &'static str,
}

impl QuoteRules {
    pub const SQL_SERVER: QuoteRules = QuoteRules {
        open_quote: '[',
        close_quote: ']',
        unicode_prefix: "N",
        escape_backslash: false,
        true_literal: "1",
        false_literal: "0",
        null_literal: "NULL",
        binary: BinaryLiteral::HexPrefix,
        datetime_format: "%Y-%m-%dT%H:%M:%S",
        datetime_offset_format: "%Y-%m-%dT%H:%M:%S%:z",
        date_format: "%Y-%m-%d",
        time_format: "%H:%M:%S",
    };

    pub const POSTGRES: QuoteRules = QuoteRules {
        open_quote: '"',
        close_quote: '"',
        unicode_prefix: "",
        escape_backslash: false,
        true_literal: "true",
        false_literal: "false",
        null_literal: "NULL",
        binary: BinaryLiteral::EscapedHex,
        datetime_format: "%Y-%m-%dT%H:%M:%S",
        datetime_offset_format: "%Y-%m-%dT%H:%M:%S%:z",
        date_format: "%Y-%m-%d",
        time_format: "%H:%M:%S",
    };

    pub const MYSQL: QuoteRules = QuoteRules {
        open_quote: '`',
        close_quote: '`',
        unicode_prefix: "",
        escape_backslash: true,
        true_literal: "1",
        false_literal: "0",
        null_literal: "NULL",
        binary: BinaryLiteral::XString,
        datetime_format: "%Y-%m-%d %H:%M:%S",
        datetime_offset_format: "%Y-%m-%d %H:%M:%S",
        date_format: "%Y-%m-%d",
        time_format: "%H:%M:%S",
    };

    /// Quote an identifier, doubling any embedded closing quote.
    pub fn quote_ident(&self, name: &str) -> String {
        let close = self.close_quote.to_string();
        let doubled = format!("{}{}", self.close_quote, self.close_quote);
        format!("{}{}{}", self.open_quote, name.replace(&close, &doubled), self.close_quote)
    }

    /// Qualify a name with its schema. No schema yields the bare quoted name.
    pub fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote_ident(schema), self.quote_ident(name)),
            None => self.quote_ident(name),
        }
    }

    /// Quote a string literal. `unicode` selects the dialect's Unicode prefix.
    pub fn quote_string(&self, value: &str, unicode: bool) -> String {
        let mut escaped = value.replace('\'', "''");
        if self.escape_backslash {
            escaped = escaped.replace('\\', "\\\\");
        }
        let prefix = if unicode { self.unicode_prefix } else { "" };
        format!("{}'{}'", prefix, escaped)
    }

    /// Render a literal value.
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => self.null_literal.to_string(),
            Value::Bool(b) => {
                if *b {
                    self.true_literal.to_string()
                } else {
                    self.false_literal.to_string()
                }
            }
            Value::I16(v) => v.to_string(),
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F32(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(s) => self.quote_string(s, true),
            Value::AnsiString(s) => self.quote_string(s, false),
            Value::Bytes(b) => match self.binary {
                BinaryLiteral::HexPrefix => format!("0x{}", hex::encode_upper(b)),
                BinaryLiteral::EscapedHex => format!("'\\x{}'", hex::encode(b)),
                BinaryLiteral::XString => format!("X'{}'", hex::encode_upper(b)),
            },
            Value::Uuid(u) => format!("'{}'", u),
            Value::DateTime(dt) => format!("'{}'", dt.format(self.datetime_format)),
            Value::DateTimeOffset(dt) => format!("'{}'", dt.format(self.datetime_offset_format)),
            Value::Date(d) => format!("'{}'", d.format(self.date_format)),
            Value::Time(t) => format!("'{}'", t.format(self.time_format)),
            Value::RawSql(sql) => sql.clone(),
        }
    }
}
