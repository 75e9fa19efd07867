//! Base generation rules shared by every dialect.
//!
//! These are the default bodies of [`Dialect`] methods. Dialect overrides
//! call them directly when they only need to adjust part of a rule.

use super::Dialect;
use crate::core::value::Value;
use crate::error::Result;
use crate::model::conventions;
use crate::model::{
    AlterTableExpression, ColumnDefinition, ColumnType, ConstraintDefinition, ConstraintKind,
    CreateColumnExpression, CreateTableExpression, DataRow, DefaultValue,
    DeleteColumnExpression, DeleteDataExpression, Direction, ForeignKeyDefinition,
    IndexDefinition, InsertDataExpression, SequenceDefinition, UpdateDataExpression,
};

/// Native type for a column, through the dialect's type map.
pub fn column_type<D: Dialect + ?Sized>(d: &D, column: &ColumnDefinition) -> Result<String> {
    match &column.column_type {
        Some(ColumnType::Custom(native)) => Ok(native.clone()),
        Some(ColumnType::Db(db_type)) => d
            .type_map()
            .get(*db_type, column.size, column.precision, column.scale)
            .map_err(|reason| {
                let err = d.unsupported(&format!("column '{}': {}", column.name, reason));
                match d.type_map().ceiling(*db_type) {
                    Some(max) => err.suggest(format!(
                        "use a size of at most {} or a custom native type",
                        max
                    )),
                    None => err,
                }
            }),
        None => Err(d.unsupported(&format!("column '{}' has no type", column.name))),
    }
}

/// Render a default value.
pub fn default_value<D: Dialect + ?Sized>(d: &D, default: &DefaultValue) -> Result<String> {
    match default {
        DefaultValue::Value(value) => Ok(d.format_value(value)),
        DefaultValue::System(method) => d.system_method(*method),
        DefaultValue::RawSql(sql) => Ok(sql.clone()),
    }
}

pub fn column_default<D: Dialect + ?Sized>(
    d: &D,
    _table: &str,
    column: &ColumnDefinition,
) -> Result<Option<String>> {
    match &column.default {
        Some(default) => Ok(Some(format!("DEFAULT {}", default_value(d, default)?))),
        None => Ok(None),
    }
}

pub fn inline_primary_key<D: Dialect + ?Sized>(
    d: &D,
    table: &str,
    column: &ColumnDefinition,
) -> String {
    let name = column
        .primary_key_name
        .clone()
        .unwrap_or_else(|| conventions::column_primary_key_name(table));
    format!("CONSTRAINT {} PRIMARY KEY", d.quote_ident(&name))
}

pub fn column_definition<D: Dialect + ?Sized>(
    d: &D,
    table: &str,
    column: &ColumnDefinition,
    inline_pk: bool,
) -> Result<String> {
    let mut parts = vec![d.quote_ident(&column.name), d.column_type(column)?];

    if let Some(collation) = &column.collation {
        parts.push(format!("COLLATE {}", collation));
    }

    parts.push(if column.is_nullable() { "NULL" } else { "NOT NULL" }.to_string());

    if let Some(default) = d.column_default(table, column)? {
        parts.push(default);
    }

    if let Some(identity) = d.column_identity(column)? {
        parts.push(identity);
    }

    if inline_pk && column.primary_key {
        parts.push(d.inline_primary_key(table, column));
    }

    if column.unique {
        parts.push("UNIQUE".to_string());
    }

    Ok(parts.join(" "))
}

pub fn quoted_list<D: Dialect + ?Sized, S: AsRef<str>>(d: &D, names: &[S]) -> String {
    names
        .iter()
        .map(|n| d.quote_ident(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table-level primary key name: explicit name on any key column, else `PK_<table>`.
pub fn table_primary_key_name(e: &CreateTableExpression) -> String {
    e.columns
        .iter()
        .filter(|c| c.primary_key)
        .find_map(|c| c.primary_key_name.clone())
        .unwrap_or_else(|| conventions::column_primary_key_name(&e.table))
}

/// Column list and trailing primary key constraint of a `CREATE TABLE`.
pub fn table_body<D: Dialect + ?Sized>(
    d: &D,
    e: &CreateTableExpression,
    pk_keyword: &str,
) -> Result<String> {
    let mut defs = Vec::with_capacity(e.columns.len() + 1);
    for column in &e.columns {
        defs.push(d.column_definition(&e.table, column, false)?);
    }

    let pk_columns: Vec<&str> = e
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    if !pk_columns.is_empty() {
        defs.push(format!(
            "CONSTRAINT {} {} ({})",
            d.quote_ident(&table_primary_key_name(e)),
            pk_keyword,
            quoted_list(d, &pk_columns)
        ));
    }

    Ok(defs.join(", "))
}

pub fn create_table<D: Dialect + ?Sized>(d: &D, e: &CreateTableExpression) -> Result<String> {
    let table = d.qualify(e.schema.as_deref(), &e.table);
    let mut statements = vec![format!(
        "CREATE TABLE {} ({});",
        table,
        table_body(d, e, "PRIMARY KEY")?
    )];
    if let Some(description) = &e.description {
        statements.push(format!(
            "COMMENT ON TABLE {} IS {};",
            table,
            d.rules().quote_string(description, false)
        ));
    }
    for column in &e.columns {
        if let Some(description) = &column.description {
            statements.push(format!(
                "COMMENT ON COLUMN {}.{} IS {};",
                table,
                d.quote_ident(&column.name),
                d.rules().quote_string(description, false)
            ));
        }
    }
    Ok(statements.join("\n"))
}

pub fn alter_table<D: Dialect + ?Sized>(d: &D, e: &AlterTableExpression) -> Result<String> {
    let comment = match &e.description {
        Some(description) => d.rules().quote_string(description, false),
        None => "NULL".to_string(),
    };
    Ok(format!(
        "COMMENT ON TABLE {} IS {};",
        d.qualify(e.schema.as_deref(), &e.table),
        comment
    ))
}

pub fn create_column<D: Dialect + ?Sized>(
    d: &D,
    e: &CreateColumnExpression,
    add_keyword: &str,
) -> Result<String> {
    let table = d.qualify(e.schema.as_deref(), &e.table);
    let mut sql = format!(
        "ALTER TABLE {} {} {};",
        table,
        add_keyword,
        d.column_definition(&e.table, &e.column, true)?
    );
    if let Some(description) = &e.column.description {
        sql.push_str(&format!(
            "\nCOMMENT ON COLUMN {}.{} IS {};",
            table,
            d.quote_ident(&e.column.name),
            d.rules().quote_string(description, false)
        ));
    }
    Ok(sql)
}

pub fn delete_column<D: Dialect + ?Sized>(d: &D, e: &DeleteColumnExpression) -> Result<String> {
    let table = d.qualify(e.schema.as_deref(), &e.table);
    Ok(e.columns
        .iter()
        .map(|c| format!("ALTER TABLE {} DROP COLUMN {};", table, d.quote_ident(c)))
        .collect::<Vec<_>>()
        .join("\n"))
}

pub fn create_foreign_key<D: Dialect + ?Sized>(
    d: &D,
    fk: &ForeignKeyDefinition,
) -> Result<String> {
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        d.qualify(fk.foreign_schema.as_deref(), &fk.foreign_table),
        d.quote_ident(&fk.effective_name()),
        quoted_list(d, &fk.foreign_columns),
        d.qualify(fk.primary_schema.as_deref(), &fk.primary_table),
        quoted_list(d, &fk.primary_columns)
    );
    if let Some(rule) = fk.on_delete.keyword() {
        sql.push_str(&format!(" ON DELETE {}", rule));
    }
    if let Some(rule) = fk.on_update.keyword() {
        sql.push_str(&format!(" ON UPDATE {}", rule));
    }
    sql.push(';');
    Ok(sql)
}

pub fn index_columns<D: Dialect + ?Sized>(d: &D, index: &IndexDefinition) -> String {
    index
        .columns
        .iter()
        .map(|c| {
            let dir = match c.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            format!("{} {}", d.quote_ident(&c.name), dir)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE [UNIQUE ]<modifier>INDEX ...` with INCLUDE and WHERE when present.
pub fn create_index<D: Dialect + ?Sized>(
    d: &D,
    index: &IndexDefinition,
    modifier: &str,
) -> Result<String> {
    if index.extensions.clustered.is_some() {
        return Err(d
            .unsupported("clustered indexes are not supported")
            .suggest("omit the clustered option"));
    }
    if index.extensions.method.is_some() {
        return Err(d.unsupported("index access methods are not supported"));
    }
    render_index(d, index, modifier, None)
}

/// Shared index text; `using` renders a PostgreSQL-style access method.
pub fn render_index<D: Dialect + ?Sized>(
    d: &D,
    index: &IndexDefinition,
    modifier: &str,
    using: Option<&str>,
) -> Result<String> {
    let mut sql = format!(
        "CREATE {}{}INDEX {} ON {}",
        if index.unique { "UNIQUE " } else { "" },
        modifier,
        d.quote_ident(&index.effective_name()),
        d.qualify(index.schema.as_deref(), &index.table)
    );
    if let Some(method) = using {
        sql.push_str(&format!(" USING {}", method));
    }
    sql.push_str(&format!(" ({})", index_columns(d, index)));
    if !index.extensions.include.is_empty() {
        sql.push_str(&format!(
            " INCLUDE ({})",
            quoted_list(d, &index.extensions.include)
        ));
    }
    if let Some(filter) = &index.extensions.filter {
        sql.push_str(&format!(" WHERE {}", filter));
    }
    sql.push(';');
    Ok(sql)
}

/// `ALTER TABLE ... ADD CONSTRAINT name PRIMARY KEY|UNIQUE<modifier> (...)`.
pub fn create_constraint<D: Dialect + ?Sized>(
    d: &D,
    c: &ConstraintDefinition,
    modifier: &str,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {}{} ({});",
        d.qualify(c.schema.as_deref(), &c.table),
        d.quote_ident(&c.effective_name()),
        match c.kind {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
        },
        modifier,
        quoted_list(d, &c.columns)
    ))
}

pub fn create_sequence<D: Dialect + ?Sized>(d: &D, s: &SequenceDefinition) -> Result<String> {
    let mut sql = format!("CREATE SEQUENCE {}", d.qualify(s.schema.as_deref(), &s.name));
    if let Some(increment) = s.increment {
        sql.push_str(&format!(" INCREMENT BY {}", increment));
    }
    if let Some(min) = s.min_value {
        sql.push_str(&format!(" MINVALUE {}", min));
    }
    if let Some(max) = s.max_value {
        sql.push_str(&format!(" MAXVALUE {}", max));
    }
    if let Some(start) = s.start_with {
        sql.push_str(&format!(" START WITH {}", start));
    }
    if let Some(cache) = s.cache {
        sql.push_str(&format!(" CACHE {}", cache));
    }
    if s.cycle {
        sql.push_str(" CYCLE");
    }
    sql.push(';');
    Ok(sql)
}

/// `a = 1 AND b IS NULL`
pub fn where_clause<D: Dialect + ?Sized>(d: &D, row: &DataRow) -> String {
    row.iter()
        .map(|(column, value)| match value {
            Value::Null => format!("{} IS NULL", d.quote_ident(column)),
            _ => format!("{} = {}", d.quote_ident(column), d.format_value(value)),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub fn insert_rows<D: Dialect + ?Sized>(d: &D, e: &InsertDataExpression) -> Vec<String> {
    let table = d.qualify(e.schema.as_deref(), &e.table);
    e.rows
        .iter()
        .map(|row| {
            let columns: Vec<&str> = row.iter().map(|(c, _)| c.as_str()).collect();
            let values = row
                .iter()
                .map(|(_, v)| d.format_value(v))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({});",
                table,
                quoted_list(d, &columns),
                values
            )
        })
        .collect()
}

pub fn insert_data<D: Dialect + ?Sized>(d: &D, e: &InsertDataExpression) -> Result<String> {
    Ok(insert_rows(d, e).join("\n"))
}

pub fn update_data<D: Dialect + ?Sized>(d: &D, e: &UpdateDataExpression) -> Result<String> {
    let set = e
        .set
        .iter()
        .map(|(column, value)| format!("{} = {}", d.quote_ident(column), d.format_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    let filter = if e.all_rows || e.filter.is_empty() {
        "1 = 1".to_string()
    } else {
        where_clause(d, &e.filter)
    };
    Ok(format!(
        "UPDATE {} SET {} WHERE {};",
        d.qualify(e.schema.as_deref(), &e.table),
        set,
        filter
    ))
}

pub fn delete_data<D: Dialect + ?Sized>(d: &D, e: &DeleteDataExpression) -> Result<String> {
    let table = d.qualify(e.schema.as_deref(), &e.table);
    if e.all_rows {
        return Ok(format!("DELETE FROM {};", table));
    }
    Ok(e.rows
        .iter()
        .map(|row| format!("DELETE FROM {} WHERE {};", table, where_clause(d, row)))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// `TABLE_SCHEMA = '...' AND ` for an explicit or default schema, else empty.
pub fn schema_predicate<D: Dialect + ?Sized>(d: &D, schema: Option<&str>, column: &str) -> String {
    match schema.or(d.default_schema()) {
        Some(schema) => format!("{} = {} AND ", column, d.rules().quote_string(schema, false)),
        None => String::new(),
    }
}
