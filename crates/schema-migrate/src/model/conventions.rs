//! Deterministic names for unnamed constraints, indexes and defaults.

fn join<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join("_")
}

/// Name of a primary key declared on a column: `PK_<table>`.
pub fn column_primary_key_name(table: &str) -> String {
    format!("PK_{}", table)
}

/// `PK_<table>_<cols>`
pub fn primary_key_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!("PK_{}_{}", table, join(columns))
}

/// `UC_<table>_<cols>`
pub fn unique_constraint_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!("UC_{}_{}", table, join(columns))
}

/// `FK_<table>_<cols>_<reftable>_<refcols>`
pub fn foreign_key_name<S: AsRef<str>>(
    table: &str,
    columns: &[S],
    referenced_table: &str,
    referenced_columns: &[S],
) -> String {
    format!(
        "FK_{}_{}_{}_{}",
        table,
        join(columns),
        referenced_table,
        join(referenced_columns)
    )
}

/// `IX_<table>_<cols>`
pub fn index_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!("IX_{}_{}", table, join(columns))
}

/// `DF_<table>_<column>`
pub fn default_constraint_name(table: &str, column: &str) -> String {
    format!("DF_{}_{}", table, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(column_primary_key_name("Example"), "PK_Example");
        assert_eq!(primary_key_name("Order", &["Id", "Line"]), "PK_Order_Id_Line");
        assert_eq!(unique_constraint_name("User", &["Email"]), "UC_User_Email");
        assert_eq!(
            foreign_key_name("Order", &["CustomerId"], "Customer", &["Id"]),
            "FK_Order_CustomerId_Customer_Id"
        );
        assert_eq!(index_name("User", &["Last", "First"]), "IX_User_Last_First");
        assert_eq!(default_constraint_name("User", "Created"), "DF_User_Created");
    }
}
