//! `CREATE TABLE` generation from entity schemas.

use rev_core::enums::ConstraintKind;
use rev_core::schema::{AttributeDef, Constraint, EntitySchema};
use serde_json::Value;

use crate::helpers::quote_ident;

/// `CREATE TABLE IF NOT EXISTS` statement for `schema`.
///
/// Reopening a file-backed database and registering the same schema again
/// keeps the existing table and its rows.
#[must_use]
pub fn create_table(schema: &EntitySchema) -> String {
    let columns: Vec<String> = schema.attributes.iter().map(column_def).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(&schema.table),
        columns.join(",\n    ")
    )
}

fn column_def(attr: &AttributeDef) -> String {
    let mut parts = vec![quote_ident(&attr.field), attr.column_type.sql_type().to_string()];

    if attr.has(ConstraintKind::PrimaryKey) {
        parts.push("PRIMARY KEY".into());
        // AUTOINCREMENT is only legal directly after INTEGER PRIMARY KEY.
        if attr.has(ConstraintKind::AutoIncrement) {
            parts.push("AUTOINCREMENT".into());
        }
    }
    if !attr.allow_null {
        parts.push("NOT NULL".into());
    }
    for constraint in &attr.constraints {
        match constraint {
            Constraint::Unique => parts.push("UNIQUE".into()),
            Constraint::DefaultValue(value) => parts.push(format!("DEFAULT {}", literal(value))),
            Constraint::Computed(expr) => parts.push(format!("DEFAULT ({expr})")),
            Constraint::References { table, column } => parts.push(format!(
                "REFERENCES {}({})",
                quote_ident(table),
                quote_ident(column)
            )),
            Constraint::PrimaryKey | Constraint::AutoIncrement => {}
        }
    }
    parts.join(" ")
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(b) => i64::from(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_text(s),
        Value::Array(_) | Value::Object(_) => quote_text(&value.to_string()),
    }
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rev_core::enums::ColumnType;
    use serde_json::json;

    #[test]
    fn surrogate_key_column() {
        assert_eq!(
            column_def(&AttributeDef::surrogate_key("id")),
            "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"
        );
    }

    #[test]
    fn defaults_and_references() {
        let attr = AttributeDef::new("status", ColumnType::Text)
            .constraint(Constraint::DefaultValue(json!("it's open")))
            .constraint(Constraint::References {
                table: "statuses".into(),
                column: "name".into(),
            });
        assert_eq!(
            column_def(&attr),
            "\"status\" TEXT DEFAULT 'it''s open' REFERENCES \"statuses\"(\"name\")"
        );
    }

    #[test]
    fn create_table_lists_columns_in_order() {
        let schema = EntitySchema::new("Task", "tasks", "id")
            .attribute(AttributeDef::surrogate_key("id"))
            .attribute(
                AttributeDef::new("updated_at", ColumnType::Text)
                    .constraint(Constraint::Computed("CURRENT_TIMESTAMP".into())),
            );
        assert_eq!(
            create_table(&schema),
            "CREATE TABLE IF NOT EXISTS \"tasks\" (\n    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\n    \"updated_at\" TEXT DEFAULT (CURRENT_TIMESTAMP)\n)"
        );
    }
}
