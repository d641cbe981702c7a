//! `CREATE TABLE` generation.

use crate::Result;
use keel_db_schema::{ColumnDescriptor, EntityDescriptor, ResolvedForeignKey, ResolvedVectorColumn};
use keel_sql::{classify_default_expr, escape_string_literal, foreign_key_name, quote_identifier};

/// Generate the `CREATE TABLE` statement for an entity.
///
/// Vector columns are left out of the table body and added by one
/// `ALTER TABLE ... ADD COLUMN ... vector(n);` statement each, following the
/// `CREATE TABLE`. Foreign-key constraints are inlined only when
/// `include_foreign_keys` is set; the migration script adds them in a later
/// pass instead.
///
/// Fails if a foreign key or vector column names a property that has no
/// column.
pub fn generate_create_table(
    descriptor: &EntityDescriptor,
    include_foreign_keys: bool,
) -> Result<String> {
    let foreign_keys = descriptor.resolved_foreign_keys()?;
    let vector_columns = descriptor.resolved_vector_columns()?;
    let table = &descriptor.table_name;

    let mut parts: Vec<String> = descriptor.plain_columns().map(column_definition).collect();

    let pk = descriptor.primary_key_columns();
    if !pk.is_empty() {
        let cols: Vec<String> = pk.iter().map(|c| quote_identifier(c)).collect();
        parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    if include_foreign_keys {
        parts.extend(foreign_keys.iter().map(|fk| foreign_key_clause(table, fk)));
    }

    let body: Vec<String> = parts.iter().map(|p| format!("    {}", p)).collect();
    let mut sql = format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_identifier(table),
        body.join(",\n")
    );

    for vector in &vector_columns {
        sql.push('\n');
        sql.push_str(&add_vector_column_sql(table, vector));
    }

    tracing::debug!(
        table = %table,
        columns = parts.len(),
        vectors = vector_columns.len(),
        include_foreign_keys,
        "generated CREATE TABLE"
    );
    Ok(sql)
}

/// `name type [NOT NULL] [UNIQUE] [DEFAULT ...]`
pub(crate) fn column_definition(col: &ColumnDescriptor) -> String {
    let mut def = format!("{} {}", quote_identifier(&col.name), col.sql_type);
    if !col.is_nullable {
        def.push_str(" NOT NULL");
    }
    if col.is_unique {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = render_default(col) {
        def.push_str(" DEFAULT ");
        def.push_str(&default);
    }
    def
}

/// Render a column default as a SQL expression.
///
/// Function calls are emitted as written, JSON defaults on `jsonb` columns
/// become `'<json>'::jsonb`, and anything else is a string literal.
pub(crate) fn render_default(col: &ColumnDescriptor) -> Option<String> {
    let expr = col.default_expression.as_deref()?;

    let trimmed = expr.trim();
    if col.sql_type.is_jsonb() && (trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return Some(render_jsonb_default(&col.name, trimmed));
    }

    if classify_default_expr(expr).is_function_call() {
        Some(expr.to_string())
    } else {
        Some(escape_string_literal(expr))
    }
}

fn render_jsonb_default(column: &str, literal: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(literal) {
        Ok(value) => format!("{}::jsonb", escape_string_literal(&value.to_string())),
        Err(err) => {
            let fallback = if literal.starts_with('[') { "[]" } else { "{}" };
            tracing::warn!(
                column,
                literal,
                error = %err,
                fallback,
                "unparseable jsonb default, using empty value"
            );
            format!("{}::jsonb", escape_string_literal(fallback))
        }
    }
}

/// `CONSTRAINT fk_<table>_<column> FOREIGN KEY (column) REFERENCES table(column)`
pub(crate) fn foreign_key_clause(table: &str, fk: &ResolvedForeignKey<'_>) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
        quote_identifier(&foreign_key_name(table, fk.column)),
        quote_identifier(fk.column),
        quote_identifier(fk.referenced_table),
        quote_identifier(fk.referenced_column),
    )
}

pub(crate) fn add_vector_column_sql(table: &str, vector: &ResolvedVectorColumn<'_>) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} vector({});",
        quote_identifier(table),
        quote_identifier(vector.column),
        vector.dimensions
    )
}
