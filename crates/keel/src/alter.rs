//! Diffing a declared entity against an existing table.
//!
//! [`diff_table`] compares one [`EntityDescriptor`] with the [`TableSnapshot`]
//! of the table it describes and returns the additive changes needed to make
//! the table match. Nothing is ever dropped or renamed: columns present in the
//! database but not declared are left alone, and unique constraints and
//! defaults of existing columns are not re-checked.
//!
//! ```text
//! post:
//!   + bio: text (nullable)
//!   ~ title: nullable -> not null
//!   + FOREIGN KEY (author_id) -> author.id
//! ```

use crate::Result;
use crate::create::{add_vector_column_sql, column_definition};
use keel_db_schema::{
    ColumnDescriptor, EntityDescriptor, ResolvedForeignKey, ResolvedVectorColumn, SqlType,
    TableSnapshot,
};
use keel_sql::{foreign_key_name, quote_identifier};
use std::fmt;

/// A single additive change to an existing table.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Add a declared column the table lacks.
    AddColumn(ColumnDescriptor),
    /// Change a column's nullability. `to` is true for nullable.
    AlterColumnNullable { name: String, from: bool, to: bool },
    /// Change a column's type. `from` is the type the catalog reported.
    AlterColumnType {
        name: String,
        from: String,
        to: SqlType,
    },
    /// Add a foreign-key constraint on one column.
    AddForeignKey {
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
    /// Add a vector column.
    AddVectorColumn { name: String, dimensions: u32 },
}

impl Change {
    /// Whether this change is a clause of the batched column statement.
    pub fn is_column_change(&self) -> bool {
        matches!(
            self,
            Change::AddColumn(_)
                | Change::AlterColumnNullable { .. }
                | Change::AlterColumnType { .. }
        )
    }

    /// The text following `ALTER TABLE <table> `.
    pub(crate) fn clause(&self, table_name: &str) -> String {
        match self {
            Change::AddColumn(col) => format!("ADD COLUMN {}", column_definition(col)),
            Change::AlterColumnNullable { name, to, .. } => {
                let action = if *to { "DROP NOT NULL" } else { "SET NOT NULL" };
                format!("ALTER COLUMN {} {}", quote_identifier(name), action)
            }
            Change::AlterColumnType { name, to, .. } => {
                let col = quote_identifier(name);
                format!("ALTER COLUMN {} TYPE {} USING {}::{}", col, to, col, to)
            }
            Change::AddForeignKey {
                column,
                referenced_table,
                referenced_column,
            } => format!(
                "ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
                quote_identifier(&foreign_key_name(table_name, column)),
                quote_identifier(column),
                quote_identifier(referenced_table),
                quote_identifier(referenced_column),
            ),
            Change::AddVectorColumn { name, dimensions } => {
                format!("ADD COLUMN {} vector({})", quote_identifier(name), dimensions)
            }
        }
    }

    /// Generate a standalone SQL statement for this change.
    pub fn to_sql(&self, table_name: &str) -> String {
        match self {
            Change::AddVectorColumn { name, dimensions } => add_vector_column_sql(
                table_name,
                &ResolvedVectorColumn {
                    column: name,
                    dimensions: *dimensions,
                },
            ),
            _ => format!(
                "ALTER TABLE {} {};",
                quote_identifier(table_name),
                self.clause(table_name)
            ),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::AddColumn(col) => {
                let nullable = if col.is_nullable { " (nullable)" } else { "" };
                write!(f, "+ {}: {}{}", col.name, col.sql_type, nullable)
            }
            Change::AlterColumnNullable { name, from, to } => {
                let from_str = if *from { "nullable" } else { "not null" };
                let to_str = if *to { "nullable" } else { "not null" };
                write!(f, "~ {}: {} -> {}", name, from_str, to_str)
            }
            Change::AlterColumnType { name, from, to } => {
                write!(f, "~ {}: {} -> {}", name, from, to)
            }
            Change::AddForeignKey {
                column,
                referenced_table,
                referenced_column,
            } => write!(
                f,
                "+ FOREIGN KEY ({}) -> {}.{}",
                column, referenced_table, referenced_column
            ),
            Change::AddVectorColumn { name, dimensions } => {
                write!(f, "+ {}: vector({})", name, dimensions)
            }
        }
    }
}

/// Changes for a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    pub table: String,
    pub changes: Vec<Change>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Render the changes as SQL statements, one per line.
    ///
    /// Column changes are batched into a single `ALTER TABLE` statement;
    /// each foreign key and each vector column gets its own. Empty when there
    /// are no changes.
    pub fn to_sql(&self) -> String {
        let mut statements = Vec::new();

        let column_clauses: Vec<String> = self
            .changes
            .iter()
            .filter(|c| c.is_column_change())
            .map(|c| c.clause(&self.table))
            .collect();
        if !column_clauses.is_empty() {
            statements.push(format!(
                "ALTER TABLE {} {};",
                quote_identifier(&self.table),
                column_clauses.join(", ")
            ));
        }

        statements.extend(
            self.changes
                .iter()
                .filter(|c| matches!(c, Change::AddForeignKey { .. }))
                .map(|c| c.to_sql(&self.table)),
        );
        statements.extend(
            self.changes
                .iter()
                .filter(|c| matches!(c, Change::AddVectorColumn { .. }))
                .map(|c| c.to_sql(&self.table)),
        );

        statements.join("\n")
    }
}

impl fmt::Display for TableDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.table)?;
        for change in &self.changes {
            writeln!(f, "  {}", change)?;
        }
        Ok(())
    }
}

/// Compare a declared entity with the live table it maps to.
///
/// Foreign keys are compared by `(column, referenced table, referenced
/// column)`, not by constraint name, and only when `include_foreign_keys` is
/// set.
pub fn diff_table(
    descriptor: &EntityDescriptor,
    current: &TableSnapshot,
    include_foreign_keys: bool,
) -> Result<TableDiff> {
    let foreign_keys = descriptor.resolved_foreign_keys()?;
    let vector_columns = descriptor.resolved_vector_columns()?;

    let mut changes = diff_columns(descriptor, current);
    if include_foreign_keys {
        changes.extend(diff_foreign_keys(&foreign_keys, current));
    }
    changes.extend(
        vector_columns
            .iter()
            .filter(|v| !current.has_column(v.column))
            .map(|v| Change::AddVectorColumn {
                name: v.column.to_string(),
                dimensions: v.dimensions,
            }),
    );

    Ok(TableDiff {
        table: descriptor.table_name.clone(),
        changes,
    })
}

fn diff_columns(descriptor: &EntityDescriptor, current: &TableSnapshot) -> Vec<Change> {
    let mut changes = Vec::new();

    for desired in descriptor.plain_columns() {
        let Some(existing) = current.column(&desired.name) else {
            changes.push(Change::AddColumn(desired.clone()));
            continue;
        };

        if desired.is_nullable != existing.is_nullable {
            changes.push(Change::AlterColumnNullable {
                name: desired.name.clone(),
                from: existing.is_nullable,
                to: desired.is_nullable,
            });
        }

        if !desired.sql_type.matches(&existing.data_type) {
            changes.push(Change::AlterColumnType {
                name: desired.name.clone(),
                from: existing.data_type.clone(),
                to: desired.sql_type.clone(),
            });
        }
    }

    changes
}

pub(crate) fn diff_foreign_keys(
    desired: &[ResolvedForeignKey<'_>],
    current: &TableSnapshot,
) -> Vec<Change> {
    desired
        .iter()
        .filter(|fk| !current.has_foreign_key(fk.column, fk.referenced_table, fk.referenced_column))
        .map(|fk| Change::AddForeignKey {
            column: fk.column.to_string(),
            referenced_table: fk.referenced_table.to_string(),
            referenced_column: fk.referenced_column.to_string(),
        })
        .collect()
}

/// Generate the `ALTER TABLE` statements that bring `current` in line with
/// `descriptor`, foreign keys included.
///
/// Returns an empty string when the table already matches.
pub fn generate_alter_table(descriptor: &EntityDescriptor, current: &TableSnapshot) -> Result<String> {
    let diff = diff_table(descriptor, current, true)?;
    if !diff.is_empty() {
        tracing::debug!(table = %diff.table, changes = diff.changes.len(), "generated ALTER TABLE");
    }
    Ok(diff.to_sql())
}
