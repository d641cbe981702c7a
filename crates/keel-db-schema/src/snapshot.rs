//! Point-in-time snapshot of a live schema.

use indexmap::IndexMap;
use keel_sql::folded_identifier;
use std::collections::BTreeSet;

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSnapshot {
    pub name: String,
    /// `information_schema.columns.data_type`, or the underlying type name
    /// for user-defined types such as `vector`
    pub data_type: String,
    pub is_nullable: bool,
    pub default_expression: Option<String>,
    /// Whether a single-column unique constraint covers this column
    pub is_unique: bool,
}

/// A single-column foreign key as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FkSnapshot {
    pub constraint_name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// An index that does not back a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}

/// One table of the live schema.
///
/// Lookups take declared names and fold them the way the server does, so
/// `createdAt` finds the column stored as `createdat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Columns, in ordinal order
    pub columns: Vec<ColumnSnapshot>,
    /// Primary-key columns, in key order
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<FkSnapshot>,
    pub unique_columns: BTreeSet<String>,
    pub indexes: Vec<IndexSnapshot>,
}

impl TableSnapshot {
    pub fn column(&self, name: &str) -> Option<&ColumnSnapshot> {
        let name = folded_identifier(name);
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Whether a foreign key `column -> referenced_table(referenced_column)`
    /// exists, whatever its constraint name.
    pub fn has_foreign_key(
        &self,
        column: &str,
        referenced_table: &str,
        referenced_column: &str,
    ) -> bool {
        let column = folded_identifier(column);
        let referenced_table = folded_identifier(referenced_table);
        let referenced_column = folded_identifier(referenced_column);
        self.foreign_keys.iter().any(|fk| {
            fk.column == column
                && fk.referenced_table == referenced_table
                && fk.referenced_column == referenced_column
        })
    }
}

/// The live schema, keyed by table name.
///
/// Fetched once per migration run and never refreshed, so every decision in a
/// run sees the same observation of the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectedSchema {
    pub tables: IndexMap<String, TableSnapshot>,
}

impl IntrospectedSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(folded_identifier(name).as_str())
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(folded_identifier(name).as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}
