//! Snapshots that match declared entities exactly.
//!
//! Names are folded the way the server stores them.

use keel_db_schema::{ColumnSnapshot, EntityDescriptor, FkSnapshot, IntrospectedSchema, TableSnapshot};
use keel_sql::{folded_identifier, foreign_key_name};

/// The snapshot a database would report after creating `descriptor`.
pub fn snapshot_of(descriptor: &EntityDescriptor) -> TableSnapshot {
    let mut table = TableSnapshot::default();

    for (property, col) in &descriptor.columns {
        let is_vector = descriptor.is_vector_property(property);
        table.columns.push(ColumnSnapshot {
            name: folded_identifier(&col.name),
            data_type: if is_vector {
                "vector".to_string()
            } else {
                col.sql_type.to_string()
            },
            is_nullable: col.is_nullable,
            default_expression: col.default_expression.clone(),
            is_unique: col.is_unique,
        });
        if col.is_unique {
            table.unique_columns.insert(folded_identifier(&col.name));
        }
    }

    table.primary_key = descriptor
        .primary_key_columns()
        .into_iter()
        .map(folded_identifier)
        .collect();

    for fk in descriptor.resolved_foreign_keys().unwrap() {
        table.foreign_keys.push(FkSnapshot {
            constraint_name: folded_identifier(&foreign_key_name(&descriptor.table_name, fk.column)),
            column: folded_identifier(fk.column),
            referenced_table: folded_identifier(fk.referenced_table),
            referenced_column: folded_identifier(fk.referenced_column),
        });
    }

    table
}

/// A schema holding exactly the given tables.
pub fn schema_of(descriptors: &[&EntityDescriptor]) -> IntrospectedSchema {
    let mut schema = IntrospectedSchema::new();
    for d in descriptors {
        schema.tables.insert(folded_identifier(&d.table_name), snapshot_of(d));
    }
    schema
}
