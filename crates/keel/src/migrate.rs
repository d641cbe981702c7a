//! Migration script generation.
//!
//! A script is built in two passes over the declared entities:
//!
//! 1. Structure: tables missing from the database are created without their
//!    foreign keys; existing tables get their missing columns, nullability
//!    and type changes, and missing vector columns.
//! 2. Foreign keys: every declared foreign key the database lacks is added as
//!    a deferred constraint, once every table it could reference exists.
//!
//! ```text
//! CREATE EXTENSION IF NOT EXISTS vector;
//!
//! -- First pass: Create all tables without foreign keys
//! CREATE TABLE post (
//!     ...
//! );
//!
//! -- Second pass: Add foreign key constraints
//! ALTER TABLE post ADD CONSTRAINT fk_post_author_id FOREIGN KEY (author_id) REFERENCES author(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED;
//! ```
//!
//! Generation is pure: the snapshot is taken by the caller, and nothing here
//! touches the database.

use crate::Result;
use crate::alter::{Change, diff_foreign_keys, diff_table};
use crate::create::generate_create_table;
use crate::fk_graph::{FkCycle, find_cycles};
use keel_db_schema::{EntityDescriptor, IntrospectedSchema, TableSnapshot};
use keel_sql::quote_identifier;

/// First line of every script.
pub const EXTENSION_BOOTSTRAP: &str = "CREATE EXTENSION IF NOT EXISTS vector;";

const STRUCTURE_HEADER: &str = "-- First pass: Create all tables without foreign keys";
const FOREIGN_KEY_HEADER: &str = "-- Second pass: Add foreign key constraints";
const DEFERRED_CASCADE: &str = "ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED";

/// The statements of a migration, grouped by pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// One entry per changed table: a `CREATE TABLE` (followed by its vector
    /// columns) or the table's `ALTER TABLE` statements.
    pub structure: Vec<String>,
    /// One `ADD CONSTRAINT` statement per missing foreign key.
    pub foreign_keys: Vec<String>,
    /// Foreign-key cycles among the declared tables that this plan adds at
    /// least one link of.
    pub cycles: Vec<FkCycle>,
}

impl MigrationPlan {
    /// True when the database already matches the declared entities.
    pub fn is_empty(&self) -> bool {
        self.structure.is_empty() && self.foreign_keys.is_empty()
    }

    /// Number of entries across both passes.
    pub fn statement_count(&self) -> usize {
        self.structure.len() + self.foreign_keys.len()
    }

    /// Render the full script.
    ///
    /// An empty plan renders as the extension bootstrap line alone. Pass
    /// headers are only written for passes that have statements.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from(EXTENSION_BOOTSTRAP);
        sql.push('\n');

        if !self.structure.is_empty() {
            sql.push('\n');
            sql.push_str(STRUCTURE_HEADER);
            sql.push('\n');
            sql.push_str(&self.structure.join("\n\n"));
            sql.push('\n');
        }

        if !self.foreign_keys.is_empty() {
            sql.push('\n');
            sql.push_str(FOREIGN_KEY_HEADER);
            sql.push('\n');
            for cycle in &self.cycles {
                sql.push_str(&format!("-- Circular foreign keys: {}\n", cycle));
            }
            for statement in &self.foreign_keys {
                sql.push_str(statement);
                sql.push('\n');
            }
        }

        sql.trim_end().to_string()
    }
}

/// Plan the migration from `current` to the declared `descriptors`.
///
/// Entities are processed in the order given. Fails without producing
/// anything if any descriptor is malformed.
pub fn plan_migration<'a, I>(descriptors: I, current: &IntrospectedSchema) -> Result<MigrationPlan>
where
    I: IntoIterator<Item = &'a EntityDescriptor>,
{
    let descriptors: Vec<&EntityDescriptor> = descriptors.into_iter().collect();
    for descriptor in &descriptors {
        descriptor.validate()?;
    }

    let mut plan = MigrationPlan::default();

    for descriptor in &descriptors {
        let table = descriptor.table_name.as_str();
        match current.get_table(table) {
            None => {
                tracing::debug!(table, "table missing, creating");
                plan.structure.push(generate_create_table(descriptor, false)?);
            }
            Some(snapshot) => {
                let diff = diff_table(descriptor, snapshot, false)?;
                if diff.is_empty() {
                    tracing::debug!(table, "table up to date");
                } else {
                    tracing::debug!(table, changes = diff.changes.len(), "altering table\n{}", diff);
                    plan.structure.push(diff.to_sql());
                }
            }
        }
    }

    let missing = TableSnapshot::default();
    let mut added: Vec<(&str, String)> = Vec::new();
    for descriptor in &descriptors {
        if descriptor.foreign_keys.is_empty() {
            continue;
        }
        let table = descriptor.table_name.as_str();
        let snapshot = current.get_table(table).unwrap_or(&missing);
        let foreign_keys = descriptor.resolved_foreign_keys()?;
        for change in diff_foreign_keys(&foreign_keys, snapshot) {
            tracing::debug!(table, "{}", change);
            if let Change::AddForeignKey { referenced_table, .. } = &change {
                added.push((table, referenced_table.clone()));
            }
            plan.foreign_keys.push(format!(
                "ALTER TABLE {} {} {};",
                quote_identifier(table),
                change.clause(table),
                DEFERRED_CASCADE
            ));
        }
    }

    plan.cycles = find_cycles(&descriptors)
        .into_iter()
        .filter(|cycle| added.iter().any(|(from, to)| cycle.contains_edge(from, to)))
        .collect();
    for cycle in &plan.cycles {
        tracing::info!(%cycle, "circular foreign keys, relying on deferred constraints");
    }

    Ok(plan)
}

/// Generate the migration script from `current` to the declared
/// `descriptors`.
///
/// With nothing to change the script is exactly
/// `CREATE EXTENSION IF NOT EXISTS vector;`.
pub fn generate_migration_sql<'a, I>(descriptors: I, current: &IntrospectedSchema) -> Result<String>
where
    I: IntoIterator<Item = &'a EntityDescriptor>,
{
    Ok(plan_migration(descriptors, current)?.to_sql())
}
