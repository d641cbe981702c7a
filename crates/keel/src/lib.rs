//! Reconcile declared entities with a live Postgres schema.
//!
//! keel compares the tables your application declares with the tables a
//! database actually has, and writes the SQL that closes the gap. It only ever
//! adds: missing tables, missing columns, nullability and type changes, vector
//! columns, and foreign keys. It never drops or renames anything.
//!
//! # Declaring entities
//!
//! ```ignore
//! use keel::{ColumnDescriptor, Entity, EntityBuilder, EntityDef, EntityDescriptor};
//!
//! struct Post;
//!
//! impl Entity for Post {
//!     fn descriptor() -> EntityDescriptor {
//!         EntityBuilder::new("post")
//!             .column("id", ColumnDescriptor::of::<i64>("id").primary_key())
//!             .column("title", ColumnDescriptor::of::<String>("title"))
//!             .column("authorId", ColumnDescriptor::of::<i64>("author_id"))
//!             .foreign_key("authorId", "author", "id")
//!             .build()
//!     }
//! }
//!
//! keel::inventory::submit! { EntityDef::new::<Post>() }
//! ```
//!
//! # Migrating
//!
//! ```ignore
//! let registry = keel::EntityRegistry::collect()?;
//! let report = keel::SchemaSync::new(&registry, keel::SyncOptions::new())
//!     .run(&mut client)
//!     .await?;
//! ```
//!
//! Or, to drive the transaction yourself:
//!
//! ```ignore
//! let tx = client.transaction().await?;
//! let current = keel::introspect(&tx, "public").await?;
//! let script = keel::generate_migration_sql(registry.descriptors(), &current)?;
//! tx.batch_execute(&script).await?;
//! tx.commit().await?;
//! ```
//!
//! Everything between the snapshot and the script is pure; see [`migrate`]
//! for the script layout.

mod alter;
mod create;
mod error;
pub mod fk_graph;
pub mod introspect;
pub mod migrate;
mod sync;
mod traced;

#[cfg(test)]
mod test_support;

pub use alter::{Change, TableDiff, diff_table, generate_alter_table};
pub use create::generate_create_table;
pub use error::Error;
pub use fk_graph::FkCycle;
pub use introspect::introspect;
pub use migrate::{EXTENSION_BOOTSTRAP, MigrationPlan, generate_migration_sql, plan_migration};
pub use sync::{SchemaSync, SyncOptions, SyncReport};
pub use traced::{Connection, ConnectionExt, TracedConn};

pub use keel_db_schema::{
    ColumnDescriptor, ColumnSnapshot, ColumnType, ConfigError, Entity, EntityBuilder, EntityDef,
    EntityDescriptor, EntityRegistry, FkSnapshot, ForeignKeyDescriptor, IndexSnapshot,
    IntrospectedSchema, SqlType, TableSnapshot, TypeHint, VectorColumnDescriptor,
};
pub use keel_sql::{
    DefaultKind, classify_default, escape_string_literal, quote_identifier,
    unescape_string_literal,
};

// Re-exported so `inventory::submit!` works without a direct dependency.
pub use inventory;

pub type Result<T, E = Error> = std::result::Result<T, E>;
