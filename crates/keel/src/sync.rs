//! Applying a migration to a live database.
//!
//! [`SchemaSync`] is the usual way to run keel at startup: it snapshots the
//! schema, generates the script and executes it, all inside one transaction.
//!
//! ```ignore
//! let registry = EntityRegistry::collect()?;
//! let report = SchemaSync::new(&registry, SyncOptions::new())
//!     .run(&mut client)
//!     .await?;
//! if report.applied {
//!     tracing::info!("schema updated");
//! }
//! ```

use crate::migrate::plan_migration;
use crate::traced::ConnectionExt;
use crate::{Error, Result, introspect};
use keel_db_schema::EntityRegistry;
use keel_sql::quote_identifier;
use tracing::Instrument;

/// Settings for a [`SchemaSync`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Schema to introspect and migrate
    pub schema: String,
    /// Generate and log the script without executing it
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            dry_run: false,
        }
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of a [`SchemaSync`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The generated script
    pub script: String,
    /// Whether the script contained any change
    pub changed: bool,
    /// Whether the script was executed and committed
    pub applied: bool,
}

/// Brings a database schema in line with the registered entities.
#[derive(Debug)]
pub struct SchemaSync<'r> {
    registry: &'r EntityRegistry,
    options: SyncOptions,
}

impl<'r> SchemaSync<'r> {
    pub fn new(registry: &'r EntityRegistry, options: SyncOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Snapshot, plan and apply in one transaction.
    ///
    /// The transaction is rolled back when there is nothing to do, on a dry
    /// run, and on any error.
    pub async fn run(&self, client: &mut tokio_postgres::Client) -> Result<SyncReport> {
        let span = tracing::info_span!(
            "keel.sync",
            schema = %self.options.schema,
            dry_run = self.options.dry_run,
            entities = self.registry.len(),
        );
        self.run_inner(client).instrument(span).await
    }

    async fn run_inner(&self, client: &mut tokio_postgres::Client) -> Result<SyncReport> {
        let schema = self.options.schema.as_str();
        let tx = client.transaction().await?;

        for statement in session_statements(schema) {
            tx.traced().batch_execute(&statement).await?;
        }

        let current = introspect(&tx, schema).await?;
        let plan = plan_migration(self.registry.descriptors(), &current)?;
        let script = plan.to_sql();

        if plan.is_empty() {
            tx.rollback().await?;
            tracing::info!("schema is up to date");
            return Ok(SyncReport {
                script,
                changed: false,
                applied: false,
            });
        }

        if self.options.dry_run {
            tx.rollback().await?;
            tracing::info!(statements = plan.statement_count(), "dry run, not applying:\n{}", script);
            return Ok(SyncReport {
                script,
                changed: true,
                applied: false,
            });
        }

        tx.traced()
            .batch_execute(&script)
            .await
            .map_err(Error::Execution)?;
        tx.commit().await.map_err(Error::Execution)?;

        tracing::info!(statements = plan.statement_count(), "schema migrated");
        Ok(SyncReport {
            script,
            changed: true,
            applied: true,
        })
    }
}

/// Statements that prepare the transaction for migrating `schema`.
///
/// For any schema but `public` the extension is installed into `public`
/// before `search_path` points at the target schema, so the script's bare
/// `CREATE EXTENSION` is a no-op there and every tenant resolves `vector`
/// from the same place.
fn session_statements(schema: &str) -> Vec<String> {
    if schema == "public" {
        return Vec::new();
    }
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector SCHEMA public".to_string(),
        format!("SET LOCAL search_path TO {}, public", quote_identifier(schema)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_target_public() {
        let options = SyncOptions::default();
        assert_eq!(options.schema, "public");
        assert!(!options.dry_run);
        assert_eq!(SyncOptions::new(), options);
    }

    #[test]
    fn test_option_builders() {
        let options = SyncOptions::new().schema("tenant_a").dry_run(true);
        assert_eq!(options.schema, "tenant_a");
        assert!(options.dry_run);

        let registry = EntityRegistry::new();
        let sync = SchemaSync::new(&registry, options.clone());
        assert_eq!(sync.options(), &options);
    }

    #[test]
    fn test_public_schema_needs_no_session_setup() {
        assert!(session_statements("public").is_empty());
    }

    #[test]
    fn test_extension_is_pinned_before_search_path_moves() {
        insta::assert_snapshot!(session_statements("tenant_a").join(";\n"), @r"
        CREATE EXTENSION IF NOT EXISTS vector SCHEMA public;
        SET LOCAL search_path TO tenant_a, public
        ");
        assert_eq!(
            session_statements("Tenant B")[1],
            "SET LOCAL search_path TO \"Tenant B\", public"
        );
    }
}
