//! Live schema introspection.
//!
//! Reads `information_schema` and `pg_catalog` for one schema and assembles an
//! [`IntrospectedSchema`]. All queries are read-only; run them inside the same
//! transaction that will execute the generated script so the snapshot and the
//! changes observe one point in time.

use crate::traced::{Connection, TracedConn};
use crate::{Error, Result};
use keel_db_schema::{
    ColumnSnapshot, FkSnapshot, IndexSnapshot, IntrospectedSchema, TableSnapshot,
};
use tokio_postgres::Row;

const TABLES_SQL: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name";

const COLUMNS_SQL: &str = "\
SELECT table_name::text,
       column_name::text,
       CASE WHEN data_type = 'USER-DEFINED' THEN udt_name::text ELSE data_type::text END,
       is_nullable = 'YES',
       column_default::text
FROM information_schema.columns
WHERE table_schema = $1
ORDER BY table_name, ordinal_position";

const PRIMARY_KEYS_SQL: &str = "\
SELECT tc.table_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.constraint_schema = tc.constraint_schema
 AND kcu.table_name = tc.table_name
WHERE tc.table_schema = $1 AND tc.constraint_type = 'PRIMARY KEY'
ORDER BY tc.table_name, kcu.ordinal_position";

const FOREIGN_KEYS_SQL: &str = "\
SELECT cl.relname::text,
       con.conname::text,
       a.attname::text,
       rcl.relname::text,
       ra.attname::text
FROM pg_constraint con
JOIN pg_class cl ON cl.oid = con.conrelid
JOIN pg_namespace n ON n.oid = cl.relnamespace
JOIN pg_class rcl ON rcl.oid = con.confrelid
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) AS k(attnum, ref_attnum)
JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
WHERE con.contype = 'f' AND n.nspname = $1
ORDER BY cl.relname, con.conname";

const UNIQUE_SQL: &str = "\
SELECT tc.table_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.constraint_schema = tc.constraint_schema
 AND kcu.table_name = tc.table_name
WHERE tc.table_schema = $1
  AND tc.constraint_type = 'UNIQUE'
  AND (
    SELECT count(*)
    FROM information_schema.key_column_usage k2
    WHERE k2.constraint_name = tc.constraint_name
      AND k2.constraint_schema = tc.constraint_schema
  ) = 1
ORDER BY tc.table_name, kcu.column_name";

const INDEXES_SQL: &str = "\
SELECT t.relname::text,
       i.relname::text,
       ix.indisunique,
       array_agg(a.attname::text ORDER BY k.ord)
FROM pg_index ix
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE n.nspname = $1
  AND t.relkind = 'r'
  AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conindid = ix.indexrelid)
GROUP BY t.relname, i.relname, ix.indisunique
ORDER BY t.relname, i.relname";

/// Build a snapshot of every base table in `schema`.
///
/// An empty schema yields an empty snapshot. Any failing query aborts the
/// whole snapshot.
pub async fn introspect<C: Connection + ?Sized>(
    conn: &C,
    schema: &str,
) -> Result<IntrospectedSchema> {
    let mut snapshot = IntrospectedSchema::new();

    for row in fetch(conn, "tables", TABLES_SQL, schema).await? {
        snapshot
            .tables
            .insert(row.try_get(0).map_err(step_err("tables"))?, TableSnapshot::default());
    }

    if snapshot.is_empty() {
        tracing::debug!(schema, "no tables found");
        return Ok(snapshot);
    }

    for row in fetch(conn, "columns", COLUMNS_SQL, schema).await? {
        let table: String = row.try_get(0).map_err(step_err("columns"))?;
        let column = ColumnSnapshot {
            name: row.try_get(1).map_err(step_err("columns"))?,
            data_type: row.try_get(2).map_err(step_err("columns"))?,
            is_nullable: row.try_get(3).map_err(step_err("columns"))?,
            default_expression: row.try_get(4).map_err(step_err("columns"))?,
            is_unique: false,
        };
        if let Some(t) = snapshot.tables.get_mut(&table) {
            t.columns.push(column);
        }
    }

    for row in fetch(conn, "primary keys", PRIMARY_KEYS_SQL, schema).await? {
        let table: String = row.try_get(0).map_err(step_err("primary keys"))?;
        let column: String = row.try_get(1).map_err(step_err("primary keys"))?;
        if let Some(t) = snapshot.tables.get_mut(&table) {
            t.primary_key.push(column);
        }
    }

    for row in fetch(conn, "foreign keys", FOREIGN_KEYS_SQL, schema).await? {
        let table: String = row.try_get(0).map_err(step_err("foreign keys"))?;
        let fk = FkSnapshot {
            constraint_name: row.try_get(1).map_err(step_err("foreign keys"))?,
            column: row.try_get(2).map_err(step_err("foreign keys"))?,
            referenced_table: row.try_get(3).map_err(step_err("foreign keys"))?,
            referenced_column: row.try_get(4).map_err(step_err("foreign keys"))?,
        };
        if let Some(t) = snapshot.tables.get_mut(&table) {
            t.foreign_keys.push(fk);
        }
    }

    for row in fetch(conn, "unique constraints", UNIQUE_SQL, schema).await? {
        let table: String = row.try_get(0).map_err(step_err("unique constraints"))?;
        let column: String = row.try_get(1).map_err(step_err("unique constraints"))?;
        if let Some(t) = snapshot.tables.get_mut(&table) {
            if let Some(col) = t.columns.iter_mut().find(|c| c.name == column) {
                col.is_unique = true;
            }
            t.unique_columns.insert(column);
        }
    }

    for row in fetch(conn, "indexes", INDEXES_SQL, schema).await? {
        let table: String = row.try_get(0).map_err(step_err("indexes"))?;
        let index = IndexSnapshot {
            name: row.try_get(1).map_err(step_err("indexes"))?,
            is_unique: row.try_get(2).map_err(step_err("indexes"))?,
            columns: row.try_get(3).map_err(step_err("indexes"))?,
        };
        if let Some(t) = snapshot.tables.get_mut(&table) {
            t.indexes.push(index);
        }
    }

    tracing::debug!(schema, tables = snapshot.len(), "introspected schema");
    Ok(snapshot)
}

async fn fetch<C: Connection + ?Sized>(
    conn: &C,
    step: &'static str,
    sql: &str,
    schema: &str,
) -> Result<Vec<Row>> {
    TracedConn::new(conn)
        .query(sql, &[&schema])
        .await
        .map_err(step_err(step))
}

fn step_err(step: &'static str) -> impl Fn(tokio_postgres::Error) -> Error {
    move |source| Error::Introspection { step, source }
}
