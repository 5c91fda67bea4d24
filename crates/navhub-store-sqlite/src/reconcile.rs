use rusqlite::Connection;
use serde::Serialize;

use crate::error::SchemaError;
use crate::inspect::{ensure_identifier, SchemaInspector};
use crate::target::{TableSpec, TargetSchema};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddedColumn {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created_tables: Vec<&'static str>,
    pub added_columns: Vec<AddedColumn>,
    pub ensured_indexes: Vec<&'static str>,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created_tables.is_empty() && self.added_columns.is_empty()
    }
}

/// Close every structural gap between the live database and `target`.
///
/// Only creates tables, adds columns and creates indexes; nothing that
/// already exists is altered or dropped. Each statement is idempotent on
/// its own, so a crash part way through is repaired by running again.
///
/// # Errors
/// Returns the first introspection or DDL failure; later statements are not run.
pub fn reconcile(
    conn: &Connection,
    target: &TargetSchema,
) -> Result<ReconcileReport, SchemaError> {
    let inspector = SchemaInspector::new(conn);
    let mut report = ReconcileReport::default();

    for table in target.tables {
        ensure_identifier(table.name)?;
        if !inspector.table_exists(table.name)? {
            execute_ddl(conn, table.name, table.create_sql)?;
            tracing::info!(table = table.name, "created missing table");
            report.created_tables.push(table.name);
        }

        for index in table.indexes {
            execute_ddl(conn, index.name, index.create_sql)?;
            report.ensured_indexes.push(index.name);
        }
    }

    for table in target.tables {
        add_missing_columns(conn, &inspector, table, &mut report)?;
    }

    Ok(report)
}

fn add_missing_columns(
    conn: &Connection,
    inspector: &SchemaInspector<'_>,
    table: &'static TableSpec,
    report: &mut ReconcileReport,
) -> Result<(), SchemaError> {
    let existing = inspector.columns(table.name)?;

    for column in table.columns {
        if existing.contains(column.name) {
            continue;
        }
        ensure_identifier(column.name)?;

        let sql = format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {};",
            table.name, column.name, column.ddl
        );
        execute_ddl(conn, &format!("{}.{}", table.name, column.name), &sql)?;
        tracing::info!(table = table.name, column = column.name, "added missing column");
        report.added_columns.push(AddedColumn {
            table: table.name,
            column: column.name,
        });
    }

    Ok(())
}

fn execute_ddl(conn: &Connection, target: &str, sql: &str) -> Result<(), SchemaError> {
    conn.execute_batch(sql).map_err(|source| SchemaError::Ddl {
        target: target.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::inspect::SchemaInspector;
    use crate::target::{ColumnSpec, NAVHUB_SCHEMA};

    #[test]
    fn empty_database_gets_every_table_and_no_added_columns() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        let report = reconcile(&conn, &NAVHUB_SCHEMA)?;

        assert_eq!(report.created_tables.len(), NAVHUB_SCHEMA.tables.len());
        assert!(report.added_columns.is_empty());
        assert_eq!(report.ensured_indexes, vec!["Category_name_key"]);

        let observed = SchemaInspector::new(&conn).observe()?;
        for table in NAVHUB_SCHEMA.tables {
            assert!(observed.has_table(table.name));
        }
        Ok(())
    }

    #[test]
    fn second_run_is_a_noop() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        reconcile(&conn, &NAVHUB_SCHEMA)?;
        let before = SchemaInspector::new(&conn).observe()?;

        let report = reconcile(&conn, &NAVHUB_SCHEMA)?;
        let after = SchemaInspector::new(&conn).observe()?;

        assert!(report.is_noop());
        assert_eq!(before, after);
        Ok(())
    }

    #[test]
    fn legacy_site_table_gains_evolved_columns() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            r#"CREATE TABLE "Site" (
                "id" TEXT NOT NULL PRIMARY KEY,
                "name" TEXT NOT NULL,
                "url" TEXT NOT NULL,
                "desc" TEXT,
                "category" TEXT NOT NULL,
                "color" TEXT,
                "icon" TEXT,
                "iconType" TEXT,
                "customIconUrl" TEXT,
                "order" INTEGER NOT NULL DEFAULT 0,
                "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                "updatedAt" DATETIME NOT NULL
            );
            INSERT INTO "Site"("id","name","url","category","order","updatedAt")
            VALUES ('s1','Docs','https://docs.rs','Rust',3,'2024-01-01');"#,
        )?;

        let report = reconcile(&conn, &NAVHUB_SCHEMA)?;
        assert!(!report.created_tables.contains(&"Site"));
        let added = report
            .added_columns
            .iter()
            .filter(|added| added.table == "Site")
            .map(|added| added.column)
            .collect::<Vec<_>>();
        assert_eq!(
            added,
            vec![
                "titleFont",
                "descFont",
                "titleColor",
                "descColor",
                "titleSize",
                "descSize",
                "isHidden"
            ]
        );

        let hidden: bool =
            conn.query_row(r#"SELECT "isHidden" FROM "Site" WHERE "id" = 's1'"#, [], |row| {
                row.get(0)
            })?;
        assert!(!hidden);
        Ok(())
    }

    #[test]
    fn unknown_tables_and_columns_survive() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            r#"CREATE TABLE "Wallpaper" ("id" TEXT PRIMARY KEY, "url" TEXT NOT NULL,
                   "type" TEXT NOT NULL, "filename" TEXT NOT NULL, "legacyBlob" BLOB);
               CREATE TABLE "AuditTrail" ("id" INTEGER PRIMARY KEY);"#,
        )?;
        let before = SchemaInspector::new(&conn).observe()?;

        reconcile(&conn, &NAVHUB_SCHEMA)?;
        let after = SchemaInspector::new(&conn).observe()?;

        for (table, columns) in &before.tables {
            for column in columns {
                assert!(
                    after.has_column(table, column),
                    "{table}.{column} was removed",
                );
            }
        }
        Ok(())
    }

    #[test]
    fn failing_column_ddl_surfaces_as_ddl_error() -> Result<()> {
        static BROKEN: TargetSchema = TargetSchema {
            tables: &[TableSpec {
                name: "Broken",
                create_sql: r#"CREATE TABLE IF NOT EXISTS "Broken" ("id" INTEGER PRIMARY KEY);"#,
                columns: &[ColumnSpec {
                    name: "required",
                    ddl: "TEXT NOT NULL",
                }],
                indexes: &[],
            }],
            order_columns: &[],
        };

        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            r#"CREATE TABLE "Broken" ("id" INTEGER PRIMARY KEY); INSERT INTO "Broken" VALUES (1);"#,
        )?;

        match reconcile(&conn, &BROKEN) {
            Err(SchemaError::Ddl { target, .. }) => assert_eq!(target, "Broken.required"),
            other => panic!("expected DDL error, got {other:?}"),
        }
        Ok(())
    }
}
