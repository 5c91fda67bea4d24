use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, Connection};

use crate::error::SchemaError;

/// Live table/column layout as read from `sqlite_master`.
///
/// Built fresh for every attempt and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedSchema {
    pub tables: BTreeMap<String, BTreeSet<String>>,
}

impl ObservedSchema {
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    #[must_use]
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables.get(table).is_some_and(|columns| columns.contains(column))
    }
}

/// Read-only catalog queries against one connection.
pub struct SchemaInspector<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SchemaInspector<'conn> {
    #[must_use]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// # Errors
    /// Returns [`SchemaError::Introspection`] when the catalog cannot be read.
    pub fn table_exists(&self, table: &str) -> Result<bool, SchemaError> {
        let exists = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![table],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|source| SchemaError::Introspection {
                table: table.to_string(),
                source,
            })?;
        Ok(exists == 1)
    }

    /// Column names of `table`; empty when the table does not exist.
    ///
    /// # Errors
    /// Returns [`SchemaError::InvalidIdentifier`] for names that are not plain
    /// identifiers and [`SchemaError::Introspection`] when the query fails.
    pub fn columns(&self, table: &str) -> Result<BTreeSet<String>, SchemaError> {
        ensure_identifier(table)?;
        let introspection = |source| SchemaError::Introspection {
            table: table.to_string(),
            source,
        };

        // PRAGMA arguments cannot be bound.
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{table}\")"))
            .map_err(introspection)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(introspection)?
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(introspection)?;
        Ok(names)
    }

    /// Snapshot every user table and its columns.
    ///
    /// # Errors
    /// Returns [`SchemaError`] when the catalog or any table cannot be read.
    pub fn observe(&self) -> Result<ObservedSchema, SchemaError> {
        let catalog = |source| SchemaError::Introspection {
            table: "sqlite_master".into(),
            source,
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name ASC",
            )
            .map_err(catalog)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(catalog)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(catalog)?;

        let mut tables = BTreeMap::new();
        for name in names {
            let columns = self.columns(&name)?;
            tables.insert(name, columns);
        }
        Ok(ObservedSchema { tables })
    }
}

/// Only plain identifiers may be interpolated into DDL or PRAGMA text.
pub(crate) fn ensure_identifier(name: &str) -> Result<(), SchemaError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}
