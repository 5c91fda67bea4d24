use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure of one schema reconciliation attempt.
///
/// Every variant is fatal for the attempt it occurred in; the gate resets
/// and the next caller starts over.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to open sqlite database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to inspect schema of {table}: {source}")]
    Introspection {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to apply DDL on {target}: {source}")]
    Ddl {
        target: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to repair {table}.{column} ({rule}): {source}")]
    Repair {
        table: &'static str,
        column: &'static str,
        rule: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("refusing to use unsafe sql identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("schema attempt aborted before completing: {0}")]
    AttemptAborted(String),
}

/// Returned to callers of `ensure_schema` when the database is not usable.
///
/// All waiters of one failed attempt share the same underlying error.
#[derive(Debug, Clone, Error)]
#[error("database not ready (schema incompatible or migration failed): {0}")]
pub struct SchemaNotReady(pub Arc<SchemaError>);

impl SchemaNotReady {
    #[must_use]
    pub fn cause(&self) -> &SchemaError {
        &self.0
    }
}

impl From<SchemaError> for SchemaNotReady {
    fn from(err: SchemaError) -> Self {
        Self(Arc::new(err))
    }
}
