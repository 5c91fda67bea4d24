//! Process-wide single-flight guard around schema reconciliation.
//!
//! ```ignore
//! let gate = SchemaGate::new(SqliteMigrator::new(db_path));
//!
//! // In every request handler, before touching the database:
//! gate.ensure_schema().await?;
//! ```

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::watch;

use crate::config::DatabaseConfig;
use crate::error::{SchemaError, SchemaNotReady};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::repair::{repair_known_corruptions, RepairReport};
use crate::target::{TargetSchema, NAVHUB_SCHEMA};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub reconcile: ReconcileReport,
    pub repair: RepairReport,
}

/// One full, blocking reconciliation attempt.
pub trait Migrate: Send + Sync + 'static {
    /// # Errors
    /// Returns the first failure of the attempt.
    fn run(&self) -> Result<MigrationReport, SchemaError>;
}

/// Reconciles a `SQLite` file against a [`TargetSchema`], then repairs data.
#[derive(Debug, Clone)]
pub struct SqliteMigrator {
    db_path: PathBuf,
    target: &'static TargetSchema,
}

impl SqliteMigrator {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            target: &NAVHUB_SCHEMA,
        }
    }

    #[must_use]
    pub fn with_target(db_path: PathBuf, target: &'static TargetSchema) -> Self {
        Self { db_path, target }
    }
}

impl Migrate for SqliteMigrator {
    fn run(&self) -> Result<MigrationReport, SchemaError> {
        let conn = Connection::open(&self.db_path)
            .and_then(|conn| {
                conn.busy_timeout(std::time::Duration::from_millis(crate::BUSY_TIMEOUT_MS))?;
                Ok(conn)
            })
            .map_err(|source| SchemaError::Open {
                path: self.db_path.clone(),
                source,
            })?;

        let reconcile = reconcile(&conn, self.target)?;
        let repair = repair_known_corruptions(&conn, self.target)?;
        Ok(MigrationReport { reconcile, repair })
    }
}

type AttemptOutcome = Result<(), SchemaNotReady>;

enum GateState {
    Idle,
    InFlight(watch::Receiver<Option<AttemptOutcome>>),
    Completed,
}

struct GateInner<M> {
    migrator: M,
    state: Mutex<GateState>,
}

/// Runs a [`Migrate`] at most once successfully per gate.
///
/// Concurrent callers share the in-flight attempt and all receive its
/// outcome. Success is remembered for the life of the gate; failure
/// resets the gate so the next caller retries from scratch.
pub struct SchemaGate<M> {
    inner: Arc<GateInner<M>>,
}

impl<M> Clone for SchemaGate<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Migrate> SchemaGate<M> {
    #[must_use]
    pub fn new(migrator: M) -> Self {
        Self {
            inner: Arc::new(GateInner {
                migrator,
                state: Mutex::new(GateState::Idle),
            }),
        }
    }

    /// Make sure the schema is current before the caller touches the database.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// future does not cancel the attempt; it keeps running and a later
    /// call observes its outcome.
    ///
    /// # Errors
    /// Returns [`SchemaNotReady`] when the attempt this call joined failed.
    pub async fn ensure_schema(&self) -> Result<(), SchemaNotReady> {
        let mut outcome = {
            let mut state = self.inner.state.lock();
            match &*state {
                GateState::Completed => return Ok(()),
                GateState::InFlight(outcome) if outcome.has_changed().is_ok() => outcome.clone(),
                // A closed channel while still in flight means the runtime that
                // drove the attempt shut down before it reported.
                GateState::InFlight(_) | GateState::Idle => {
                    let (sender, outcome) = watch::channel(None);
                    *state = GateState::InFlight(outcome.clone());
                    self.start_attempt(sender);
                    outcome
                }
            }
        };

        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map(|value| value.clone());
        match settled {
            Ok(Some(result)) => result,
            Ok(None) | Err(_) => Err(SchemaError::AttemptAborted(
                "attempt ended without reporting an outcome".to_string(),
            )
            .into()),
        }
    }

    fn start_attempt(&self, sender: watch::Sender<Option<AttemptOutcome>>) {
        let inner = Arc::clone(&self.inner);
        tracing::info!("checking database schema");

        tokio::spawn(async move {
            let worker = Arc::clone(&inner);
            let joined = tokio::task::spawn_blocking(move || worker.migrator.run()).await;

            let outcome = match joined {
                Ok(Ok(report)) => {
                    tracing::info!(
                        created_tables = report.reconcile.created_tables.len(),
                        added_columns = report.reconcile.added_columns.len(),
                        repaired_rows = report.repair.repaired_rows(),
                        "database schema is current"
                    );
                    Ok(())
                }
                Ok(Err(err)) => Err(SchemaNotReady::from(err)),
                Err(join) => Err(SchemaNotReady::from(SchemaError::AttemptAborted(
                    join.to_string(),
                ))),
            };

            {
                let mut state = inner.state.lock();
                *state = match &outcome {
                    Ok(()) => GateState::Completed,
                    Err(err) => {
                        tracing::error!(error = %err.cause(), "database schema check failed");
                        GateState::Idle
                    }
                };
            }

            // Waiters only hold receivers cloned from the state we just replaced,
            // so a send error means nobody is listening.
            let _ = sender.send(Some(outcome));
        });
    }
}

static DATABASE_GATE: OnceLock<Option<SchemaGate<SqliteMigrator>>> = OnceLock::new();

/// Ensure the schema of the database named by `DATABASE_URL`.
///
/// The gate is created on first use. Non-`SQLite` URLs are left alone.
///
/// # Errors
/// Returns [`SchemaNotReady`] when the shared attempt failed.
pub async fn ensure_database_schema() -> Result<(), SchemaNotReady> {
    let gate = DATABASE_GATE.get_or_init(|| {
        DatabaseConfig::from_env()
            .sqlite_path()
            .map(|path| SchemaGate::new(SqliteMigrator::new(path)))
    });

    match gate {
        Some(gate) => gate.ensure_schema().await,
        None => Ok(()),
    }
}
