//! Shared application state for the payroll engine API.
//!
//! Holds the configuration snapshot, the in-memory run store, the
//! banked-hours ledger and the calculation trace, all shared across
//! request handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::calculation::{CalculationLogger, CompensationLedger, PayrollRun};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::EmployeeCalculationContext;

/// A stored run together with the context snapshot it was created with.
///
/// Contexts are frozen at run creation so recomputation always sees the
/// inputs the run was opened with, regardless of later edits elsewhere.
#[derive(Debug)]
pub struct RunEntry {
    /// The run record.
    pub run: PayrollRun,
    /// The employee contexts snapshotted at creation.
    pub contexts: Vec<EmployeeCalculationContext>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Mutex<Arc<EngineConfig>>>,
    runs: Arc<Mutex<HashMap<Uuid, Arc<Mutex<RunEntry>>>>>,
    ledger: Arc<CompensationLedger>,
    logger: CalculationLogger,
}

impl AppState {
    /// Creates a new application state around a configuration snapshot.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(Arc::new(config))),
            runs: Arc::new(Mutex::new(HashMap::new())),
            ledger: Arc::new(CompensationLedger::new()),
            logger: CalculationLogger::new(),
        }
    }

    /// Returns the current configuration snapshot.
    ///
    /// Callers clone the `Arc` once and keep it for the whole request, so
    /// a concurrent [`AppState::replace_config`] never changes inputs
    /// mid-computation.
    pub fn config_snapshot(&self) -> Arc<EngineConfig> {
        Arc::clone(&unpoisoned(self.config.lock()))
    }

    /// Replaces the configuration snapshot for subsequent requests.
    pub fn replace_config(&self, config: EngineConfig) {
        *unpoisoned(self.config.lock()) = Arc::new(config);
    }

    /// Stores a run entry, returning its id.
    pub fn insert_run(&self, entry: RunEntry) -> Uuid {
        let id = entry.run.id;
        unpoisoned(self.runs.lock()).insert(id, Arc::new(Mutex::new(entry)));
        id
    }

    /// Looks up a run entry by id.
    ///
    /// # Errors
    ///
    /// [`EngineError::RunNotFound`] when no run with that id exists.
    pub fn run(&self, id: Uuid) -> EngineResult<Arc<Mutex<RunEntry>>> {
        unpoisoned(self.runs.lock())
            .get(&id)
            .cloned()
            .ok_or(EngineError::RunNotFound { run_id: id })
    }

    /// Returns the shared banked-hours ledger.
    pub fn ledger(&self) -> &CompensationLedger {
        &self.ledger
    }

    /// Returns the shared calculation trace.
    pub fn logger(&self) -> &CalculationLogger {
        &self.logger
    }
}

/// Recovers the guard from a poisoned lock; state behind these locks
/// stays usable even if a holder panicked.
fn unpoisoned<'a, T>(
    result: Result<MutexGuard<'a, T>, std::sync::PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(|e| e.into_inner())
}
