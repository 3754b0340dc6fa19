//! Error types for the Payroll Calculation Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur during payroll computation.
//!
//! A missing configuration value is deliberately *not* an error: the
//! resolver recovers through the tier fallback chain and logs a warning
//! instead (see [`crate::config::ConfigResolver`]).

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::calculation::RunState;

/// A per-employee computation failure collected into a run result.
///
/// Employee failures never abort sibling computations; they are gathered
/// and reported together when the `draft -> computed` transition is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EmployeeFailure {
    /// The employee whose computation failed.
    pub employee_id: String,
    /// A machine-readable failure code (e.g., "invalid_period").
    pub code: String,
    /// A human-readable description of the failure.
    pub reason: String,
}

/// The main error type for the Payroll Calculation Engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use folha_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A period's date range was invalid (end before start).
    ///
    /// The affected employee is skipped; siblings keep computing.
    #[error("Invalid period: {start} to {end}")]
    InvalidPeriod {
        /// The period start date.
        start: NaiveDate,
        /// The period end date.
        end: NaiveDate,
    },

    /// A tax bracket table failed validation.
    ///
    /// This is fatal configuration data: an invalid table silently
    /// produces legally wrong withholding, so it blocks the whole run's
    /// `draft -> computed` transition rather than falling back.
    #[error("Invalid bracket table '{table}': {message}")]
    BracketTableInvalid {
        /// The name of the offending table.
        table: String,
        /// A description of the violated invariant.
        message: String,
    },

    /// A compensatory-time balance would go negative without the
    /// institutional advance flag permitting debt.
    #[error(
        "Negative balance violation for employee '{employee_id}': \
         balance {balance} hours, requested {requested} hours"
    )]
    NegativeBalanceViolation {
        /// The employee whose balance would go negative.
        employee_id: String,
        /// The balance available before the operation.
        balance: rust_decimal::Decimal,
        /// The hours the operation tried to remove.
        requested: rust_decimal::Decimal,
    },

    /// Another caller is already transitioning this run. Retry.
    #[error("Payroll run {run_id} is already transitioning, retry")]
    ConcurrentStateTransition {
        /// The contended run.
        run_id: Uuid,
    },

    /// The requested lifecycle transition is not in the transition table.
    #[error("Invalid payroll run transition from {from} to {to}")]
    InvalidTransition {
        /// The state the run was in.
        from: RunState,
        /// The state the caller asked for.
        to: RunState,
    },

    /// A closed run rejects result mutation; only `reopen` unlocks it.
    #[error("Payroll run {run_id} is closed; reopen it before modifying results")]
    RunClosed {
        /// The closed run.
        run_id: Uuid,
    },

    /// No payroll run exists with the given id.
    #[error("Payroll run not found: {run_id}")]
    RunNotFound {
        /// The unknown run id.
        run_id: Uuid,
    },

    /// A single rubrica failed to evaluate.
    ///
    /// Recorded in the employee's partial result; evaluation of later
    /// rubricas for that employee stops.
    #[error("Rubrica '{code}' failed: {message}")]
    RubricaFailed {
        /// The code of the failing rubrica.
        code: String,
        /// A description of the failure.
        message: String,
    },

    /// The `draft -> computed` transition was rejected because one or
    /// more employees failed; the run stays in `draft`.
    #[error("Payroll run compute rejected: {} employee(s) failed", failures.len())]
    ComputeRejected {
        /// The employees that failed, with reasons.
        failures: Vec<EmployeeFailure>,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
