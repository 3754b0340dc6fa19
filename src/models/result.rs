//! Computed payroll outputs.
//!
//! This module contains the per-employee result ([`EmployeeResult`]) and
//! the run-level aggregate ([`PayrollRunResult`]). Monetary values are
//! integer cents throughout ([`Money`]) so every total is an exact sum of
//! its parts.
//!
//! [`EmployeeResult`] deliberately carries no ids or timestamps:
//! recomputing an unclosed run with unchanged inputs must produce
//! byte-identical results. Attempt metadata lives on the run result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EmployeeFailure;

use super::money::Money;
use super::period::Period;

/// The sign of a rubrica: whether it pays, withholds, or is an employer
/// charge outside the pay envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricaSign {
    /// An earning: adds to gross and net.
    Credit,
    /// A deduction: subtracts from net.
    Debit,
    /// An employer-side charge: tracked separately, not part of the
    /// employee's gross or net.
    EmployerCharge,
}

/// A single computed earning/deduction line in an employee result.
///
/// # Example
///
/// ```
/// use folha_engine::models::{Money, RubricaLine, RubricaSign};
///
/// let line = RubricaLine {
///     code: "irrf".to_string(),
///     name: "Income tax withholding".to_string(),
///     sign: RubricaSign::Debit,
///     amount: Money::from_cents(10_000),
/// };
/// assert_eq!(line.amount.cents(), 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricaLine {
    /// The rubrica code this line was computed from.
    pub code: String,
    /// The human-readable rubrica name.
    pub name: String,
    /// Whether the line credits, debits, or charges the employer.
    pub sign: RubricaSign,
    /// The line amount in cents, already rounded per the engine policy.
    pub amount: Money,
}

/// A non-fatal note attached to a computation (e.g., a capped payout or
/// a misconfigured regime that was defaulted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationNote {
    /// A code identifying the kind of note (e.g., "capped").
    pub code: String,
    /// A human-readable description.
    pub message: String,
}

/// Attendance figures computed for one employee for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Expected working days in the period.
    pub expected_days: u32,
    /// The daily hour target in force.
    pub daily_hours: Decimal,
    /// Expected hours (`expected_days * daily_hours`).
    pub expected_hours: Decimal,
    /// Hours credited from presence-counting justified absences.
    pub credited_leave_hours: Decimal,
    /// Signed overtime/deficit delta fed into the compensation bank.
    pub overtime_delta: Decimal,
}

/// Compensation-bank movements staged by a computation.
///
/// Staged deltas are committed to the [`crate::calculation::CompensationLedger`]
/// exactly once, when the run is closed, so recomputation stays
/// side-effect free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedLedgerDelta {
    /// The overtime/deficit hours to bank.
    pub overtime_hours: Decimal,
    /// Banked hours consumed by compensatory payout or leave.
    pub consumed_hours: Decimal,
}

impl StagedLedgerDelta {
    /// The net signed movement to apply to the bank.
    pub fn net_hours(&self) -> Decimal {
        self.overtime_hours - self.consumed_hours
    }
}

/// The computed result for one employee in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeResult {
    /// The employee this result belongs to.
    pub employee_id: String,
    /// The computation period.
    pub period: Period,
    /// The attendance figures the monetary lines were derived from.
    pub attendance: AttendanceSummary,
    /// Computed lines in evaluation order.
    pub lines: Vec<RubricaLine>,
    /// Sum of credit lines, in cents.
    pub gross: Money,
    /// Sum of debit lines, in cents.
    pub deductions: Money,
    /// `gross - deductions`, in cents.
    pub net: Money,
    /// Sum of employer-charge lines, in cents.
    pub employer_charges: Money,
    /// Compensation-bank movements to commit at run close.
    pub staged_delta: StagedLedgerDelta,
    /// Non-fatal notes (caps, defaulted configuration).
    pub notes: Vec<CalculationNote>,
    /// Errors that stopped rubrica evaluation early, if any. A result
    /// with a non-empty error list is partial and counts as a failed
    /// employee for the run transition.
    pub errors: Vec<CalculationNote>,
}

impl EmployeeResult {
    /// True when every rubrica evaluated without error.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregated totals for a payroll run.
///
/// Computed only after every employee has a result, never incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Sum of per-employee gross, in cents.
    pub gross: Money,
    /// Sum of per-employee deductions, in cents.
    pub deductions: Money,
    /// Sum of per-employee net, in cents.
    pub net: Money,
    /// Sum of per-employee employer charges, in cents.
    pub employer_charges: Money,
    /// Number of employees in the run.
    pub headcount: u32,
}

impl RunTotals {
    /// Aggregates totals from a complete result set.
    pub fn from_results(results: &[EmployeeResult]) -> RunTotals {
        RunTotals {
            gross: results.iter().map(|r| r.gross).sum(),
            deductions: results.iter().map(|r| r.deductions).sum(),
            net: results.iter().map(|r| r.net).sum(),
            employer_charges: results.iter().map(|r| r.employer_charges).sum(),
            headcount: results.len() as u32,
        }
    }
}

/// The complete output of one successful compute attempt for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRunResult {
    /// The identifier of this compute attempt, also used to tag log
    /// entries so repeated attempts keep unambiguous audit trails.
    pub attempt_id: Uuid,
    /// When the attempt completed.
    pub computed_at: DateTime<Utc>,
    /// Per-employee results, in the run's employee order.
    pub results: Vec<EmployeeResult>,
    /// Aggregated totals over `results`.
    pub totals: RunTotals,
}

/// The failure report returned when a compute attempt is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeFailureReport {
    /// The identifier of the rejected attempt.
    pub attempt_id: Uuid,
    /// The employees that failed, with reasons.
    pub failures: Vec<EmployeeFailure>,
}
