//! Compensatory-time bank.
//!
//! The ledger tracks accumulated overtime/deficit hours per employee
//! across periods. Balances are mutated only by engine computations
//! (committed at run close) and by explicit expiration sweeps, never by
//! callers directly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
struct LedgerEntry {
    period_end: NaiveDate,
    hours: Decimal,
}

/// Running signed totals of banked hours per employee.
///
/// Entries are scoped per employee id, so concurrent per-employee
/// computations never contend on each other's balances.
///
/// # Example
///
/// ```
/// use folha_engine::calculation::CompensationLedger;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let ledger = CompensationLedger::new();
/// let period_end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
/// ledger.apply_delta("emp_001", period_end, Decimal::from(5), false).unwrap();
/// assert_eq!(ledger.current_balance("emp_001", period_end), Decimal::from(5));
/// ```
#[derive(Debug, Default)]
pub struct CompensationLedger {
    entries: Mutex<HashMap<String, Vec<LedgerEntry>>>,
}

impl CompensationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a signed hours delta for an employee.
    ///
    /// # Errors
    ///
    /// [`EngineError::NegativeBalanceViolation`] when the resulting
    /// balance would be negative and `allow_negative` is false (the
    /// institutional "advance" flag). The entry is not appended.
    pub fn apply_delta(
        &self,
        employee_id: &str,
        period_end: NaiveDate,
        signed_hours: Decimal,
        allow_negative: bool,
    ) -> EngineResult<Decimal> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let employee_entries = entries.entry(employee_id.to_string()).or_default();

        let balance: Decimal = employee_entries.iter().map(|e| e.hours).sum();
        let new_balance = balance + signed_hours;
        if new_balance < Decimal::ZERO && !allow_negative {
            return Err(EngineError::NegativeBalanceViolation {
                employee_id: employee_id.to_string(),
                balance,
                requested: -signed_hours,
            });
        }

        employee_entries.push(LedgerEntry {
            period_end,
            hours: signed_hours,
        });
        Ok(new_balance)
    }

    /// Returns the balance available to an employee at a date: the sum
    /// of entries banked by periods ending on or before `as_of`.
    pub fn current_balance(&self, employee_id: &str, as_of: NaiveDate) -> Decimal {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(employee_id)
            .map(|employee_entries| {
                employee_entries
                    .iter()
                    .filter(|e| e.period_end <= as_of)
                    .map(|e| e.hours)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Expiration sweep: removes positive hours banked by periods ending
    /// before `cutoff`, returning the hours expired.
    ///
    /// Deficits (negative entries) never expire; only unspent credit
    /// does.
    pub fn expire_before(&self, employee_id: &str, cutoff: NaiveDate) -> Decimal {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(employee_entries) = entries.get_mut(employee_id) else {
            return Decimal::ZERO;
        };

        let expired: Decimal = employee_entries
            .iter()
            .filter(|e| e.period_end < cutoff && e.hours > Decimal::ZERO)
            .map(|e| e.hours)
            .sum();

        if expired > Decimal::ZERO {
            employee_entries.retain(|e| !(e.period_end < cutoff && e.hours > Decimal::ZERO));
        }
        expired
    }
}
