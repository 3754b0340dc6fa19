//! Employee context and work regime models.
//!
//! This module defines the [`WorkRegime`] (shift structure over a date
//! range) and the [`EmployeeCalculationContext`], the read-only input
//! bundle the engine consumes for one employee for one period.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::period::{LeaveRecord, Period};

/// The shift structure of a work regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "shifts")]
pub enum ShiftStructure {
    /// A single daily shift of at most 6 hours.
    Single {
        /// The configured daily hour target for the single shift.
        daily_hours: Decimal,
    },
    /// Two daily shifts totaling 8 hours.
    Two,
}

/// A work regime tied to an employee for a date range.
///
/// Regimes are superseded, never deleted: changing an employee's regime
/// closes the current one by setting `superseded_on` and creates a new
/// record. A regime referenced by a closed payroll run is read-only.
///
/// # Example
///
/// ```
/// use folha_engine::models::{ShiftStructure, WorkRegime};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let regime = WorkRegime {
///     structure: ShiftStructure::Single { daily_hours: Decimal::from(6) },
///     effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     superseded_on: None,
/// };
/// assert!(regime.in_effect_on(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRegime {
    /// The shift structure for this regime.
    #[serde(flatten)]
    pub structure: ShiftStructure,
    /// The first date this regime applies to.
    pub effective_from: NaiveDate,
    /// The date this regime was superseded, if it was.
    #[serde(default)]
    pub superseded_on: Option<NaiveDate>,
}

impl WorkRegime {
    /// Checks whether the regime is in effect on the given date.
    pub fn in_effect_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from
            && self.superseded_on.is_none_or(|superseded| date < superseded)
    }

    /// Supersedes this regime on `date`, returning a replacement with the
    /// new structure effective from the same date.
    ///
    /// The old record is kept (mutated in place, not deleted) so closed
    /// payroll runs keep referencing the regime that was in force.
    pub fn supersede(&mut self, date: NaiveDate, structure: ShiftStructure) -> WorkRegime {
        self.superseded_on = Some(date);
        WorkRegime {
            structure,
            effective_from: date,
            superseded_on: None,
        }
    }
}

/// The read-only input bundle for one employee for one period.
///
/// Everything the engine needs to compute one employee's result:
/// identity, pay basis, regime, and the period's leave and worked-hours
/// records. The engine never mutates a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCalculationContext {
    /// Unique identifier for the employee.
    pub employee_id: String,
    /// The organizational unit the employee is assigned to.
    pub unit_id: String,
    /// Monthly base salary in cents.
    pub base_salary: Money,
    /// Completed years of service.
    pub seniority_years: u32,
    /// The work regime in force, if one is set. When absent the daily
    /// hour target is resolved through the configuration tiers.
    #[serde(default)]
    pub regime: Option<WorkRegime>,
    /// The computation period.
    pub period: Period,
    /// Justified absences within the period.
    #[serde(default)]
    pub leave_records: Vec<LeaveRecord>,
    /// Hours actually worked within the period (clock records).
    pub worked_hours: Decimal,
}
