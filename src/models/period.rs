//! Calendar models: computation periods, non-business days and leave.
//!
//! This module contains the [`Period`] type that defines the calculation
//! window, plus the calendar entries ([`NonBusinessDay`]) and justification
//! categories ([`LeaveType`], [`LeaveRecord`]) consumed by the attendance
//! computations.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A pay computation period with an inclusive date range.
///
/// # Example
///
/// ```
/// use folha_engine::models::Period;
/// use chrono::NaiveDate;
///
/// let period = Period {
///     start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
///     end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
/// };
/// assert!(period.validate().is_ok());
/// assert_eq!(period.calendar_days(), 31);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// The start date of the period (inclusive).
    pub start: NaiveDate,
    /// The end date of the period (inclusive).
    pub end: NaiveDate,
}

impl Period {
    /// Checks that the range is well-formed (start not after end).
    pub fn validate(&self) -> EngineResult<()> {
        if self.start > self.end {
            return Err(EngineError::InvalidPeriod {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Total calendar days in this period, inclusive of both ends.
    pub fn calendar_days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    /// Iterates every date in the period in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.calendar_days() as usize)
    }

    /// Checks if a given date falls within this period (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Returns true for Saturdays and Sundays.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The scope a calendar entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "unit_id")]
pub enum CalendarScope {
    /// Applies to every employee in the institution.
    Institution,
    /// Applies only to employees of the given organizational unit.
    Unit(String),
}

impl CalendarScope {
    /// Checks whether the entry applies to an employee of `unit_id`.
    pub fn applies_to(&self, unit_id: &str) -> bool {
        match self {
            CalendarScope::Institution => true,
            CalendarScope::Unit(unit) => unit == unit_id,
        }
    }
}

/// A calendar date marked as holiday or recess.
///
/// # Example
///
/// ```
/// use folha_engine::models::{CalendarScope, NonBusinessDay};
/// use chrono::NaiveDate;
///
/// let holiday = NonBusinessDay {
///     date: NaiveDate::from_ymd_opt(2026, 9, 7).unwrap(),
///     name: "Independence Day".to_string(),
///     scope: CalendarScope::Institution,
/// };
/// assert!(holiday.scope.applies_to("unit_hr"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonBusinessDay {
    /// The holiday/recess date.
    pub date: NaiveDate,
    /// The name of the holiday or recess.
    pub name: String,
    /// Whether the entry is institution-wide or unit-specific.
    #[serde(flatten)]
    pub scope: CalendarScope,
}

/// A justification category for an absence.
///
/// Leave types decide whether a justified absence still counts as
/// presence for attendance purposes (an "abono") and whether it draws
/// down the compensatory-time bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveType {
    /// The human-readable name of the leave type.
    pub name: String,
    /// Whether a day justified by this type counts as presence.
    pub counts_as_presence: bool,
    /// Whether a day justified by this type consumes banked hours.
    pub consumes_comp_balance: bool,
}

/// A single justified absence for one employee on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    /// The date of the absence.
    pub date: NaiveDate,
    /// The code of the [`LeaveType`] justifying the absence.
    pub leave_type: String,
}
