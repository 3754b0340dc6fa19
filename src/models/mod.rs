//! Domain models for the Payroll Calculation Engine.
//!
//! This module contains the data structures shared across the engine:
//! integer-cents money, calendar and leave types, employee contexts, and
//! computed results.

mod employee;
mod money;
mod period;
mod result;

pub use employee::{EmployeeCalculationContext, ShiftStructure, WorkRegime};
pub use money::{Money, RoundingPolicy};
pub use period::{CalendarScope, LeaveRecord, LeaveType, NonBusinessDay, Period, is_weekend};
pub use result::{
    AttendanceSummary, CalculationNote, ComputeFailureReport, EmployeeResult, PayrollRunResult,
    RubricaLine, RubricaSign, RunTotals, StagedLedgerDelta,
};
