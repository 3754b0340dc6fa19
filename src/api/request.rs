//! Request types for the payroll engine API.
//!
//! JSON request structures for the `/calculate` and `/runs` endpoints,
//! converted into the engine's domain types before computation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    EmployeeCalculationContext, LeaveRecord, Money, Period, WorkRegime,
};

/// The employee portion of a calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRequest {
    /// Employee identifier.
    pub id: String,
    /// Organizational unit the employee belongs to.
    pub unit_id: String,
    /// Monthly base salary in integer cents.
    pub base_salary_cents: i64,
    /// Completed years of service.
    #[serde(default)]
    pub seniority_years: u32,
    /// The work regime in force, if known to the caller.
    #[serde(default)]
    pub regime: Option<WorkRegime>,
}

/// A calculation period as start/end dates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeriodRequest {
    /// First day of the period (inclusive).
    pub start: NaiveDate,
    /// Last day of the period (inclusive).
    pub end: NaiveDate,
}

impl From<PeriodRequest> for Period {
    fn from(request: PeriodRequest) -> Self {
        Period {
            start: request.start,
            end: request.end,
        }
    }
}

/// A justified-absence record in a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRecordRequest {
    /// The absence date.
    pub date: NaiveDate,
    /// The configured leave type name.
    pub leave_type: String,
}

impl From<LeaveRecordRequest> for LeaveRecord {
    fn from(request: LeaveRecordRequest) -> Self {
        LeaveRecord {
            date: request.date,
            leave_type: request.leave_type,
        }
    }
}

/// Request body for the `POST /calculate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// The employee to compute.
    pub employee: EmployeeRequest,
    /// The period to compute over.
    pub period: PeriodRequest,
    /// Hours actually worked in the period.
    pub worked_hours: Decimal,
    /// Justified absences in the period.
    #[serde(default)]
    pub leave_records: Vec<LeaveRecordRequest>,
}

impl CalculationRequest {
    /// Converts the request into a domain calculation context.
    pub fn into_context(self) -> EmployeeCalculationContext {
        let period = self.period.into();
        batch_context(self.employee, period, self.worked_hours, self.leave_records)
    }
}

/// One employee of a batch run creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEmployeeRequest {
    /// The employee to compute.
    pub employee: EmployeeRequest,
    /// Hours actually worked in the run's period.
    pub worked_hours: Decimal,
    /// Justified absences in the run's period.
    #[serde(default)]
    pub leave_records: Vec<LeaveRecordRequest>,
}

impl BatchEmployeeRequest {
    /// Converts the request into a domain context for the run's period.
    pub fn into_context(self, period: Period) -> EmployeeCalculationContext {
        batch_context(self.employee, period, self.worked_hours, self.leave_records)
    }
}

/// Request body for the `POST /runs` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    /// The period the run covers; applies to every employee.
    pub period: PeriodRequest,
    /// The employees in the batch.
    pub employees: Vec<BatchEmployeeRequest>,
}

fn batch_context(
    employee: EmployeeRequest,
    period: Period,
    worked_hours: Decimal,
    leave_records: Vec<LeaveRecordRequest>,
) -> EmployeeCalculationContext {
    EmployeeCalculationContext {
        employee_id: employee.id,
        unit_id: employee.unit_id,
        base_salary: Money::from_cents(employee.base_salary_cents),
        seniority_years: employee.seniority_years,
        regime: employee.regime,
        period,
        leave_records: leave_records.into_iter().map(Into::into).collect(),
        worked_hours,
    }
}
