//! The calculation core: attendance, banked hours, brackets, rubricas,
//! and the payroll run lifecycle.

pub mod attendance;
pub mod ledger;
pub mod logger;
pub mod rubrica;
pub mod run;
pub mod tax;

pub use attendance::{
    classify_absence, daily_hours, expected_working_days, overtime_delta, summarize,
    AbsenceClassification, DailyHoursResult,
};
pub use ledger::CompensationLedger;
pub use logger::{CalculationLogEntry, CalculationLogger, LogRecord};
pub use rubrica::compute_for_employee;
pub use run::{PayrollRun, RunState, StateTransition};
pub use tax::evaluate_bracket;
