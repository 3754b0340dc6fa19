//! HTTP API module for the payroll calculation engine.
//!
//! This module provides the REST endpoints for per-employee calculation,
//! payroll run lifecycle management, the calculation trace, and engine
//! configuration.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    BatchEmployeeRequest, CalculationRequest, CreateRunRequest, EmployeeRequest,
    LeaveRecordRequest, PeriodRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::{AppState, RunEntry};
