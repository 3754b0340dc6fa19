//! Response types for the payroll engine API.
//!
//! Defines the error response structure and the mapping from engine
//! errors to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{EmployeeFailure, EngineError};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-employee failures when a batch compute was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<EmployeeFailure>>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            failures: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
            failures: None,
        }
    }

    /// Creates a rejected-compute error carrying the failure list.
    pub fn compute_rejected(failures: Vec<EmployeeFailure>) -> Self {
        Self {
            code: "COMPUTE_REJECTED".to_string(),
            message: format!("{} employee(s) failed to compute", failures.len()),
            details: None,
            failures: Some(failures),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::ConfigNotFound { path } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    format!("Configuration file not found: {}", path),
                ),
            },
            EngineError::ConfigParseError { path, message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration parse error",
                    format!("Failed to parse {}: {}", path, message),
                ),
            },
            EngineError::InvalidPeriod { start, end } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_PERIOD",
                    format!("Invalid period: {} to {}", start, end),
                    "The period start date must not be after the end date",
                ),
            },
            EngineError::BracketTableInvalid { table, message } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::with_details(
                    "BRACKET_TABLE_INVALID",
                    format!("Bracket table '{}' is invalid", table),
                    message,
                ),
            },
            EngineError::NegativeBalanceViolation {
                employee_id,
                balance,
                requested,
            } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::with_details(
                    "NEGATIVE_BALANCE",
                    format!("Banked-hours balance of '{}' would go negative", employee_id),
                    format!("balance {} hours, requested {} hours", balance, requested),
                ),
            },
            EngineError::ConcurrentStateTransition { run_id } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::with_details(
                    "CONCURRENT_STATE_TRANSITION",
                    format!("Run {} is being transitioned by another request", run_id),
                    "Retry the request once the in-flight transition completes",
                ),
            },
            EngineError::InvalidTransition { from, to } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::new(
                    "INVALID_TRANSITION",
                    format!("Cannot transition a {} run to {}", from, to),
                ),
            },
            EngineError::RunClosed { run_id } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::with_details(
                    "RUN_CLOSED",
                    format!("Run {} is closed", run_id),
                    "Closed runs are immutable; reopen the run first",
                ),
            },
            EngineError::RunNotFound { run_id } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new("RUN_NOT_FOUND", format!("Run not found: {}", run_id)),
            },
            EngineError::RubricaFailed { code, message } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::with_details(
                    "RUBRICA_FAILED",
                    format!("Rubrica '{}' failed to evaluate", code),
                    message,
                ),
            },
            EngineError::ComputeRejected { failures } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::compute_rejected(failures),
            },
            EngineError::CalculationError { message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("CALCULATION_ERROR", "Calculation failed", message),
            },
        }
    }
}
