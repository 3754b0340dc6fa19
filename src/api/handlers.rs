//! HTTP request handlers for the payroll engine API.
//!
//! This module contains the handler functions for all API endpoints and
//! the router wiring them to the shared state.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{PayrollRun, compute_for_employee};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::Period;

use super::request::{CalculationRequest, CreateRunRequest};
use super::response::{ApiError, ApiErrorResponse};
use super::state::{AppState, RunEntry};

/// Worker threads used for batch computation.
const BATCH_WORKERS: usize = 4;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .route("/runs", post(create_run_handler))
        .route("/runs/:id", get(get_run_handler))
        .route("/runs/:id/compute", post(compute_run_handler))
        .route("/runs/:id/close", post(close_run_handler))
        .route("/runs/:id/reopen", post(reopen_run_handler))
        .route("/logs", get(get_logs_handler).delete(clear_logs_handler))
        .route("/engine-config", put(replace_config_handler))
        .with_state(state)
}

fn engine_error(error: EngineError) -> Response {
    let api_error: ApiErrorResponse = error.into();
    api_error.into_response()
}

fn rejection_error(rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(error = %body_text, "JSON data error");
            if body_text.contains("missing field") {
                ApiError::new("VALIDATION_ERROR", body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error),
    )
        .into_response()
}

/// Handler for `POST /calculate`: computes a single employee.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_error(rejection),
    };

    let context = request.into_context();
    info!(
        correlation_id = %correlation_id,
        employee_id = %context.employee_id,
        "Processing calculation request"
    );

    let config = state.config_snapshot();
    match compute_for_employee(&context, &config, state.ledger(), state.logger()) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %result.employee_id,
                net_cents = result.net.cents(),
                complete = result.is_complete(),
                "Calculation completed"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Calculation failed");
            engine_error(err)
        }
    }
}

/// Handler for `POST /runs`: creates a draft run with a frozen context
/// snapshot.
async fn create_run_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateRunRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_error(rejection),
    };

    let period: Period = request.period.into();
    let run = match PayrollRun::new(period) {
        Ok(run) => run,
        Err(err) => return engine_error(err),
    };
    let contexts = request
        .employees
        .into_iter()
        .map(|employee| employee.into_context(period))
        .collect::<Vec<_>>();

    info!(run_id = %run.id, employees = contexts.len(), "Created payroll run");
    let response = run.clone();
    state.insert_run(RunEntry { run, contexts });
    (StatusCode::CREATED, Json(response)).into_response()
}

/// Handler for `GET /runs/{id}`: state, history and result.
async fn get_run_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let entry = match state.run(id) {
        Ok(entry) => entry,
        Err(err) => return engine_error(err),
    };
    let guard = entry.lock().unwrap_or_else(|e| e.into_inner());
    (StatusCode::OK, Json(guard.run.clone())).into_response()
}

/// Handler for `POST /runs/{id}/compute`.
///
/// A contended transition returns 409 rather than blocking; a rejected
/// batch returns 422 with the per-employee failure list.
async fn compute_run_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let entry = match state.run(id) {
        Ok(entry) => entry,
        Err(err) => return engine_error(err),
    };
    let Ok(mut guard) = entry.try_lock() else {
        return engine_error(EngineError::ConcurrentStateTransition { run_id: id });
    };

    let config = state.config_snapshot();
    let RunEntry { run, contexts } = &mut *guard;
    let outcome = run
        .compute(contexts, &config, state.ledger(), state.logger(), BATCH_WORKERS)
        .map(|result| (result.attempt_id, result.totals.headcount, result.totals.net));
    match outcome {
        Ok((attempt_id, headcount, net)) => {
            info!(
                run_id = %id,
                attempt_id = %attempt_id,
                headcount = headcount,
                net_cents = net.cents(),
                "Payroll run computed"
            );
            (StatusCode::OK, Json(run.clone())).into_response()
        }
        Err(err) => {
            warn!(run_id = %id, error = %err, "Payroll run compute rejected");
            engine_error(err)
        }
    }
}

/// Handler for `POST /runs/{id}/close`.
async fn close_run_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    lifecycle_action(state, id, "closed", |run, state| run.close(state.ledger()))
}

/// Handler for `POST /runs/{id}/reopen`.
async fn reopen_run_handler(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    lifecycle_action(state, id, "reopened", |run, state| run.reopen(state.ledger()))
}

fn lifecycle_action(
    state: AppState,
    id: Uuid,
    action: &str,
    apply: impl FnOnce(&mut PayrollRun, &AppState) -> Result<(), EngineError>,
) -> Response {
    let entry = match state.run(id) {
        Ok(entry) => entry,
        Err(err) => return engine_error(err),
    };
    let Ok(mut guard) = entry.try_lock() else {
        return engine_error(EngineError::ConcurrentStateTransition { run_id: id });
    };

    match apply(&mut guard.run, &state) {
        Ok(()) => {
            info!(run_id = %id, state = %guard.run.state, "Payroll run {}", action);
            (StatusCode::OK, Json(guard.run.clone())).into_response()
        }
        Err(err) => {
            warn!(run_id = %id, error = %err, "Lifecycle transition failed");
            engine_error(err)
        }
    }
}

/// Handler for `GET /logs`: a finite snapshot of the calculation trace.
async fn get_logs_handler(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.logger().all())).into_response()
}

/// Handler for `DELETE /logs`: clears the trace between runs.
async fn clear_logs_handler(State(state): State<AppState>) -> Response {
    state.logger().clear();
    info!("Calculation trace cleared");
    StatusCode::NO_CONTENT.into_response()
}

/// Handler for `PUT /engine-config`: replaces the shared configuration
/// snapshot. In-flight computations keep the snapshot they started with.
async fn replace_config_handler(
    State(state): State<AppState>,
    payload: Result<Json<EngineConfig>, JsonRejection>,
) -> Response {
    let config = match payload {
        Ok(Json(config)) => config,
        Err(rejection) => return rejection_error(rejection),
    };
    if let Err(err) = config.validate() {
        warn!(error = %err, "Rejected engine configuration");
        return engine_error(err);
    }

    info!(
        institution = %config.institution.code,
        version = %config.institution.version,
        "Engine configuration replaced"
    );
    state.replace_config(config);
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::EmployeeResult;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/engine.yaml").expect("Failed to load config");
        AppState::new(config)
    }

    fn json_request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(body.into())
            .unwrap()
    }

    fn calculate_body() -> String {
        r#"{
            "employee": {
                "id": "emp_001",
                "unit_id": "unit_hr",
                "base_salary_cents": 300000,
                "regime": {
                    "shifts": "single",
                    "daily_hours": "6",
                    "effective_from": "2026-01-01"
                }
            },
            "period": { "start": "2026-03-01", "end": "2026-03-31" },
            "worked_hours": "132"
        }"#
        .to_string()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_calculate_valid_request_returns_200() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(json_request("POST", "/calculate", calculate_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result: EmployeeResult = body_json(response).await;
        assert_eq!(result.employee_id, "emp_001");
        assert!(result.is_complete());
        // March 2026: 22 working days at 6h, net = 300000 - 10000.
        assert_eq!(result.net.cents(), 290_000);
    }

    #[tokio::test]
    async fn test_calculate_malformed_json_returns_400() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(json_request("POST", "/calculate", "{invalid json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_calculate_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());

        let body = r#"{
            "employee": { "unit_id": "unit_hr", "base_salary_cents": 300000 },
            "period": { "start": "2026-03-01", "end": "2026-03-31" },
            "worked_hours": "132"
        }"#;
        let response = router
            .oneshot(json_request("POST", "/calculate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = body_json(response).await;
        assert!(
            error.message.contains("missing field") || error.message.contains("id"),
            "unexpected message: {}",
            error.message
        );
    }

    #[tokio::test]
    async fn test_run_lifecycle_through_endpoints() {
        let router = create_router(create_test_state());

        let create_body = r#"{
            "period": { "start": "2026-03-01", "end": "2026-03-31" },
            "employees": [
                {
                    "employee": {
                        "id": "emp_001",
                        "unit_id": "unit_hr",
                        "base_salary_cents": 300000,
                        "regime": {
                            "shifts": "single",
                            "daily_hours": "6",
                            "effective_from": "2026-01-01"
                        }
                    },
                    "worked_hours": "132"
                }
            ]
        }"#;

        let response = router
            .clone()
            .oneshot(json_request("POST", "/runs", create_body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let run: PayrollRun = body_json(response).await;
        assert_eq!(run.state.to_string(), "draft");

        let response = router
            .clone()
            .oneshot(json_request("POST", &format!("/runs/{}/compute", run.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let computed: PayrollRun = body_json(response).await;
        assert_eq!(computed.state.to_string(), "computed");
        assert_eq!(computed.result.as_ref().unwrap().totals.headcount, 1);

        let response = router
            .clone()
            .oneshot(json_request("POST", &format!("/runs/{}/close", run.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let closed: PayrollRun = body_json(response).await;
        assert_eq!(closed.state.to_string(), "closed");

        let response = router
            .clone()
            .oneshot(json_request("POST", &format!("/runs/{}/reopen", run.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reopened: PayrollRun = body_json(response).await;
        assert_eq!(reopened.state.to_string(), "reopened");
        assert_eq!(reopened.superseded_results.len(), 1);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/runs/{}", run.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: PayrollRun = body_json(response).await;
        assert_eq!(fetched.history.len(), 3);
    }

    #[tokio::test]
    async fn test_compute_unknown_run_returns_404() {
        let router = create_router(create_test_state());

        let response = router
            .oneshot(json_request(
                "POST",
                &format!("/runs/{}/compute", Uuid::new_v4()),
                "",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "RUN_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_logs_endpoint_snapshot_and_clear() {
        let router = create_router(create_test_state());

        router
            .clone()
            .oneshot(json_request("POST", "/calculate", calculate_body()))
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/logs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let entries: Vec<serde_json::Value> = body_json(response).await;
        assert!(!entries.is_empty());

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/logs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/logs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let entries: Vec<serde_json::Value> = body_json(response).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_replace_config_rejects_invalid_bracket_table() {
        let router = create_router(create_test_state());

        let mut config = ConfigLoader::load("./config/engine.yaml").unwrap();
        config
            .bracket_tables
            .values_mut()
            .next()
            .unwrap()
            .rows
            .clear();
        let body = serde_json::to_string(&config).unwrap();

        let response = router
            .oneshot(json_request("PUT", "/engine-config", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error: ApiError = body_json(response).await;
        assert_eq!(error.code, "BRACKET_TABLE_INVALID");
    }

    #[tokio::test]
    async fn test_replace_config_swaps_snapshot() {
        let state = create_test_state();
        let router = create_router(state.clone());

        let mut config = ConfigLoader::load("./config/engine.yaml").unwrap();
        config.institution.version = "2026-06-01".to_string();
        let body = serde_json::to_string(&config).unwrap();

        let response = router
            .oneshot(json_request("PUT", "/engine-config", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.config_snapshot().institution.version, "2026-06-01");
    }
}
