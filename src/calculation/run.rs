//! Payroll run lifecycle and batch aggregation.
//!
//! A [`PayrollRun`] is the unit of monthly processing: a period, a state
//! machine (`draft -> computed -> closed -> reopened`), and the computed
//! result set. Batch computation fans out across a scoped worker pool and
//! only aggregates totals once every employee result is in, so a partial
//! batch can never leak half-summed totals.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EmployeeFailure, EngineError, EngineResult};
use crate::models::{
    ComputeFailureReport, EmployeeCalculationContext, PayrollRunResult, Period, RunTotals,
};

use super::ledger::CompensationLedger;
use super::logger::CalculationLogger;
use super::rubrica;

/// Lifecycle state of a payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, not yet successfully computed.
    Draft,
    /// Computed; results present but not yet committed.
    Computed,
    /// Closed; results immutable, ledger deltas committed.
    Closed,
    /// Reopened after closing; behaves as draft, prior result archived.
    Reopened,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Draft => "draft",
            RunState::Computed => "computed",
            RunState::Closed => "closed",
            RunState::Reopened => "reopened",
        };
        write!(f, "{name}")
    }
}

/// One recorded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State before the transition.
    pub from: RunState,
    /// State after the transition.
    pub to: RunState,
    /// When the transition happened.
    pub at: chrono::DateTime<Utc>,
}

/// A monthly payroll run for one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Unique identifier of the run.
    pub id: Uuid,
    /// The period this run covers.
    pub period: Period,
    /// Current lifecycle state.
    pub state: RunState,
    /// Every transition this run went through, oldest first.
    pub history: Vec<StateTransition>,
    /// The current computed result, if any.
    pub result: Option<PayrollRunResult>,
    /// Results superseded by a reopen, kept for audit.
    pub superseded_results: Vec<PayrollRunResult>,
    /// The failure report of the last rejected compute attempt, if any.
    pub last_failure: Option<ComputeFailureReport>,
}

impl PayrollRun {
    /// Creates a new run in `draft` for the given period.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPeriod`] when the period range is reversed.
    pub fn new(period: Period) -> EngineResult<Self> {
        period.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            period,
            state: RunState::Draft,
            history: Vec::new(),
            result: None,
            superseded_results: Vec::new(),
            last_failure: None,
        })
    }

    fn transition(&mut self, to: RunState) {
        self.history.push(StateTransition {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
    }

    /// Computes the run for a batch of employees.
    ///
    /// Allowed from `draft` and `reopened`; recomputing a `computed` run
    /// is allowed (and idempotent) as long as it has not been closed.
    /// Per-employee computation fans out across at most `workers` scoped
    /// threads; all workers are joined before anything is aggregated, and
    /// results come back in input order regardless of which worker
    /// finished first.
    ///
    /// If any employee fails, the state does not change, the failure
    /// report is retained on the run, and [`EngineError::ComputeRejected`]
    /// carries the failure list. Totals are only ever derived from a
    /// complete result set.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RunClosed`] when the run is closed.
    /// - [`EngineError::BracketTableInvalid`] when the configuration's
    ///   bracket tables fail validation; rejected before any employee is
    ///   computed.
    /// - [`EngineError::ComputeRejected`] when one or more employees
    ///   failed; the others' results are discarded.
    pub fn compute(
        &mut self,
        contexts: &[EmployeeCalculationContext],
        config: &EngineConfig,
        ledger: &CompensationLedger,
        logger: &CalculationLogger,
        workers: usize,
    ) -> EngineResult<&PayrollRunResult> {
        if self.state == RunState::Closed {
            return Err(EngineError::RunClosed { run_id: self.id });
        }
        config.validate()?;

        let attempt_id = Uuid::new_v4();
        let attempt_logger = logger.with_attempt(attempt_id);

        let worker_count = workers.clamp(1, contexts.len().max(1));
        let chunk_size = contexts.len().div_ceil(worker_count).max(1);

        let mut indexed: Vec<(usize, EngineResult<_>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = contexts
                .chunks(chunk_size)
                .enumerate()
                .map(|(chunk_index, chunk)| {
                    let attempt_logger = &attempt_logger;
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .enumerate()
                            .map(|(offset, context)| {
                                (
                                    chunk_index * chunk_size + offset,
                                    rubrica::compute_for_employee(
                                        context,
                                        config,
                                        ledger,
                                        attempt_logger,
                                    ),
                                )
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            // The joins are the barrier: nothing below runs until every
            // worker has delivered its slice.
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });
        indexed.sort_by_key(|(index, _)| *index);

        let mut results = Vec::with_capacity(contexts.len());
        let mut failures: Vec<EmployeeFailure> = Vec::new();
        for (index, outcome) in indexed {
            match outcome {
                Ok(result) if result.is_complete() => results.push(result),
                Ok(result) => {
                    let first = result.errors.first();
                    failures.push(EmployeeFailure {
                        employee_id: result.employee_id.clone(),
                        code: first.map(|e| e.code.clone()).unwrap_or_default(),
                        reason: first.map(|e| e.message.clone()).unwrap_or_default(),
                    });
                }
                Err(err @ EngineError::BracketTableInvalid { .. }) => return Err(err),
                Err(err) => failures.push(EmployeeFailure {
                    employee_id: contexts[index].employee_id.clone(),
                    code: failure_code(&err).to_string(),
                    reason: err.to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            self.last_failure = Some(ComputeFailureReport {
                attempt_id,
                failures: failures.clone(),
            });
            return Err(EngineError::ComputeRejected { failures });
        }

        let totals = RunTotals::from_results(&results);
        self.result = Some(PayrollRunResult {
            attempt_id,
            computed_at: Utc::now(),
            results,
            totals,
        });
        self.last_failure = None;
        self.transition(RunState::Computed);
        // Set two lines above; the unwrap-free accessor keeps the
        // signature honest for callers holding a shared reference.
        self.result
            .as_ref()
            .ok_or_else(|| EngineError::CalculationError {
                message: "computed result missing after transition".to_string(),
            })
    }

    /// Closes the run, committing the staged ledger deltas exactly once.
    ///
    /// Closing a closed run is a no-op. The banked-hours deltas were
    /// already validated against the advance flag during compute, so the
    /// commit itself never rejects.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTransition`] when the run has no computed
    /// result to close.
    pub fn close(&mut self, ledger: &CompensationLedger) -> EngineResult<()> {
        match self.state {
            RunState::Closed => Ok(()),
            RunState::Computed => {
                if let Some(run_result) = &self.result {
                    for result in &run_result.results {
                        let delta = result.staged_delta.net_hours();
                        if !delta.is_zero() {
                            ledger.apply_delta(
                                &result.employee_id,
                                result.period.end,
                                delta,
                                true,
                            )?;
                        }
                    }
                }
                self.transition(RunState::Closed);
                Ok(())
            }
            from => Err(EngineError::InvalidTransition {
                from,
                to: RunState::Closed,
            }),
        }
    }

    /// Reopens a closed run for recomputation.
    ///
    /// The computed result moves to the audit trail and its committed
    /// ledger deltas are backed out, so the eventual re-close books the
    /// recomputed deltas without double counting.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTransition`] when the run is not closed.
    pub fn reopen(&mut self, ledger: &CompensationLedger) -> EngineResult<()> {
        if self.state != RunState::Closed {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to: RunState::Reopened,
            });
        }
        if let Some(run_result) = self.result.take() {
            for result in &run_result.results {
                let delta = result.staged_delta.net_hours();
                if !delta.is_zero() {
                    ledger.apply_delta(&result.employee_id, result.period.end, -delta, true)?;
                }
            }
            self.superseded_results.push(run_result);
        }
        self.transition(RunState::Reopened);
        Ok(())
    }
}

fn failure_code(err: &EngineError) -> &'static str {
    match err {
        EngineError::InvalidPeriod { .. } => "invalid_period",
        EngineError::NegativeBalanceViolation { .. } => "negative_balance",
        EngineError::RubricaFailed { .. } => "rubrica_failed",
        _ => "calculation_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        InstitutionMetadata, RubricaDefinition, RubricaFormula, TaxBase, TaxBracketRow,
        TaxBracketTable,
    };
    use crate::models::{Money, RoundingPolicy, RubricaSign, ShiftStructure, WorkRegime};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn march_2026() -> Period {
        Period {
            start: date(2026, 3, 1),
            end: date(2026, 3, 31),
        }
    }

    fn test_config() -> EngineConfig {
        let mut bracket_tables = HashMap::new();
        bracket_tables.insert(
            "irrf".to_string(),
            TaxBracketTable {
                rows: vec![
                    TaxBracketRow {
                        lower: Money::ZERO,
                        upper: Some(Money::from_cents(200_000)),
                        rate: Decimal::ZERO,
                        deduction: Money::ZERO,
                    },
                    TaxBracketRow {
                        lower: Money::from_cents(200_000),
                        upper: None,
                        rate: dec("0.10"),
                        deduction: Money::from_cents(20_000),
                    },
                ],
            },
        );
        EngineConfig {
            institution: InstitutionMetadata {
                code: "inst_001".to_string(),
                name: "Test Institution".to_string(),
                version: "2026-01-01".to_string(),
            },
            defaults: HashMap::new(),
            unit_overrides: HashMap::new(),
            employee_overrides: HashMap::new(),
            leave_types: HashMap::new(),
            non_business_days: vec![],
            rubricas: vec![
                RubricaDefinition {
                    code: "salario_base".to_string(),
                    name: "Salário base".to_string(),
                    sign: RubricaSign::Credit,
                    order: 10,
                    formula: RubricaFormula::BaseSalary,
                },
                RubricaDefinition {
                    code: "irrf".to_string(),
                    name: "IRRF".to_string(),
                    sign: RubricaSign::Debit,
                    order: 20,
                    formula: RubricaFormula::TaxBracket {
                        table: "irrf".to_string(),
                        base: TaxBase::GrossSoFar,
                    },
                },
            ],
            bracket_tables,
            rounding: RoundingPolicy::HalfUp,
        }
    }

    fn context(employee_id: &str, salary_cents: i64, worked_hours: i64) -> EmployeeCalculationContext {
        EmployeeCalculationContext {
            employee_id: employee_id.to_string(),
            unit_id: "unit_hr".to_string(),
            base_salary: Money::from_cents(salary_cents),
            seniority_years: 0,
            regime: Some(WorkRegime {
                structure: ShiftStructure::Single {
                    daily_hours: Decimal::from(6),
                },
                effective_from: date(2026, 1, 1),
                superseded_on: None,
            }),
            period: march_2026(),
            leave_records: vec![],
            // March 2026 has 22 working days at 6h = 132 expected hours.
            worked_hours: Decimal::from(worked_hours),
        }
    }

    #[test]
    fn test_new_run_starts_in_draft() {
        let run = PayrollRun::new(march_2026()).unwrap();
        assert_eq!(run.state, RunState::Draft);
        assert!(run.result.is_none());
        assert!(run.history.is_empty());
    }

    #[test]
    fn test_new_run_rejects_reversed_period() {
        let result = PayrollRun::new(Period {
            start: date(2026, 3, 31),
            end: date(2026, 3, 1),
        });
        assert!(matches!(
            result.unwrap_err(),
            EngineError::InvalidPeriod { .. }
        ));
    }

    #[test]
    fn test_compute_transitions_to_computed_with_totals() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![
            context("emp_001", 300_000, 132),
            context("emp_002", 150_000, 132),
        ];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        run.compute(&contexts, &test_config(), &ledger, &logger, 2)
            .unwrap();

        assert_eq!(run.state, RunState::Computed);
        let result = run.result.as_ref().unwrap();
        assert_eq!(result.totals.headcount, 2);
        assert_eq!(result.totals.gross, Money::from_cents(450_000));
        assert_eq!(result.totals.deductions, Money::from_cents(10_000));
        assert_eq!(result.totals.net, Money::from_cents(440_000));
    }

    #[test]
    fn test_results_come_back_in_input_order() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts: Vec<_> = (0..9)
            .map(|i| context(&format!("emp_{i:03}"), 100_000 + i * 1_000, 132))
            .collect();
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        let result = run
            .compute(&contexts, &test_config(), &ledger, &logger, 4)
            .unwrap();

        let ids: Vec<_> = result.results.iter().map(|r| r.employee_id.as_str()).collect();
        let expected: Vec<String> = (0..9).map(|i| format!("emp_{i:03}")).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_totals_equal_sum_of_employee_fields() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![
            context("emp_001", 300_000, 132),
            context("emp_002", 250_001, 132),
            context("emp_003", 199_999, 132),
        ];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        let result = run
            .compute(&contexts, &test_config(), &ledger, &logger, 3)
            .unwrap();

        let net_sum: Money = result.results.iter().map(|r| r.net).sum();
        let gross_sum: Money = result.results.iter().map(|r| r.gross).sum();
        assert_eq!(result.totals.net, net_sum);
        assert_eq!(result.totals.gross, gross_sum);
        assert_eq!(
            result.totals.net,
            result.totals.gross - result.totals.deductions
        );
    }

    #[test]
    fn test_recompute_is_idempotent_before_close() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![context("emp_001", 300_000, 132)];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();
        let config = test_config();

        let first = run
            .compute(&contexts, &config, &ledger, &logger, 1)
            .unwrap()
            .clone();
        let second = run
            .compute(&contexts, &config, &ledger, &logger, 1)
            .unwrap()
            .clone();

        assert_eq!(first.results, second.results);
        assert_eq!(first.totals, second.totals);
        assert_ne!(first.attempt_id, second.attempt_id);
    }

    #[test]
    fn test_compute_rejected_when_an_employee_fails() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let mut bad = context("emp_002", 150_000, 132);
        bad.period = Period {
            start: date(2026, 3, 31),
            end: date(2026, 3, 1),
        };
        let contexts = vec![context("emp_001", 300_000, 132), bad];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        let err = run
            .compute(&contexts, &test_config(), &ledger, &logger, 2)
            .unwrap_err();

        match err {
            EngineError::ComputeRejected { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].employee_id, "emp_002");
                assert_eq!(failures[0].code, "invalid_period");
            }
            other => panic!("Expected ComputeRejected, got {:?}", other),
        }
        assert_eq!(run.state, RunState::Draft);
        assert!(run.result.is_none());
        assert!(run.last_failure.is_some());
    }

    #[test]
    fn test_invalid_bracket_table_rejects_whole_run() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let mut config = test_config();
        config
            .bracket_tables
            .get_mut("irrf")
            .unwrap()
            .rows
            .remove(0);
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        let err = run
            .compute(
                &[context("emp_001", 300_000, 132)],
                &config,
                &ledger,
                &logger,
                1,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::BracketTableInvalid { .. }));
        assert_eq!(run.state, RunState::Draft);
    }

    #[test]
    fn test_close_commits_staged_deltas_exactly_once() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        // 140 worked vs 132 expected = +8h staged overtime.
        let contexts = vec![context("emp_001", 300_000, 140)];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        run.compute(&contexts, &test_config(), &ledger, &logger, 1)
            .unwrap();
        assert_eq!(
            ledger.current_balance("emp_001", date(2026, 12, 31)),
            Decimal::ZERO
        );

        run.close(&ledger).unwrap();
        assert_eq!(run.state, RunState::Closed);
        assert_eq!(
            ledger.current_balance("emp_001", date(2026, 12, 31)),
            Decimal::from(8)
        );

        // Idempotent: a second close books nothing.
        run.close(&ledger).unwrap();
        assert_eq!(
            ledger.current_balance("emp_001", date(2026, 12, 31)),
            Decimal::from(8)
        );
    }

    #[test]
    fn test_close_from_draft_is_invalid() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let ledger = CompensationLedger::new();
        let err = run.close(&ledger).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: RunState::Draft,
                to: RunState::Closed,
            }
        ));
    }

    #[test]
    fn test_compute_on_closed_run_returns_run_closed() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![context("emp_001", 300_000, 132)];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();
        let config = test_config();

        run.compute(&contexts, &config, &ledger, &logger, 1).unwrap();
        run.close(&ledger).unwrap();

        let err = run
            .compute(&contexts, &config, &ledger, &logger, 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::RunClosed { run_id } if run_id == run.id));
    }

    #[test]
    fn test_reopen_archives_result_and_backs_out_deltas() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![context("emp_001", 300_000, 140)];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();
        let config = test_config();

        run.compute(&contexts, &config, &ledger, &logger, 1).unwrap();
        run.close(&ledger).unwrap();
        run.reopen(&ledger).unwrap();

        assert_eq!(run.state, RunState::Reopened);
        assert!(run.result.is_none());
        assert_eq!(run.superseded_results.len(), 1);
        assert_eq!(
            ledger.current_balance("emp_001", date(2026, 12, 31)),
            Decimal::ZERO
        );

        // Recompute and re-close: the committed delta is booked once.
        run.compute(&contexts, &config, &ledger, &logger, 1).unwrap();
        run.close(&ledger).unwrap();
        assert_eq!(
            ledger.current_balance("emp_001", date(2026, 12, 31)),
            Decimal::from(8)
        );
    }

    #[test]
    fn test_reopen_requires_closed() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let ledger = CompensationLedger::new();
        let err = run.reopen(&ledger).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: RunState::Draft,
                to: RunState::Reopened,
            }
        ));
    }

    #[test]
    fn test_history_records_every_transition() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![context("emp_001", 300_000, 132)];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();
        let config = test_config();

        run.compute(&contexts, &config, &ledger, &logger, 1).unwrap();
        run.close(&ledger).unwrap();
        run.reopen(&ledger).unwrap();

        let transitions: Vec<_> = run.history.iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            transitions,
            vec![
                (RunState::Draft, RunState::Computed),
                (RunState::Computed, RunState::Closed),
                (RunState::Closed, RunState::Reopened),
            ]
        );
    }

    #[test]
    fn test_attempt_id_tags_log_entries() {
        let mut run = PayrollRun::new(march_2026()).unwrap();
        let contexts = vec![context("emp_001", 300_000, 132)];
        let ledger = CompensationLedger::new();
        let logger = CalculationLogger::new();

        let attempt_id = run
            .compute(&contexts, &test_config(), &ledger, &logger, 1)
            .unwrap()
            .attempt_id;

        let entries = logger.all();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.attempt_id == Some(attempt_id)));
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Draft.to_string(), "draft");
        assert_eq!(RunState::Computed.to_string(), "computed");
        assert_eq!(RunState::Closed.to_string(), "closed");
        assert_eq!(RunState::Reopened.to_string(), "reopened");
    }
}
