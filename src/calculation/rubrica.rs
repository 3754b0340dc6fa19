//! Per-employee rubrica evaluation.
//!
//! This module evaluates the configured earning/deduction rules
//! ("rubricas") for one employee, in strictly ascending order index,
//! maintaining running gross/net accumulators so later rubricas (tax
//! bases in particular) see correct intermediate totals. Amounts are
//! rounded to cents per line item, before accumulation, so the output
//! reconciles line-by-line against a printed payslip.

use rust_decimal::Decimal;

use crate::config::{
    ConfigResolver, EngineConfig, RubricaDefinition, RubricaFormula, TaxBase, keys,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationNote, EmployeeCalculationContext, EmployeeResult, Money, RubricaLine, RubricaSign,
    StagedLedgerDelta,
};

use super::attendance;
use super::ledger::CompensationLedger;
use super::logger::{CalculationLogger, LogRecord};
use super::tax::evaluate_bracket;

/// Running accumulators visible to later rubricas.
struct Accumulators {
    gross: Money,
    deductions: Money,
    net: Money,
    employer_charges: Money,
}

impl Accumulators {
    fn apply(&mut self, sign: RubricaSign, amount: Money) {
        match sign {
            RubricaSign::Credit => {
                self.gross += amount;
                self.net += amount;
            }
            RubricaSign::Debit => {
                self.deductions += amount;
                self.net -= amount;
            }
            RubricaSign::EmployerCharge => {
                self.employer_charges += amount;
            }
        }
    }
}

/// Computes the full result for one employee.
///
/// Evaluation follows the configured rubrica order. A failing rubrica
/// stops evaluation and is *reported*, not thrown: the function returns
/// a partial result with a non-empty `errors` list, so one broken rule
/// never silently corrupts the whole run.
///
/// # Errors
///
/// - [`EngineError::InvalidPeriod`] when the context's period range is
///   reversed; the employee is skipped.
/// - [`EngineError::BracketTableInvalid`] when a referenced table fails
///   validation; fatal for the whole run.
pub fn compute_for_employee(
    context: &EmployeeCalculationContext,
    config: &EngineConfig,
    ledger: &CompensationLedger,
    logger: &CalculationLogger,
) -> EngineResult<EmployeeResult> {
    let resolver = ConfigResolver::new(config, logger);

    let (summary, mut notes, comp_consumed_by_leave) = attendance::summarize(
        context,
        &resolver,
        &config.non_business_days,
        &config.leave_types,
        logger,
    )?;

    // Banked hours available for payout: start from the ledger, minus
    // whatever this period's comp-consuming leave already claims.
    let comp_bank_enabled = resolver
        .resolve(keys::COMP_BANK_ENABLED, &context.employee_id, &context.unit_id)
        .value
        .as_bool()
        .unwrap_or(true);
    let opening_balance = ledger.current_balance(&context.employee_id, context.period.end);
    let mut available_balance = (opening_balance - comp_consumed_by_leave).max(Decimal::ZERO);

    let mut accumulators = Accumulators {
        gross: Money::ZERO,
        deductions: Money::ZERO,
        net: Money::ZERO,
        employer_charges: Money::ZERO,
    };
    let mut lines = Vec::new();
    let mut errors: Vec<CalculationNote> = Vec::new();
    let mut comp_hours_paid = Decimal::ZERO;

    for rubrica in config.rubricas_in_order() {
        let outcome = evaluate_rubrica(
            rubrica,
            context,
            config,
            &summary.expected_hours,
            &mut available_balance,
            &mut comp_hours_paid,
            &accumulators,
            &mut notes,
        );

        let amount = match outcome {
            Ok(amount) => amount,
            Err(err @ EngineError::BracketTableInvalid { .. }) => return Err(err),
            Err(err) => {
                // Report and stop: later rubricas would see wrong totals.
                errors.push(CalculationNote {
                    code: "rubrica_failed".to_string(),
                    message: err.to_string(),
                });
                break;
            }
        };

        accumulators.apply(rubrica.sign, amount);
        lines.push(RubricaLine {
            code: rubrica.code.clone(),
            name: rubrica.name.clone(),
            sign: rubrica.sign,
            amount,
        });

        logger.log(LogRecord {
            employee_id: Some(context.employee_id.clone()),
            key: rubrica.code.clone(),
            resolved_tier: None,
            inputs: serde_json::json!({
                "order": rubrica.order,
                "sign": rubrica.sign,
            }),
            output: serde_json::json!({
                "amount_cents": amount.cents(),
                "gross_so_far_cents": accumulators.gross.cents(),
                "net_so_far_cents": accumulators.net.cents(),
            }),
        });
    }

    // Deficits beyond the banked balance need the advance flag; surface
    // the violation here so the run transition can gate on it, rather
    // than failing later at close.
    let staged_delta = StagedLedgerDelta {
        overtime_hours: summary.overtime_delta,
        consumed_hours: comp_consumed_by_leave + comp_hours_paid,
    };
    let allow_negative = resolver
        .resolve(
            keys::ALLOW_NEGATIVE_BALANCE,
            &context.employee_id,
            &context.unit_id,
        )
        .value
        .as_bool()
        .unwrap_or(false);
    let staged_net = if comp_bank_enabled {
        staged_delta.net_hours()
    } else {
        Decimal::ZERO
    };
    if opening_balance + staged_net < Decimal::ZERO && !allow_negative {
        errors.push(CalculationNote {
            code: "negative_balance".to_string(),
            message: EngineError::NegativeBalanceViolation {
                employee_id: context.employee_id.clone(),
                balance: opening_balance,
                requested: -staged_net,
            }
            .to_string(),
        });
    }

    Ok(EmployeeResult {
        employee_id: context.employee_id.clone(),
        period: context.period,
        attendance: summary,
        lines,
        gross: accumulators.gross,
        deductions: accumulators.deductions,
        net: accumulators.net,
        employer_charges: accumulators.employer_charges,
        staged_delta: if comp_bank_enabled {
            staged_delta
        } else {
            StagedLedgerDelta {
                overtime_hours: Decimal::ZERO,
                consumed_hours: Decimal::ZERO,
            }
        },
        notes,
        errors,
    })
}

/// Evaluates one rubrica to a rounded cent amount.
#[allow(clippy::too_many_arguments)]
fn evaluate_rubrica(
    rubrica: &RubricaDefinition,
    context: &EmployeeCalculationContext,
    config: &EngineConfig,
    expected_hours: &Decimal,
    available_balance: &mut Decimal,
    comp_hours_paid: &mut Decimal,
    accumulators: &Accumulators,
    notes: &mut Vec<CalculationNote>,
) -> EngineResult<Money> {
    let rounding = config.rounding;
    match &rubrica.formula {
        RubricaFormula::BaseSalary => Ok(context.base_salary),
        RubricaFormula::FixedAmount { amount } => Ok(*amount),
        RubricaFormula::PercentOfBase { rate } => {
            Money::from_decimal(context.base_salary.to_decimal() * rate, rounding)
        }
        RubricaFormula::PercentOfGross { rate } => {
            Money::from_decimal(accumulators.gross.to_decimal() * rate, rounding)
        }
        RubricaFormula::SeniorityBonus { rate_per_year } => Money::from_decimal(
            context.base_salary.to_decimal()
                * rate_per_year
                * Decimal::from(context.seniority_years),
            rounding,
        ),
        RubricaFormula::HourlyRate { hours } => {
            if expected_hours.is_zero() {
                return Err(EngineError::RubricaFailed {
                    code: rubrica.code.clone(),
                    message: "cannot derive hourly value: expected hours is zero".to_string(),
                });
            }
            let hourly_value = context.base_salary.to_decimal() / expected_hours;
            Money::from_decimal(hourly_value * hours, rounding)
        }
        RubricaFormula::CompensatoryPayout { requested_hours } => {
            if requested_hours.is_sign_negative() {
                return Err(EngineError::RubricaFailed {
                    code: rubrica.code.clone(),
                    message: format!("requested payout of {requested_hours} hours is negative"),
                });
            }
            if expected_hours.is_zero() {
                return Err(EngineError::RubricaFailed {
                    code: rubrica.code.clone(),
                    message: "cannot derive hourly value: expected hours is zero".to_string(),
                });
            }
            // Cannot pay out more than the banked balance.
            let paid_hours = if *requested_hours > *available_balance {
                notes.push(CalculationNote {
                    code: "capped".to_string(),
                    message: format!(
                        "compensatory payout capped at banked balance: requested \
                         {requested_hours}h, available {available_balance}h"
                    ),
                });
                *available_balance
            } else {
                *requested_hours
            };
            *available_balance -= paid_hours;
            *comp_hours_paid += paid_hours;

            let hourly_value = context.base_salary.to_decimal() / expected_hours;
            Money::from_decimal(hourly_value * paid_hours, rounding)
        }
        RubricaFormula::TaxBracket { table, base } => {
            let bracket_table =
                config
                    .bracket_tables
                    .get(table)
                    .ok_or_else(|| EngineError::BracketTableInvalid {
                        table: table.clone(),
                        message: format!("referenced by rubrica '{}' but not defined", rubrica.code),
                    })?;
            let base_amount = match base {
                TaxBase::GrossSoFar => accumulators.gross,
                TaxBase::NetSoFar => accumulators.net,
                TaxBase::BaseSalary => context.base_salary,
            };
            evaluate_bracket(bracket_table, table, base_amount, rounding)
        }
    }
}
