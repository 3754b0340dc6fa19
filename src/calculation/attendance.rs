//! Attendance computations.
//!
//! This module turns resolved calendar and regime configuration into
//! expected working days, daily hour targets, absence classification,
//! and the signed overtime delta fed into the compensation bank.

use rust_decimal::Decimal;

use crate::config::{ConfigResolver, keys};
use crate::error::EngineResult;
use crate::models::{
    AttendanceSummary, CalculationNote, EmployeeCalculationContext, LeaveType, NonBusinessDay,
    Period, ShiftStructure, WorkRegime, is_weekend,
};

use super::logger::{CalculationLogger, LogRecord};

/// Single-shift regimes are capped at this many daily hours; above it
/// the regime is treated as two-shift.
const SINGLE_SHIFT_MAX_HOURS: u32 = 6;

/// Hours of a two-shift working day.
const TWO_SHIFT_HOURS: u32 = 8;

/// The daily hour target derived from a regime, with a note when the
/// regime was misconfigured and defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyHoursResult {
    /// The daily hour target in force.
    pub hours: Decimal,
    /// A configuration-error note, when the regime was defaulted.
    pub note: Option<CalculationNote>,
}

/// How an absence justified by a leave type is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsenceClassification {
    /// Whether the day still counts as presence (an "abono").
    pub counts_as_presence: bool,
    /// Whether the day draws down the compensatory-time bank.
    pub consumes_comp_balance: bool,
}

/// Counts the expected working days in a period: calendar days minus
/// weekends minus non-business days applicable to the employee's unit
/// or the whole institution.
///
/// A non-business day falling on a weekend is not double-counted.
///
/// # Example
///
/// ```
/// use folha_engine::calculation::expected_working_days;
/// use folha_engine::models::Period;
/// use chrono::NaiveDate;
///
/// // March 2026 has 31 days and 9 weekend days.
/// let period = Period {
///     start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
///     end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
/// };
/// assert_eq!(expected_working_days(&period, &[], "unit_hr"), 22);
/// ```
pub fn expected_working_days(
    period: &Period,
    non_business_days: &[NonBusinessDay],
    unit_id: &str,
) -> u32 {
    period
        .days()
        .filter(|date| !is_weekend(*date))
        .filter(|date| {
            !non_business_days
                .iter()
                .any(|nbd| nbd.date == *date && nbd.scope.applies_to(unit_id))
        })
        .count() as u32
}

/// Derives the daily hour target from a work regime.
///
/// Two-shift regimes work 8 hours. Single-shift regimes work their
/// configured value, which must be at most 6; a single-shift regime
/// configured above 6 hours is a configuration error, reported via a
/// note and defaulted to two-shift treatment.
pub fn daily_hours(regime: &WorkRegime) -> DailyHoursResult {
    match regime.structure {
        ShiftStructure::Two => DailyHoursResult {
            hours: Decimal::from(TWO_SHIFT_HOURS),
            note: None,
        },
        ShiftStructure::Single { daily_hours } => {
            if daily_hours > Decimal::from(SINGLE_SHIFT_MAX_HOURS) {
                DailyHoursResult {
                    hours: Decimal::from(TWO_SHIFT_HOURS),
                    note: Some(CalculationNote {
                        code: "regime_defaulted".to_string(),
                        message: format!(
                            "single-shift regime configured at {daily_hours}h exceeds \
                             {SINGLE_SHIFT_MAX_HOURS}h, treated as two-shift ({TWO_SHIFT_HOURS}h)"
                        ),
                    }),
                }
            } else {
                DailyHoursResult {
                    hours: daily_hours,
                    note: None,
                }
            }
        }
    }
}

/// Reads the presence/comp-balance treatment off a leave type.
pub fn classify_absence(leave_type: &LeaveType) -> AbsenceClassification {
    AbsenceClassification {
        counts_as_presence: leave_type.counts_as_presence,
        consumes_comp_balance: leave_type.consumes_comp_balance,
    }
}

/// Signed overtime (positive) or deficit (negative) hours for a period.
pub fn overtime_delta(actual_hours: Decimal, expected_hours: Decimal) -> Decimal {
    actual_hours - expected_hours
}

/// Computes the full attendance summary for one employee for one period.
///
/// Validates the period, derives the daily hour target from the regime
/// (or through the configuration tiers when no regime is set), counts
/// expected days against the calendar, classifies the period's justified
/// absences, and produces the overtime delta to stage into the bank.
/// Appends one summary entry to the trace.
///
/// # Errors
///
/// [`crate::error::EngineError::InvalidPeriod`] when the period range is
/// reversed; the employee is skipped, siblings keep computing.
pub fn summarize(
    context: &EmployeeCalculationContext,
    resolver: &ConfigResolver<'_>,
    non_business_days: &[NonBusinessDay],
    leave_types: &std::collections::HashMap<String, LeaveType>,
    logger: &CalculationLogger,
) -> EngineResult<(AttendanceSummary, Vec<CalculationNote>, Decimal)> {
    context.period.validate()?;

    let mut notes = Vec::new();

    let daily_target = match &context.regime {
        Some(regime) => {
            let result = daily_hours(regime);
            if let Some(note) = result.note {
                notes.push(note);
            }
            result.hours
        }
        None => {
            let resolved = resolver.resolve(keys::DAILY_HOURS, &context.employee_id, &context.unit_id);
            resolved.value.as_decimal().unwrap_or_else(|| {
                notes.push(CalculationNote {
                    code: "daily_hours_defaulted".to_string(),
                    message: "resolved daily_hours was not numeric, using 8".to_string(),
                });
                Decimal::from(TWO_SHIFT_HOURS)
            })
        }
    };

    let expected_days = expected_working_days(&context.period, non_business_days, &context.unit_id);
    let expected_hours = Decimal::from(expected_days) * daily_target;

    // Justified absences: presence-counting types credit a full day of
    // hours; comp-consuming types draw banked hours instead.
    let mut credited_leave_hours = Decimal::ZERO;
    let mut comp_consumed_by_leave = Decimal::ZERO;
    for record in &context.leave_records {
        if !context.period.contains(record.date) || is_weekend(record.date) {
            continue;
        }
        let Some(leave_type) = leave_types.get(&record.leave_type) else {
            notes.push(CalculationNote {
                code: "unknown_leave_type".to_string(),
                message: format!(
                    "leave type '{}' on {} is not configured, absence left unjustified",
                    record.leave_type, record.date
                ),
            });
            continue;
        };
        let classification = classify_absence(leave_type);
        if classification.counts_as_presence {
            credited_leave_hours += daily_target;
        }
        if classification.consumes_comp_balance {
            comp_consumed_by_leave += daily_target;
        }
    }

    let actual_hours = context.worked_hours + credited_leave_hours;
    let delta = overtime_delta(actual_hours, expected_hours);

    let summary = AttendanceSummary {
        expected_days,
        daily_hours: daily_target,
        expected_hours,
        credited_leave_hours,
        overtime_delta: delta,
    };

    logger.log(LogRecord {
        employee_id: Some(context.employee_id.clone()),
        key: "attendance_summary".to_string(),
        resolved_tier: None,
        inputs: serde_json::json!({
            "period_start": context.period.start.to_string(),
            "period_end": context.period.end.to_string(),
            "worked_hours": context.worked_hours.to_string(),
            "leave_records": context.leave_records.len(),
        }),
        output: serde_json::json!({
            "expected_days": summary.expected_days,
            "daily_hours": summary.daily_hours.to_string(),
            "expected_hours": summary.expected_hours.to_string(),
            "credited_leave_hours": summary.credited_leave_hours.to_string(),
            "overtime_delta": summary.overtime_delta.to_string(),
        }),
    });

    Ok((summary, notes, comp_consumed_by_leave))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigValue, EngineConfig, InstitutionMetadata};
    use crate::models::{CalendarScope, LeaveRecord, Money};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn march_2026() -> Period {
        Period {
            start: date(2026, 3, 1),
            end: date(2026, 3, 31),
        }
    }

    fn empty_config() -> EngineConfig {
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
            rubricas: vec![],
            bracket_tables: HashMap::new(),
            rounding: Default::default(),
        }
    }

    fn single_shift_context(worked_hours: Decimal) -> EmployeeCalculationContext {
        EmployeeCalculationContext {
            employee_id: "emp_001".to_string(),
            unit_id: "unit_hr".to_string(),
            base_salary: Money::from_cents(300_000),
            seniority_years: 4,
            regime: Some(WorkRegime {
                structure: ShiftStructure::Single {
                    daily_hours: Decimal::from(6),
                },
                effective_from: date(2026, 1, 1),
                superseded_on: None,
            }),
            period: march_2026(),
            leave_records: vec![],
            worked_hours,
        }
    }

    #[test]
    fn test_expected_days_march_2026_without_holidays() {
        // March 2026: 31 calendar days, 9 weekend days.
        assert_eq!(expected_working_days(&march_2026(), &[], "unit_hr"), 22);
    }

    #[test]
    fn test_calendar_partition_invariant() {
        // expectedDays + applicable non-business days + weekend days
        // must equal total calendar days.
        let period = march_2026();
        let holidays = vec![NonBusinessDay {
            date: date(2026, 3, 19),
            name: "Municipal holiday".to_string(),
            scope: CalendarScope::Institution,
        }];

        let expected = expected_working_days(&period, &holidays, "unit_hr");
        let weekend = period.days().filter(|d| is_weekend(*d)).count() as u32;
        let applicable = holidays
            .iter()
            .filter(|h| period.contains(h.date) && !is_weekend(h.date))
            .count() as u32;

        assert_eq!(expected + applicable + weekend, period.calendar_days());
    }

    #[test]
    fn test_holiday_on_weekend_not_double_counted() {
        let holidays = vec![NonBusinessDay {
            date: date(2026, 3, 8), // a Sunday
            name: "Holiday on Sunday".to_string(),
            scope: CalendarScope::Institution,
        }];
        assert_eq!(
            expected_working_days(&march_2026(), &holidays, "unit_hr"),
            22
        );
    }

    #[test]
    fn test_unit_scoped_holiday_ignored_for_other_units() {
        let holidays = vec![NonBusinessDay {
            date: date(2026, 3, 19),
            name: "Finance recess".to_string(),
            scope: CalendarScope::Unit("unit_finance".to_string()),
        }];
        assert_eq!(
            expected_working_days(&march_2026(), &holidays, "unit_hr"),
            22
        );
        assert_eq!(
            expected_working_days(&march_2026(), &holidays, "unit_finance"),
            21
        );
    }

    #[test]
    fn test_daily_hours_two_shift_is_eight() {
        let regime = WorkRegime {
            structure: ShiftStructure::Two,
            effective_from: date(2026, 1, 1),
            superseded_on: None,
        };
        let result = daily_hours(&regime);
        assert_eq!(result.hours, Decimal::from(8));
        assert!(result.note.is_none());
    }

    #[test]
    fn test_daily_hours_single_shift_uses_configured_value() {
        let regime = WorkRegime {
            structure: ShiftStructure::Single {
                daily_hours: Decimal::from(5),
            },
            effective_from: date(2026, 1, 1),
            superseded_on: None,
        };
        assert_eq!(daily_hours(&regime).hours, Decimal::from(5));
    }

    #[test]
    fn test_daily_hours_misconfigured_single_shift_defaults_to_two_shift() {
        let regime = WorkRegime {
            structure: ShiftStructure::Single {
                daily_hours: Decimal::from(7),
            },
            effective_from: date(2026, 1, 1),
            superseded_on: None,
        };
        let result = daily_hours(&regime);
        assert_eq!(result.hours, Decimal::from(8));
        let note = result.note.expect("expected a regime_defaulted note");
        assert_eq!(note.code, "regime_defaulted");
    }

    #[test]
    fn test_classify_absence_reads_leave_type_flags() {
        let abono = LeaveType {
            name: "Medical certificate".to_string(),
            counts_as_presence: true,
            consumes_comp_balance: false,
        };
        let classification = classify_absence(&abono);
        assert!(classification.counts_as_presence);
        assert!(!classification.consumes_comp_balance);
    }

    #[test]
    fn test_overtime_delta_signs() {
        assert_eq!(
            overtime_delta(Decimal::from(140), Decimal::from(132)),
            Decimal::from(8)
        );
        assert_eq!(
            overtime_delta(Decimal::from(120), Decimal::from(132)),
            Decimal::from(-12)
        );
    }

    #[test]
    fn test_summarize_expected_hours_scenario() {
        // 22 expected days at 6h/day = 132 expected hours.
        let config = empty_config();
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);
        let context = single_shift_context(Decimal::from(132));

        let (summary, notes, comp_consumed) = summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        )
        .unwrap();

        assert_eq!(summary.expected_days, 22);
        assert_eq!(summary.expected_hours, Decimal::from(132));
        assert_eq!(summary.overtime_delta, Decimal::ZERO);
        assert!(notes.is_empty());
        assert_eq!(comp_consumed, Decimal::ZERO);
    }

    #[test]
    fn test_summarize_rejects_invalid_period() {
        let config = empty_config();
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);
        let mut context = single_shift_context(Decimal::from(132));
        context.period = Period {
            start: date(2026, 3, 31),
            end: date(2026, 3, 1),
        };

        let result = summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_summarize_without_regime_resolves_daily_hours() {
        let mut config = empty_config();
        config
            .defaults
            .insert(keys::DAILY_HOURS.to_string(), ConfigValue::Integer(8));
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);

        let mut context = single_shift_context(Decimal::from(176));
        context.regime = None;

        let (summary, _, _) = summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        )
        .unwrap();

        assert_eq!(summary.daily_hours, Decimal::from(8));
        assert_eq!(summary.expected_hours, Decimal::from(176));
    }

    #[test]
    fn test_summarize_credits_presence_counting_leave() {
        let mut config = empty_config();
        config.leave_types.insert(
            "medical".to_string(),
            LeaveType {
                name: "Medical certificate".to_string(),
                counts_as_presence: true,
                consumes_comp_balance: false,
            },
        );
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);

        let mut context = single_shift_context(Decimal::from(126));
        context.leave_records = vec![LeaveRecord {
            date: date(2026, 3, 10),
            leave_type: "medical".to_string(),
        }];

        let (summary, _, _) = summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        )
        .unwrap();

        assert_eq!(summary.credited_leave_hours, Decimal::from(6));
        // 126 worked + 6 credited = 132 expected, delta zero.
        assert_eq!(summary.overtime_delta, Decimal::ZERO);
    }

    #[test]
    fn test_summarize_comp_consuming_leave_reported_separately() {
        let mut config = empty_config();
        config.leave_types.insert(
            "comp_day_off".to_string(),
            LeaveType {
                name: "Compensatory day off".to_string(),
                counts_as_presence: true,
                consumes_comp_balance: true,
            },
        );
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);

        let mut context = single_shift_context(Decimal::from(126));
        context.leave_records = vec![LeaveRecord {
            date: date(2026, 3, 10),
            leave_type: "comp_day_off".to_string(),
        }];

        let (_, _, comp_consumed) = summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        )
        .unwrap();

        assert_eq!(comp_consumed, Decimal::from(6));
    }

    #[test]
    fn test_summarize_unknown_leave_type_noted_not_fatal() {
        let config = empty_config();
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);

        let mut context = single_shift_context(Decimal::from(132));
        context.leave_records = vec![LeaveRecord {
            date: date(2026, 3, 10),
            leave_type: "not_configured".to_string(),
        }];

        let (_, notes, _) = summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        )
        .unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].code, "unknown_leave_type");
    }

    #[test]
    fn test_summarize_logs_one_summary_entry() {
        let config = empty_config();
        let logger = CalculationLogger::new();
        let resolver = ConfigResolver::new(&config, &logger);
        let context = single_shift_context(Decimal::from(132));

        summarize(
            &context,
            &resolver,
            &config.non_business_days,
            &config.leave_types,
            &logger,
        )
        .unwrap();

        let entries = logger.all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "attendance_summary");
        assert_eq!(entries[0].output["expected_days"], 22);
    }
}
