//! Configuration types for the payroll engine.
//!
//! This module contains the strongly-typed configuration structures that
//! make up the [`EngineConfig`] snapshot: tiered parameter values, leave
//! types, calendars, rubrica definitions and tax bracket tables. A
//! snapshot is read once at batch start and treated as immutable for
//! that run.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::models::{LeaveType, Money, NonBusinessDay, RoundingPolicy};

/// One level in the configuration fallback chain.
///
/// Resolution tries tiers in declaration order and always answers from
/// one of the four; `hardcoded-fallback` is the compiled-in constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigTier {
    /// An employee-specific entry.
    Employee,
    /// An organizational-unit entry.
    Unit,
    /// An institution-wide default entry.
    InstitutionDefault,
    /// The hardcoded fallback constant compiled into the engine.
    HardcodedFallback,
}

impl fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigTier::Employee => "employee",
            ConfigTier::Unit => "unit",
            ConfigTier::InstitutionDefault => "institution-default",
            ConfigTier::HardcodedFallback => "hardcoded-fallback",
        };
        write!(f, "{label}")
    }
}

/// A parametrized configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A boolean flag.
    Boolean(bool),
    /// An integer quantity.
    Integer(i64),
    /// A decimal quantity (hours, rates).
    Decimal(Decimal),
    /// A free-form text value.
    Text(String),
}

impl ConfigValue {
    /// Interprets the value as a decimal, converting integers.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ConfigValue::Decimal(d) => Some(*d),
            ConfigValue::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    /// Interprets the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Well-known parameter keys with compiled fallback constants.
pub mod keys {
    /// Daily hour target when no regime decides it.
    pub const DAILY_HOURS: &str = "daily_hours";
    /// Whether the compensation bank may go into debt ("advance").
    pub const ALLOW_NEGATIVE_BALANCE: &str = "allow_negative_balance";
    /// Whether overtime/deficit hours are banked at all.
    pub const COMP_BANK_ENABLED: &str = "comp_bank_enabled";
}

/// Returns the hardcoded fallback constant for a parameter key.
///
/// Every key answers: unknown keys degrade to integer zero so resolution
/// never fails (the resolver logs a warning for that case).
pub fn hardcoded_fallback(key: &str) -> ConfigValue {
    match key {
        keys::DAILY_HOURS => ConfigValue::Integer(8),
        keys::ALLOW_NEGATIVE_BALANCE => ConfigValue::Boolean(false),
        keys::COMP_BANK_ENABLED => ConfigValue::Boolean(true),
        _ => ConfigValue::Integer(0),
    }
}

/// Identifying metadata for the institution a configuration belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionMetadata {
    /// The institution code.
    pub code: String,
    /// The human-readable institution name.
    pub name: String,
    /// The configuration version or effective date.
    pub version: String,
}

/// One row of a progressive bracket table.
///
/// Bounds are in cents; `upper` is `None` only for the final, unbounded
/// row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracketRow {
    /// Inclusive lower bound of the bracket, in cents.
    pub lower: Money,
    /// Exclusive upper bound of the bracket, in cents; `None` = unbounded.
    #[serde(default)]
    pub upper: Option<Money>,
    /// The marginal rate applied to the whole base in this bracket.
    pub rate: Decimal,
    /// The deduction constant subtracted after applying the rate, in cents.
    pub deduction: Money,
}

/// An ordered, contiguous progressive bracket table.
///
/// # Example
///
/// ```
/// use folha_engine::config::{TaxBracketRow, TaxBracketTable};
/// use folha_engine::models::Money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let table = TaxBracketTable {
///     rows: vec![
///         TaxBracketRow {
///             lower: Money::ZERO,
///             upper: Some(Money::from_cents(200_000)),
///             rate: Decimal::ZERO,
///             deduction: Money::ZERO,
///         },
///         TaxBracketRow {
///             lower: Money::from_cents(200_000),
///             upper: None,
///             rate: Decimal::from_str("0.10").unwrap(),
///             deduction: Money::from_cents(20_000),
///         },
///     ],
/// };
/// assert!(table.validate("irrf").is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracketTable {
    /// Bracket rows, ordered by ascending lower bound.
    pub rows: Vec<TaxBracketRow>,
}

impl TaxBracketTable {
    /// Validates the table's structural invariants.
    ///
    /// Rows must be non-empty, start at zero, be contiguous (each upper
    /// bound equals the next lower bound) and monotonically increasing,
    /// with only the last row unbounded and no negative rates. A
    /// violation is fatal configuration data ([`EngineError::BracketTableInvalid`]),
    /// never a runtime fallback case: an invalid table silently produces
    /// legally wrong withholding.
    pub fn validate(&self, name: &str) -> EngineResult<()> {
        let invalid = |message: String| EngineError::BracketTableInvalid {
            table: name.to_string(),
            message,
        };

        if self.rows.is_empty() {
            return Err(invalid("table has no rows".to_string()));
        }
        if self.rows[0].lower != Money::ZERO {
            return Err(invalid(format!(
                "first row must start at 0, starts at {}",
                self.rows[0].lower
            )));
        }

        for (index, row) in self.rows.iter().enumerate() {
            if row.rate.is_sign_negative() {
                return Err(invalid(format!("row {index} has a negative rate")));
            }
            let last = index == self.rows.len() - 1;
            match row.upper {
                None if !last => {
                    return Err(invalid(format!("row {index} is unbounded but not last")));
                }
                Some(upper) => {
                    if upper <= row.lower {
                        return Err(invalid(format!(
                            "row {index} bounds are not increasing: {} >= {}",
                            row.lower, upper
                        )));
                    }
                    if !last && self.rows[index + 1].lower != upper {
                        return Err(invalid(format!(
                            "gap between rows {index} and {}: {} != {}",
                            index + 1,
                            upper,
                            self.rows[index + 1].lower
                        )));
                    }
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Finds the row covering `base`.
    ///
    /// Bases at or above the table's last upper bound use the last row.
    pub fn row_for(&self, base: Money) -> &TaxBracketRow {
        self.rows
            .iter()
            .find(|row| base >= row.lower && row.upper.is_none_or(|upper| base < upper))
            .unwrap_or_else(|| &self.rows[self.rows.len() - 1])
    }
}

/// The base a tax rubrica evaluates its bracket table over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBase {
    /// The running sum of earnings applied so far.
    GrossSoFar,
    /// The running net applied so far (exempt earnings already excluded).
    NetSoFar,
    /// The employee's base salary.
    BaseSalary,
}

/// The formula a rubrica evaluates.
///
/// Formulas may read prior-computed totals (gross-so-far, net-so-far)
/// and bracket tables; evaluation order is therefore significant and
/// controlled by [`RubricaDefinition::order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "formula")]
pub enum RubricaFormula {
    /// Pays the context's base salary.
    BaseSalary,
    /// Pays a fixed amount in cents.
    FixedAmount {
        /// The amount, in cents.
        amount: Money,
    },
    /// A percentage of the base salary.
    PercentOfBase {
        /// The rate (e.g., `0.05` for 5%).
        rate: Decimal,
    },
    /// A percentage of the gross accumulated so far.
    PercentOfGross {
        /// The rate (e.g., `0.08` for 8%).
        rate: Decimal,
    },
    /// A seniority bonus: base salary times rate per completed year.
    SeniorityBonus {
        /// The rate per completed year of service.
        rate_per_year: Decimal,
    },
    /// Pays a fixed number of hours at the base-salary-derived hourly
    /// value (base salary divided by the period's expected hours).
    HourlyRate {
        /// The hours to pay.
        hours: Decimal,
    },
    /// Pays banked compensatory hours at the base-salary-derived hourly
    /// value, capped at the available balance.
    CompensatoryPayout {
        /// The hours requested for payout.
        requested_hours: Decimal,
    },
    /// Evaluates a named progressive bracket table over a selectable base.
    TaxBracket {
        /// The name of the bracket table in [`EngineConfig::bracket_tables`].
        table: String,
        /// The base the table is evaluated over.
        base: TaxBase,
    },
}

/// An earning/deduction rule evaluated for every employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricaDefinition {
    /// The rubrica code (e.g., "salario_base", "irrf").
    pub code: String,
    /// The human-readable name.
    pub name: String,
    /// Whether the rubrica credits, debits, or charges the employer.
    pub sign: crate::models::RubricaSign,
    /// Evaluation order index; rubricas run in strictly ascending order.
    pub order: u32,
    /// The formula to evaluate.
    #[serde(flatten)]
    pub formula: RubricaFormula,
}

/// The complete engine configuration snapshot.
///
/// Set before a batch starts (`configurar_motor`) and never mutated
/// mid-batch: a compute attempt clones the `Arc` it was given and works
/// from that snapshot for its whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Institution metadata.
    pub institution: InstitutionMetadata,
    /// Institution-default tier values, by parameter key.
    #[serde(default)]
    pub defaults: HashMap<String, ConfigValue>,
    /// Unit-tier overrides: unit id -> key -> value.
    #[serde(default)]
    pub unit_overrides: HashMap<String, HashMap<String, ConfigValue>>,
    /// Employee-tier overrides: employee id -> key -> value.
    #[serde(default)]
    pub employee_overrides: HashMap<String, HashMap<String, ConfigValue>>,
    /// Leave types by code.
    #[serde(default)]
    pub leave_types: HashMap<String, LeaveType>,
    /// Holiday/recess calendar entries.
    #[serde(default)]
    pub non_business_days: Vec<NonBusinessDay>,
    /// Rubrica definitions; evaluated in ascending `order`.
    pub rubricas: Vec<RubricaDefinition>,
    /// Named progressive bracket tables.
    #[serde(default)]
    pub bracket_tables: HashMap<String, TaxBracketTable>,
    /// The rounding rule for line-item amounts.
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

impl EngineConfig {
    /// Validates the snapshot: every bracket table passes structural
    /// validation, every table referenced by a rubrica exists, rubrica
    /// order indexes are unique, and leave types referenced nowhere
    /// undefined (leave records are validated at computation time).
    pub fn validate(&self) -> EngineResult<()> {
        for (name, table) in &self.bracket_tables {
            table.validate(name)?;
        }

        let mut orders = std::collections::HashSet::new();
        for rubrica in &self.rubricas {
            if !orders.insert(rubrica.order) {
                return Err(EngineError::CalculationError {
                    message: format!(
                        "duplicate rubrica order index {} at '{}'",
                        rubrica.order, rubrica.code
                    ),
                });
            }
            if let RubricaFormula::TaxBracket { table, .. } = &rubrica.formula {
                if !self.bracket_tables.contains_key(table) {
                    return Err(EngineError::BracketTableInvalid {
                        table: table.clone(),
                        message: format!("referenced by rubrica '{}' but not defined", rubrica.code),
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns the rubricas sorted by ascending order index.
    pub fn rubricas_in_order(&self) -> Vec<&RubricaDefinition> {
        let mut rubricas: Vec<&RubricaDefinition> = self.rubricas.iter().collect();
        rubricas.sort_by_key(|r| r.order);
        rubricas
    }
}
