//! Progressive bracket evaluation.
//!
//! Pure functions over [`TaxBracketTable`] configuration data, used for
//! social-security and income-tax style withholding. An invalid table is
//! fatal configuration data, never a fallback case.

use crate::config::TaxBracketTable;
use crate::error::EngineResult;
use crate::models::{Money, RoundingPolicy};

/// Evaluates a progressive bracket table over a monetary base.
///
/// Finds the single row where `lower <= base < upper` (bases past the
/// last bound use the last row), then applies
/// `tax = base * rate - deduction_constant`, floored at zero and rounded
/// to cents per the given policy.
///
/// # Errors
///
/// [`crate::error::EngineError::BracketTableInvalid`] when the table's
/// rows are not contiguous/monotonic.
///
/// # Example
///
/// ```
/// use folha_engine::calculation::evaluate_bracket;
/// use folha_engine::config::{TaxBracketRow, TaxBracketTable};
/// use folha_engine::models::{Money, RoundingPolicy};
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
///
/// let tax = evaluate_bracket(&table, "irrf", Money::from_cents(300_000),
///     RoundingPolicy::HalfUp).unwrap();
/// assert_eq!(tax, Money::from_cents(10_000));
/// ```
pub fn evaluate_bracket(
    table: &TaxBracketTable,
    name: &str,
    base: Money,
    rounding: RoundingPolicy,
) -> EngineResult<Money> {
    table.validate(name)?;

    let row = table.row_for(base);
    let raw = base.to_decimal() * row.rate - row.deduction.to_decimal();
    let tax = Money::from_decimal(raw, rounding)?;
    Ok(tax.max(Money::ZERO))
}
