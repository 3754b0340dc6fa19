//! Monetary values in integer minor-currency units.
//!
//! The engine stores every monetary amount as integer cents wrapped in
//! [`Money`] so that line-item rounding and run totals reconcile exactly,
//! with no floating-point drift. `rust_decimal` is used for rates and
//! intermediate arithmetic; conversion back to cents goes through the
//! configured [`RoundingPolicy`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::{EngineError, EngineResult};

/// The rounding rule applied when converting a decimal amount to cents.
///
/// Applied per line item, before accumulation, so the engine's output is
/// reconcilable line-by-line against a printed payslip. The legal rule in
/// force decides which variant a given institution configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round half away from zero (the common payroll convention).
    #[default]
    HalfUp,
    /// Banker's rounding (round half to even).
    HalfEven,
}

impl RoundingPolicy {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingPolicy::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingPolicy::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// A monetary amount in integer minor-currency units (cents).
///
/// # Example
///
/// ```
/// use folha_engine::models::Money;
///
/// let salary = Money::from_cents(300_000);
/// let tax = Money::from_cents(10_000);
/// assert_eq!((salary - tax).cents(), 290_000);
/// assert_eq!(salary.to_string(), "3000.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero cents.
    pub const ZERO: Money = Money(0);

    /// Creates a `Money` from an integer number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the amount as integer cents.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Converts a decimal currency amount (e.g., `3000.005`) to cents,
    /// rounding per the given policy.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CalculationError`] if the rounded amount
    /// does not fit in 64-bit cents.
    ///
    /// # Example
    ///
    /// ```
    /// use folha_engine::models::{Money, RoundingPolicy};
    /// use rust_decimal::Decimal;
    /// use std::str::FromStr;
    ///
    /// let half = Decimal::from_str("0.005").unwrap();
    /// assert_eq!(Money::from_decimal(half, RoundingPolicy::HalfUp).unwrap().cents(), 1);
    /// assert_eq!(Money::from_decimal(half, RoundingPolicy::HalfEven).unwrap().cents(), 0);
    /// ```
    pub fn from_decimal(amount: Decimal, policy: RoundingPolicy) -> EngineResult<Money> {
        let rounded = amount.round_dp_with_strategy(2, policy.strategy());
        (rounded * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Money)
            .ok_or_else(|| EngineError::CalculationError {
                message: format!("monetary amount out of range: {amount}"),
            })
    }

    /// Returns the amount as a `Decimal` in whole currency units.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the greater of `self` and `other`.
    pub fn max(self, other: Money) -> Money {
        Money(self.0.max(other.0))
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Decimal with scale 2 renders as e.g. "3000.00" / "-0.05".
        write!(f, "{}", self.to_decimal())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}
