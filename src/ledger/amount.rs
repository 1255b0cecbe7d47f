use std::convert::TryFrom;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::AmountError;

/// Number of decimals of the currency minor unit (cents)
pub const MINOR_UNIT_SCALE: u32 = 2;

const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// A monetary value stored as an integer count of minor units.
///
/// Arithmetic is exact integer arithmetic and only offered as [`Amount::checked_add`] and
/// [`Amount::checked_sub`], which report overflow instead of wrapping.
/// The type itself allows negative values, so callers can compute a prospective balance and
/// check it before committing, but amounts used as transaction input must go through
/// [`Amount::require_positive`].
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(i64);

impl Amount {
  pub const ZERO: Amount = Amount(0);

  pub const fn from_minor_units(minor_units: i64) -> Self {
    Self(minor_units)
  }

  pub const fn minor_units(&self) -> i64 {
    self.0
  }

  pub fn is_positive(&self) -> bool {
    self.0 > 0
  }

  pub fn is_negative(&self) -> bool {
    self.0 < 0
  }

  /// Validates this amount as the magnitude of a deposit, withdrawal or transfer.
  pub fn require_positive(self) -> Result<Self, AmountError> {
    match self.0 {
      0 => Err(AmountError::Zero),
      value if value < 0 => Err(AmountError::Negative(self)),
      _ => Ok(self),
    }
  }

  pub fn checked_add(self, other: Amount) -> Option<Amount> {
    self.0.checked_add(other.0).map(Amount)
  }

  pub fn checked_sub(self, other: Amount) -> Option<Amount> {
    self.0.checked_sub(other.0).map(Amount)
  }

  pub fn to_decimal(self) -> Decimal {
    Decimal::new(self.0, MINOR_UNIT_SCALE)
  }
}

impl TryFrom<Decimal> for Amount {
  type Error = AmountError;

  fn try_from(value: Decimal) -> Result<Self, Self::Error> {
    let normalized = value.normalize();
    if normalized.scale() > MINOR_UNIT_SCALE {
      return Err(AmountError::TooPrecise(value));
    }
    normalized
      .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
      .and_then(|minor_units| minor_units.to_i64())
      .map(Amount)
      .ok_or(AmountError::OutOfRange)
  }
}

impl FromStr for Amount {
  type Err = AmountError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = Decimal::from_str(s.trim()).map_err(|_| AmountError::Malformed(s.to_string()))?;
    Amount::try_from(value)
  }
}

impl From<Amount> for Decimal {
  fn from(amount: Amount) -> Self {
    amount.to_decimal()
  }
}

impl fmt::Display for Amount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_decimal())
  }
}

/// Saturates at the largest amount when negating the smallest one, which has no positive
/// counterpart. Never panics.
impl Neg for Amount {
  type Output = Amount;

  fn neg(self) -> Amount {
    Amount(self.0.saturating_neg())
  }
}
