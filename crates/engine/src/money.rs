use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money amount in **integral currency units**.
///
/// There is no implied decimal scaling: `250000` is two hundred fifty
/// thousand units of the currency. Use this type for every amount the engine
/// handles (expenses, salaries, totals) so sums stay exact.
///
/// The value is signed because remainders (`salary - expense`) can go below
/// zero; stored amounts are always validated to be in `0..=Money::MAX` with
/// [`Money::non_negative`] or by parsing.
///
/// Arithmetic saturates at the `i64` bounds instead of overflowing. Sums of
/// up to 9,000 amounts at [`Money::MAX`] are still exact.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(250_000);
/// assert_eq!(amount.value(), 250_000);
/// assert_eq!(amount.to_string(), "250,000");
/// assert_eq!(amount.format("₫"), "250,000₫");
/// ```
///
/// Parsing from user input (digits, optional `,`/`_` grouping; no sign, no
/// decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("1500".parse::<Money>().unwrap().value(), 1500);
/// assert_eq!("1,500,000".parse::<Money>().unwrap().value(), 1_500_000);
/// assert!("-3".parse::<Money>().is_err());
/// assert!("12.5".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount accepted for a single expense or salary leaf.
    pub const MAX: Money = Money(1_000_000_000_000_000);

    /// Creates a new amount from integral units.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Creates an amount, rejecting negative values and values above
    /// [`Money::MAX`].
    pub fn non_negative(value: i64) -> Result<Self, EngineError> {
        if value < 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be >= 0".to_string(),
            ));
        }
        if value > Self::MAX.0 {
            return Err(EngineError::InvalidAmount(format!(
                "amount must be <= {}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns the amount, or zero when it is negative.
    #[must_use]
    pub const fn clamp_non_negative(self) -> Money {
        if self.0 < 0 { Money::ZERO } else { self }
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Formats the amount with thousands separators followed by `symbol`.
    #[must_use]
    pub fn format(self, symbol: &str) -> String {
        format!("{self}{symbol}")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}{grouped}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses user input into a non-negative amount.
    ///
    /// Validation rules:
    /// - rejects empty strings and any sign other than a leading `+`
    /// - `,` and `_` are accepted as grouping separators and ignored
    /// - rejects decimals (`12.5`): amounts have no fractional part
    /// - rejects values above [`Money::MAX`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidAmount("empty amount".to_string()));
        }
        if trimmed.starts_with('-') {
            return Err(EngineError::InvalidAmount(
                "amount must be >= 0".to_string(),
            ));
        }
        let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if rest.contains('.') {
            return Err(EngineError::InvalidAmount(
                "fractional amounts are not supported".to_string(),
            ));
        }

        let digits: String = rest.chars().filter(|c| *c != ',' && *c != '_').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::InvalidAmount("invalid amount".to_string()));
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| EngineError::InvalidAmount("amount too large".to_string()))?;
        Money::non_negative(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "0");
        assert_eq!(Money::new(999).to_string(), "999");
        assert_eq!(Money::new(1000).to_string(), "1,000");
        assert_eq!(Money::new(250_000).to_string(), "250,000");
        assert_eq!(Money::new(1_234_567).to_string(), "1,234,567");
        assert_eq!(Money::new(-500).to_string(), "-500");
        assert_eq!(Money::new(-12_500).format("₫"), "-12,500₫");
    }

    #[test]
    fn parse_accepts_grouping() {
        assert_eq!("10".parse::<Money>().unwrap().value(), 10);
        assert_eq!("  2300 ".parse::<Money>().unwrap().value(), 2300);
        assert_eq!("+7".parse::<Money>().unwrap().value(), 7);
        assert_eq!("1_000".parse::<Money>().unwrap().value(), 1000);
        assert_eq!("0".parse::<Money>().unwrap(), Money::ZERO);
    }

    #[test]
    fn parse_rejects_invalid_input() {
        assert_eq!(
            "".parse::<Money>().unwrap_err(),
            EngineError::InvalidAmount("empty amount".to_string())
        );
        assert_eq!(
            "-1".parse::<Money>().unwrap_err(),
            EngineError::InvalidAmount("amount must be >= 0".to_string())
        );
        assert!("12.5".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(",".parse::<Money>().is_err());
        assert!("99999999999999999999".parse::<Money>().is_err());
    }

    #[test]
    fn clamp_keeps_positive_values() {
        assert_eq!(Money::new(-500).clamp_non_negative(), Money::ZERO);
        assert_eq!(Money::new(500).clamp_non_negative(), Money::new(500));
    }

    #[test]
    fn non_negative_rejects_negative() {
        assert!(Money::non_negative(-1).is_err());
        assert_eq!(Money::non_negative(0).unwrap(), Money::ZERO);
    }

    #[test]
    fn amounts_are_capped() {
        assert_eq!(Money::non_negative(Money::MAX.value()).unwrap(), Money::MAX);
        assert!(Money::non_negative(Money::MAX.value() + 1).is_err());
        assert!("5000000000000000000".parse::<Money>().is_err());
        assert_eq!(
            "1,000,000,000,000,000".parse::<Money>().unwrap(),
            Money::MAX
        );
    }

    #[test]
    fn arithmetic_saturates() {
        let big = Money::new(i64::MAX);
        assert_eq!(big + big, Money::new(i64::MAX));
        assert_eq!(Money::new(i64::MIN) - big, Money::new(i64::MIN));
        assert_eq!(-Money::new(i64::MIN), Money::new(i64::MAX));
        let mut total = Money::MAX;
        total += Money::MAX;
        assert_eq!(total.value(), 2 * Money::MAX.value());
    }
}
