//! The (month, year) selection that scopes queries and aggregation.

use std::{fmt, ops::RangeInclusive};

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Calendar month as a zero-based index (`0` = January, `11` = December).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

impl Month {
    pub const JANUARY: Month = Month(0);
    pub const DECEMBER: Month = Month(11);

    /// Creates a month from its zero-based index.
    pub fn new(index: u8) -> ResultEngine<Self> {
        if index > 11 {
            return Err(EngineError::InvalidMonth(format!(
                "month index must be in 0..=11, got {index}"
            )));
        }
        Ok(Self(index))
    }

    /// Creates a month from its human number (`1` = January).
    pub fn from_number(number: u8) -> ResultEngine<Self> {
        if !(1..=12).contains(&number) {
            return Err(EngineError::InvalidMonth(format!(
                "month must be in 1..=12, got {number}"
            )));
        }
        Ok(Self(number - 1))
    }

    /// Zero-based index, usable as a bucket position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Human month number (`1..=12`).
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0 + 1
    }

    #[must_use]
    pub fn label(self) -> String {
        format!("Month {}", self.number())
    }

    /// All twelve months in calendar order.
    pub fn all() -> impl Iterator<Item = Month> {
        (0..12).map(Month)
    }
}

impl TryFrom<u8> for Month {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Month::new(value)
    }
}

impl TryFrom<i64> for Month {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| EngineError::InvalidMonth(format!("month index out of range: {value}")))
            .and_then(Month::new)
    }
}

impl From<Month> for u8 {
    fn from(value: Month) -> Self {
        value.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The selected `(month, year)`.
///
/// It is pure view state: it is never persisted and changing it never
/// mutates stored data, it only changes which records and which salary leaf
/// subsequent reads and writes target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub month: Month,
    pub year: i32,
}

impl Cursor {
    pub fn new(month: Month, year: i32) -> Self {
        Self { month, year }
    }

    /// The calendar month containing `now` in time zone `tz`.
    pub fn at(now: DateTime<Utc>, tz: Tz) -> Self {
        let local = now.with_timezone(&tz);
        Self {
            month: Month(local.month0() as u8),
            year: local.year(),
        }
    }

    /// The current calendar month in time zone `tz`.
    pub fn current(tz: Tz) -> Self {
        Self::at(Utc::now(), tz)
    }

    /// Years offered for selection: the previous one and the next four.
    pub fn year_choices(current_year: i32) -> RangeInclusive<i32> {
        (current_year - 1)..=(current_year + 4)
    }

    #[must_use]
    pub fn with_month(self, month: Month) -> Self {
        Self { month, ..self }
    }

    #[must_use]
    pub fn with_year(self, year: i32) -> Self {
        Self { year, ..self }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn month_bounds() {
        assert!(Month::new(11).is_ok());
        assert!(Month::new(12).is_err());
        assert_eq!(Month::from_number(1).unwrap(), Month::JANUARY);
        assert!(Month::from_number(0).is_err());
        assert!(Month::try_from(-1i64).is_err());
        assert_eq!(Month::all().count(), 12);
    }

    #[test]
    fn labels_are_one_based() {
        assert_eq!(Month::JANUARY.label(), "Month 1");
        assert_eq!(Month::DECEMBER.label(), "Month 12");
        let cursor = Cursor::new(Month::new(3).unwrap(), 2024);
        assert_eq!(cursor.to_string(), "4/2024");
    }

    #[test]
    fn cursor_uses_local_calendar() {
        // 2024-01-31 20:00 UTC is already February 1st in Ho Chi Minh City.
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 0).unwrap();
        assert_eq!(Cursor::at(now, Tz::UTC), Cursor::new(Month::JANUARY, 2024));
        assert_eq!(
            Cursor::at(now, chrono_tz::Asia::Ho_Chi_Minh),
            Cursor::new(Month::new(1).unwrap(), 2024)
        );
    }

    #[test]
    fn year_choices_span_six_years() {
        let years: Vec<i32> = Cursor::year_choices(2025).collect();
        assert_eq!(years, vec![2024, 2025, 2026, 2027, 2028, 2029]);
    }

    #[test]
    fn month_deserializes_from_index() {
        let month: Month = serde_json::from_str("5").unwrap();
        assert_eq!(month.number(), 6);
        assert!(serde_json::from_str::<Month>("12").is_err());
    }
}
