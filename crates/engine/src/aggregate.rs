//! Derived totals.
//!
//! Everything here is pure: records and salary maps go in, totals come out.
//! Nothing is cached or persisted; callers recompute whenever their inputs
//! change.
//!
//! Two remainder variants are always carried side by side:
//!
//! - `remainder` is clamped at zero, for chart series where a negative bar
//!   makes no sense;
//! - `remainder_signed` is `salary - expense` as is, for textual summaries
//!   where an overspent month must show up as negative.

use chrono::Datelike;
use chrono_tz::Tz;
use serde::Serialize;

use crate::{ExpenseRecord, Money, Month, SalaryMap};

/// Per-month expense sums for one year, indexed by [`Month::index`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MonthlyTotals([Money; 12]);

impl MonthlyTotals {
    pub fn get(&self, month: Month) -> Money {
        self.0[month.index()]
    }

    pub fn total(&self) -> Money {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Month, Money)> + '_ {
        Month::all().zip(self.0.iter().copied())
    }
}

/// One entry of a year series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MonthTotals {
    pub month: Month,
    pub expense: Money,
    pub salary: Money,
    /// `max(salary - expense, 0)`.
    pub remainder: Money,
    /// `salary - expense`.
    pub remainder_signed: Money,
}

impl MonthTotals {
    fn new(month: Month, expense: Money, salary: Money) -> Self {
        let remainder_signed = salary - expense;
        Self {
            month,
            expense,
            salary,
            remainder: remainder_signed.clamp_non_negative(),
            remainder_signed,
        }
    }
}

/// Totals for the selected month. `remainder` is signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub salary: Money,
    pub total_expense: Money,
    pub remainder: Money,
}

impl MonthSummary {
    pub fn remainder_clamped(&self) -> Money {
        self.remainder.clamp_non_negative()
    }

    pub fn is_overspent(&self) -> bool {
        self.remainder.is_negative()
    }
}

/// Sums over a year series. `remainder` is signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct YearTotals {
    pub total_salary: Money,
    pub total_expense: Money,
    pub remainder: Money,
}

/// Salary / expense / remaining shares of a year, for a pie chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct YearBreakdown {
    pub salary: Money,
    pub expense: Money,
    /// Clamped at zero.
    pub remaining: Money,
}

impl YearTotals {
    pub fn remainder_clamped(&self) -> Money {
        self.remainder.clamp_non_negative()
    }

    pub fn breakdown(&self) -> YearBreakdown {
        YearBreakdown {
            salary: self.total_salary,
            expense: self.total_expense,
            remaining: self.remainder_clamped(),
        }
    }
}

/// Buckets records by calendar month.
///
/// A record's month and year are taken from its explicit fields when
/// present; a missing field is derived from `occurred_at` in the
/// aggregator's time zone. A record that resolves neither way is left out
/// of every total without any error.
#[derive(Clone, Copy, Debug)]
pub struct Aggregator {
    tz: Tz,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Aggregator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn effective_month(&self, record: &ExpenseRecord) -> Option<Month> {
        record.month.or_else(|| {
            record
                .occurred_at
                .and_then(|ts| Month::new(ts.with_timezone(&self.tz).month0() as u8).ok())
        })
    }

    pub fn effective_year(&self, record: &ExpenseRecord) -> Option<i32> {
        record
            .year
            .or_else(|| record.occurred_at.map(|ts| ts.with_timezone(&self.tz).year()))
    }

    /// `(month, year)` the record is attributed to, if it resolves.
    pub fn effective_scope(&self, record: &ExpenseRecord) -> Option<(Month, i32)> {
        Some((self.effective_month(record)?, self.effective_year(record)?))
    }

    /// Sum amounts of the records attributed to `year`, per month.
    pub fn monthly_expense_totals<'a, I>(&self, records: I, year: i32) -> MonthlyTotals
    where
        I: IntoIterator<Item = &'a ExpenseRecord>,
    {
        let mut buckets = [Money::ZERO; 12];
        for record in records {
            match self.effective_scope(record) {
                Some((month, record_year)) if record_year == year => {
                    buckets[month.index()] += record.amount;
                }
                Some(_) => {}
                None => {
                    tracing::trace!(id = %record.id, "record without usable month/year skipped");
                }
            }
        }
        MonthlyTotals(buckets)
    }

    /// Twelve entries, January first, pairing expenses with the salary leaf
    /// of the same month (zero when unset).
    pub fn year_series<'a, I>(&self, records: I, salary: &SalaryMap, year: i32) -> Vec<MonthTotals>
    where
        I: IntoIterator<Item = &'a ExpenseRecord>,
    {
        let expenses = self.monthly_expense_totals(records, year);
        expenses
            .iter()
            .map(|(month, expense)| MonthTotals::new(month, expense, salary.amount(year, month)))
            .collect()
    }

    /// Records attributed to `(month, year)`, in their incoming order.
    pub fn month_detail<'a, I>(&self, records: I, month: Month, year: i32) -> Vec<&'a ExpenseRecord>
    where
        I: IntoIterator<Item = &'a ExpenseRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.effective_scope(record) == Some((month, year)))
            .collect()
    }
}

/// Totals for `(month, year)`.
///
/// `records` are trusted to be already scoped to that month (they come from
/// a subscription filtered on owner, month and year), so every amount is
/// summed without re-deriving its month.
pub fn month_summary<'a, I>(records: I, salary: &SalaryMap, month: Month, year: i32) -> MonthSummary
where
    I: IntoIterator<Item = &'a ExpenseRecord>,
{
    let salary = salary.amount(year, month);
    let total_expense: Money = records.into_iter().map(|record| record.amount).sum();
    MonthSummary {
        salary,
        total_expense,
        remainder: salary - total_expense,
    }
}

/// Sum a year series.
pub fn year_totals(series: &[MonthTotals]) -> YearTotals {
    let total_salary: Money = series.iter().map(|entry| entry.salary).sum();
    let total_expense: Money = series.iter().map(|entry| entry.expense).sum();
    YearTotals {
        total_salary,
        total_expense,
        remainder: total_salary - total_expense,
    }
}
