//! Expense tracking engine.
//!
//! - [`records`]: the canonical [`ExpenseRecord`] and raw-document
//!   normalization;
//! - [`salary`]: the sparse `year -> month -> amount` [`SalaryMap`] and its
//!   merge-writing accessor [`SalaryBook`];
//! - [`aggregate`]: pure per-month / per-year totals;
//! - [`store`]: the [`RecordStore`] / [`SalaryStore`] seams, implemented by
//!   [`SqliteStore`];
//! - [`sync`]: [`SyncController`], the live local view of one scope.

pub use aggregate::{
    Aggregator, MonthSummary, MonthTotals, MonthlyTotals, YearBreakdown, YearTotals,
    month_summary, year_totals,
};
pub use cursor::{Cursor, Month};
pub use error::EngineError;
pub use money::Money;
pub use records::{ExpenseRecord, NewExpense, RecordId, SortOrder, sorted};
pub use salary::{SalaryBook, SalaryMap};
pub use sqlite::{SqliteStore, SqliteStoreBuilder};
pub use store::{RecordStore, SalaryStore, Scope, Snapshot, Subscription};
pub use sync::{LocalRecord, Notice, Phase, SyncController, SyncEvent};

pub mod aggregate;
mod cursor;
mod error;
mod money;
pub mod records;
pub mod salary;
mod sqlite;
pub mod store;
pub mod sync;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
