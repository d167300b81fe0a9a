//! Expense records.
//!
//! [`ExpenseRecord`] is the single canonical shape the rest of the engine
//! works with. Raw documents (legacy keys, numeric strings, missing
//! month/year) are converted exactly once, at the store boundary, by
//! [`NewExpense::from_document`] and by the `TryFrom<Model>` conversion.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    Cursor, EngineError, Money, Month, ResultEngine,
    util::{document_amount, integral, normalize_label, parse_timestamp},
};

const PENDING_PREFIX: &str = "pending-";

/// Opaque record identifier assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh identifier for a stored record.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// A temporary identifier for an optimistic local entry.
    pub fn pending() -> Self {
        Self(format!("{PENDING_PREFIX}{}", Uuid::new_v4()))
    }

    /// Returns `true` for identifiers built by [`RecordId::pending`].
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.starts_with(PENDING_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One expense.
///
/// `month`/`year` are normally set from the cursor at creation time and are
/// authoritative; `occurred_at` is only used to derive them when they are
/// missing (see `Aggregator`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: RecordId,
    pub owner_id: String,
    pub label: String,
    pub amount: Money,
    pub occurred_at: Option<DateTime<Utc>>,
    pub month: Option<Month>,
    pub year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// An expense that has not been stored yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpense {
    pub owner_id: String,
    pub label: String,
    pub amount: Money,
    pub occurred_at: Option<DateTime<Utc>>,
    pub month: Option<Month>,
    pub year: Option<i32>,
}

impl NewExpense {
    /// Build a validated expense attributed to `cursor`.
    ///
    /// The label must not be empty and the amount must be `>= 0`.
    pub fn new(
        owner_id: &str,
        label: &str,
        amount: Money,
        cursor: Cursor,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let draft = Self {
            owner_id: owner_id.to_string(),
            label: normalize_label(label)?,
            amount,
            occurred_at: Some(occurred_at),
            month: Some(cursor.month),
            year: Some(cursor.year),
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Check the invariants enforced at entry.
    pub fn validate(&self) -> ResultEngine<()> {
        if self.owner_id.trim().is_empty() {
            return Err(EngineError::InvalidId("owner id must not be empty".to_string()));
        }
        if self.label.trim().is_empty() {
            return Err(EngineError::InvalidLabel(
                "label must not be empty".to_string(),
            ));
        }
        Money::non_negative(self.amount.value())?;
        Ok(())
    }

    /// Normalize a raw expense document.
    ///
    /// Accepted keys: `ownerId`/`userId`, `label`/`name`, `amount` (number or
    /// numeric string), `occurredAt`/`date`, `month` (0..=11), `year`.
    ///
    /// - a month outside `0..=11` or a non-numeric month/year is dropped, so
    ///   aggregation falls back to the date;
    /// - an unparseable date is dropped;
    /// - the document's owner wins over `default_owner` when present.
    pub fn from_document(document: &Value, default_owner: &str) -> ResultEngine<Self> {
        let object = document.as_object().ok_or_else(|| {
            EngineError::InvalidDocument("expense document must be an object".to_string())
        })?;
        let field = |names: &[&str]| names.iter().find_map(|name| object.get(*name));

        let owner_id = field(&["ownerId", "owner_id", "userId"])
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_owner)
            .to_string();
        // Legacy documents may carry an empty label; keep it rather than
        // rejecting the whole record.
        let label = match field(&["label", "name"]).and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => normalize_label(raw)?,
            _ => String::new(),
        };
        let amount = document_amount(field(&["amount"]))?;
        let occurred_at = field(&["occurredAt", "occurred_at", "date"])
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        let month = field(&["month"])
            .and_then(integral)
            .and_then(|m| Month::try_from(m).ok());
        let year = field(&["year"])
            .and_then(integral)
            .and_then(|y| i32::try_from(y).ok());

        if owner_id.is_empty() {
            return Err(EngineError::InvalidId("owner id must not be empty".to_string()));
        }

        Ok(Self {
            owner_id,
            label,
            amount,
            occurred_at,
            month,
            year,
        })
    }

    /// Returns `true` when the explicit scope fields match `cursor`.
    pub fn belongs_to(&self, cursor: Cursor) -> bool {
        self.month == Some(cursor.month) && self.year == Some(cursor.year)
    }

    /// Materialize the draft as a record with the given identity.
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> ExpenseRecord {
        ExpenseRecord {
            id,
            owner_id: self.owner_id,
            label: self.label,
            amount: self.amount,
            occurred_at: self.occurred_at,
            month: self.month,
            year: self.year,
            created_at,
        }
    }
}

/// Display order for a record list. Never affects aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently created first.
    #[default]
    Newest,
    Oldest,
    AmountAsc,
    AmountDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::AmountAsc => "amount-asc",
            Self::AmountDesc => "amount-desc",
        }
    }

    fn compare(self, a: &ExpenseRecord, b: &ExpenseRecord) -> Ordering {
        match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::Oldest => a.created_at.cmp(&b.created_at),
            Self::AmountAsc => a.amount.cmp(&b.amount),
            Self::AmountDesc => b.amount.cmp(&a.amount),
        }
    }
}

impl FromStr for SortOrder {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "amount-asc" => Ok(Self::AmountAsc),
            "amount-desc" => Ok(Self::AmountDesc),
            other => Err(EngineError::InvalidDocument(format!(
                "invalid sort order: {other}"
            ))),
        }
    }
}

/// Return `records` in `order`. Ties keep their incoming order.
pub fn sorted<'a, I>(records: I, order: SortOrder) -> Vec<&'a ExpenseRecord>
where
    I: IntoIterator<Item = &'a ExpenseRecord>,
{
    let mut out: Vec<&ExpenseRecord> = records.into_iter().collect();
    out.sort_by(|a, b| order.compare(a, b));
    out
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub label: String,
    pub amount: i64,
    pub occurred_at: Option<DateTimeUtc>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpenseRecord> for ActiveModel {
    fn from(record: &ExpenseRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            owner_id: ActiveValue::Set(record.owner_id.clone()),
            label: ActiveValue::Set(record.label.clone()),
            amount: ActiveValue::Set(record.amount.value()),
            occurred_at: ActiveValue::Set(record.occurred_at),
            month: ActiveValue::Set(record.month.map(|m| m.index() as i32)),
            year: ActiveValue::Set(record.year),
            created_at: ActiveValue::Set(record.created_at),
        }
    }
}

impl TryFrom<Model> for ExpenseRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let amount = Money::non_negative(model.amount).map_err(|_| {
            EngineError::InvalidDocument(format!("expense {} has a negative amount", model.id))
        })?;
        Ok(Self {
            id: RecordId(model.id),
            owner_id: model.owner_id,
            label: model.label,
            amount,
            occurred_at: model.occurred_at,
            month: model.month.and_then(|m| Month::try_from(i64::from(m)).ok()),
            year: model.year,
            created_at: model.created_at,
        })
    }
}
