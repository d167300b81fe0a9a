//! Salary map and its accessor.
//!
//! Each owner has one document; the salary lives under its `salary` key as a
//! nested `year -> month -> amount` map with string keys:
//!
//! ```json
//! { "salary": { "2024": { "0": 500000, "1": 300000 } } }
//! ```
//!
//! The map is sparse. A missing leaf means "unset" and reads as zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde_json::{Map, Value, json};

use crate::{
    EngineError, Money, Month, ResultEngine, store::SalaryStore, util::integral,
};

/// Key of the salary map inside the owner document.
pub const SALARY_FIELD: &str = "salary";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SalaryMap {
    years: BTreeMap<i32, BTreeMap<Month, Money>>,
}

impl SalaryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored leaf, `None` when unset.
    pub fn get(&self, year: i32, month: Month) -> Option<Money> {
        self.years.get(&year)?.get(&month).copied()
    }

    /// The salary for `(year, month)`, zero when unset.
    pub fn amount(&self, year: i32, month: Month) -> Money {
        self.get(year, month).unwrap_or(Money::ZERO)
    }

    pub fn set(&mut self, year: i32, month: Month, amount: Money) {
        self.years.entry(year).or_default().insert(month, amount);
    }

    /// Set leaves of `year`, in month order.
    pub fn months(&self, year: i32) -> impl Iterator<Item = (Month, Money)> + '_ {
        self.years
            .get(&year)
            .into_iter()
            .flat_map(|months| months.iter().map(|(m, a)| (*m, *a)))
    }

    pub fn is_empty(&self) -> bool {
        self.years.values().all(BTreeMap::is_empty)
    }

    /// Read the salary map from an owner document.
    ///
    /// Leaves that are not non-negative integers, years that are not
    /// integers and months outside `0..=11` are skipped. An older document
    /// shape stored a single flat number under `salary`; it carries no
    /// year/month and is read as an empty map.
    pub fn from_document(document: &Value) -> Self {
        let mut map = Self::new();
        let Some(years) = document.get(SALARY_FIELD).and_then(Value::as_object) else {
            return map;
        };
        for (year_key, months) in years {
            let Ok(year) = year_key.trim().parse::<i32>() else {
                continue;
            };
            let Some(months) = months.as_object() else {
                continue;
            };
            for (month_key, amount) in months {
                let month = month_key
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(|m| Month::try_from(m).ok());
                let amount = integral(amount).and_then(|a| Money::non_negative(a).ok());
                if let (Some(month), Some(amount)) = (month, amount) {
                    map.set(year, month, amount);
                }
            }
        }
        map
    }

    /// The full owner-document representation of this map.
    pub fn to_document(&self) -> Value {
        let years: Map<String, Value> = self
            .years
            .iter()
            .map(|(year, months)| {
                let months: Map<String, Value> = months
                    .iter()
                    .map(|(month, amount)| (month.index().to_string(), json!(amount.value())))
                    .collect();
                (year.to_string(), Value::Object(months))
            })
            .collect();
        json!({ (SALARY_FIELD): years })
    }

    /// The partial document that upserts exactly one leaf.
    pub fn leaf_patch(year: i32, month: Month, amount: Money) -> Value {
        json!({
            (SALARY_FIELD): {
                (year.to_string()): {
                    (month.index().to_string()): amount.value()
                }
            }
        })
    }
}

/// Read/merge-write access to one owner's salary map, with a local cache.
#[derive(Debug)]
pub struct SalaryBook<S> {
    store: S,
    owner_id: String,
    map: SalaryMap,
}

impl<S: SalaryStore> SalaryBook<S> {
    /// Load the owner's document. A missing document is an empty map.
    pub async fn load(store: S, owner_id: &str) -> ResultEngine<Self> {
        let document = store
            .get(owner_id)
            .await
            .map_err(EngineError::remote_read)?;
        let map = document
            .as_ref()
            .map(SalaryMap::from_document)
            .unwrap_or_default();
        tracing::debug!(owner = owner_id, "salary map loaded");
        Ok(Self {
            store,
            owner_id: owner_id.to_string(),
            map,
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn map(&self) -> &SalaryMap {
        &self.map
    }

    /// The salary for `(year, month)`, zero when unset.
    pub fn read_salary(&self, year: i32, month: Month) -> Money {
        self.map.amount(year, month)
    }

    /// Merge-write one leaf. Sibling months and years are left untouched.
    ///
    /// The amount is validated before any I/O; the local cache only changes
    /// once the store accepted the write.
    pub async fn write_salary(
        &mut self,
        year: i32,
        month: Month,
        amount: Money,
    ) -> ResultEngine<()> {
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "salary must be >= 0".to_string(),
            ));
        }
        if amount > Money::MAX {
            return Err(EngineError::InvalidAmount(format!(
                "salary must be <= {}",
                Money::MAX
            )));
        }
        let patch = SalaryMap::leaf_patch(year, month, amount);
        if let Err(err) = self.store.merge_set(&self.owner_id, patch).await {
            tracing::warn!(owner = %self.owner_id, year, month = %month, "salary write failed: {err}");
            return Err(EngineError::remote_write(err));
        }
        self.map.set(year, month, amount);
        tracing::info!(owner = %self.owner_id, year, month = %month, "salary updated");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "salary_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: String,
    pub document: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn parse(&self) -> ResultEngine<Value> {
        Ok(serde_json::from_str(&self.document)?)
    }
}

impl ActiveModel {
    /// A fully set row for `owner_id` holding `document`.
    pub(crate) fn with_document(
        owner_id: &str,
        document: &Value,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            owner_id: ActiveValue::Set(owner_id.to_string()),
            document: ActiveValue::Set(serde_json::to_string(document)?),
            updated_at: ActiveValue::Set(now),
        })
    }
}
