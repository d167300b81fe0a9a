//! SQLite-backed store.
//!
//! Expenses live in the `expenses` table, salary documents in
//! `salary_documents` as JSON text. Every committed write bumps a revision
//! counter; subscriptions re-run their query whenever it moves, so each
//! subscriber always receives a full, fresh snapshot.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};

use crate::{
    EngineError, ExpenseRecord, Money, NewExpense, RecordId, ResultEngine, records, salary,
    store::{RecordStore, SalaryStore, Scope, Snapshot, Subscription},
    util::deep_merge,
};

/// Snapshots buffered per subscriber before the producer waits.
const SNAPSHOT_BUFFER: usize = 16;

#[derive(Clone, Debug)]
pub struct SqliteStore {
    database: DatabaseConnection,
    revision: Arc<watch::Sender<u64>>,
}

impl SqliteStore {
    /// Return a builder for `SqliteStore`.
    pub fn builder() -> SqliteStoreBuilder {
        SqliteStoreBuilder::default()
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    /// Every record of `owner_id`, newest first, regardless of month.
    ///
    /// Used for whole-year rollups, where records without explicit
    /// month/year fields are attributed by their date.
    pub async fn owner_records(&self, owner_id: &str) -> ResultEngine<Snapshot> {
        let models = records::Entity::find()
            .filter(records::Column::OwnerId.eq(owner_id))
            .order_by_desc(records::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(ExpenseRecord::try_from).collect()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl RecordStore for SqliteStore {
    async fn query(&self, scope: &Scope) -> ResultEngine<Snapshot> {
        let models = records::Entity::find()
            .filter(records::Column::OwnerId.eq(scope.owner_id.as_str()))
            .filter(records::Column::Month.eq(scope.cursor.month.index() as i32))
            .filter(records::Column::Year.eq(scope.cursor.year))
            .order_by_desc(records::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(ExpenseRecord::try_from).collect()
    }

    fn subscribe(&self, scope: Scope) -> ResultEngine<Subscription> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| EngineError::RemoteRead(format!("no runtime: {err}")))?;
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let mut changes = self.revision.subscribe();
        let store = self.clone();
        let task_scope = scope.clone();

        let producer = runtime.spawn(async move {
            loop {
                // Mark the current revision as seen before querying, so a
                // write landing mid-query triggers another round.
                changes.borrow_and_update();
                let snapshot = store.query(&task_scope).await;
                if let Err(err) = &snapshot {
                    tracing::error!(owner = %task_scope.owner_id, cursor = %task_scope.cursor, "snapshot query failed: {err}");
                }
                if tx.send(snapshot).await.is_err() {
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        });

        tracing::debug!(owner = %scope.owner_id, cursor = %scope.cursor, "subscription opened");
        Ok(Subscription::new(scope, rx, producer))
    }

    async fn insert(&self, draft: NewExpense) -> ResultEngine<RecordId> {
        // Imported drafts skip label validation but never the amount range.
        Money::non_negative(draft.amount.value())?;
        let record = draft.into_record(RecordId::generate(), Utc::now());
        records::ActiveModel::from(&record)
            .insert(&self.database)
            .await?;
        self.bump();
        tracing::debug!(id = %record.id, owner = %record.owner_id, "expense stored");
        Ok(record.id)
    }

    async fn delete(&self, id: &RecordId) -> ResultEngine<()> {
        let result = records::Entity::delete_by_id(id.as_str().to_string())
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(id.to_string()));
        }
        self.bump();
        tracing::debug!(id = %id, "expense deleted");
        Ok(())
    }
}

impl SalaryStore for SqliteStore {
    async fn get(&self, owner_id: &str) -> ResultEngine<Option<Value>> {
        salary::Entity::find_by_id(owner_id.to_string())
            .one(&self.database)
            .await?
            .map(|model| model.parse())
            .transpose()
    }

    async fn merge_set(&self, owner_id: &str, partial: Value) -> ResultEngine<()> {
        if !partial.is_object() {
            return Err(EngineError::InvalidDocument(
                "partial document must be an object".to_string(),
            ));
        }

        let db_tx = self.database.begin().await?;
        let existing = salary::Entity::find_by_id(owner_id.to_string())
            .one(&db_tx)
            .await?;
        let exists = existing.is_some();
        let mut document = match existing {
            Some(model) => model.parse()?,
            None => Value::Object(Map::new()),
        };
        deep_merge(&mut document, partial);

        let row = salary::ActiveModel::with_document(owner_id, &document, Utc::now())?;
        if exists {
            row.update(&db_tx).await?;
        } else {
            row.insert(&db_tx).await?;
        }
        db_tx.commit().await?;
        tracing::debug!(owner = owner_id, "salary document merged");
        Ok(())
    }
}

/// The builder for `SqliteStore`
#[derive(Default)]
pub struct SqliteStoreBuilder {
    database: DatabaseConnection,
}

impl SqliteStoreBuilder {
    /// Pass the required database, already migrated.
    pub fn database(mut self, db: DatabaseConnection) -> SqliteStoreBuilder {
        self.database = db;
        self
    }

    /// Construct `SqliteStore`
    pub fn build(self) -> SqliteStore {
        let (revision, _) = watch::channel(0);
        SqliteStore {
            database: self.database,
            revision: Arc::new(revision),
        }
    }
}
