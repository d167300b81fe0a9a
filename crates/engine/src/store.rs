//! Store seams.
//!
//! [`RecordStore`] and [`SalaryStore`] are what the sync layer and the
//! salary accessor talk to. [`crate::SqliteStore`] implements both; tests
//! provide their own implementations to inject failures and delays.

use std::future::Future;

use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{Cursor, ExpenseRecord, NewExpense, RecordId, ResultEngine};

/// A full point-in-time list of records matching a scope, newest first.
pub type Snapshot = Vec<ExpenseRecord>;

/// What a subscription is filtered on: owner, month and year equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    pub owner_id: String,
    pub cursor: Cursor,
}

impl Scope {
    pub fn new(owner_id: &str, cursor: Cursor) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            cursor,
        }
    }
}

/// A live stream of snapshots for one scope.
///
/// The producing task is aborted when the subscription is dropped, so
/// releasing the handle is all it takes to unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    scope: Scope,
    snapshots: mpsc::Receiver<ResultEngine<Snapshot>>,
    producer: JoinHandle<()>,
}

impl Subscription {
    pub fn new(
        scope: Scope,
        snapshots: mpsc::Receiver<ResultEngine<Snapshot>>,
        producer: JoinHandle<()>,
    ) -> Self {
        Self {
            scope,
            snapshots,
            producer,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Wait for the next snapshot. `None` once the producer stopped.
    pub async fn next(&mut self) -> Option<ResultEngine<Snapshot>> {
        self.snapshots.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

/// The collection of expense records.
pub trait RecordStore: Clone + Send + Sync + 'static {
    /// Current records of `scope`, newest first.
    fn query(&self, scope: &Scope) -> impl Future<Output = ResultEngine<Snapshot>> + Send;

    /// Start pushing a snapshot of `scope` now and after every change.
    ///
    /// Must be called from within a tokio runtime.
    fn subscribe(&self, scope: Scope) -> ResultEngine<Subscription>;

    /// Store a record; the store assigns its id and creation time.
    fn insert(&self, draft: NewExpense) -> impl Future<Output = ResultEngine<RecordId>> + Send;

    fn delete(&self, id: &RecordId) -> impl Future<Output = ResultEngine<()>> + Send;
}

/// One JSON document per owner.
pub trait SalaryStore: Clone + Send + Sync + 'static {
    fn get(&self, owner_id: &str) -> impl Future<Output = ResultEngine<Option<Value>>> + Send;

    /// Deep-merge `partial` into the owner's document, creating it if
    /// needed. Keys absent from `partial` are preserved at every level.
    fn merge_set(
        &self,
        owner_id: &str,
        partial: Value,
    ) -> impl Future<Output = ResultEngine<()>> + Send;
}
