//! Live local view of the records in the current scope.
//!
//! [`SyncController`] owns at most one subscription at a time and a local
//! record list that mirrors the latest snapshot of that subscription. Local
//! inserts and removals show up immediately and are reconciled when their
//! writes settle or the next snapshot arrives, whichever comes first.
//!
//! Everything the controller learns arrives as a [`SyncEvent`] on a single
//! channel: snapshots, insert results and delete results. Each event carries
//! the scope it was produced for, and [`SyncController::apply`] discards any
//! event whose scope is no longer current, so a snapshot still in flight
//! from a previous cursor never overwrites the new one.
//!
//! A typical consumer loop:
//!
//! ```rust,ignore
//! controller.set_scope(Some(Scope::new("alice", cursor)))?;
//! while let Some(notice) = controller.process_next().await {
//!     render(controller.records(), notice);
//! }
//! ```

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    Cursor, EngineError, ExpenseRecord, NewExpense, RecordId, ResultEngine,
    store::{RecordStore, Scope, Snapshot},
};

/// Where the controller is in its subscription lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No owner or no cursor; the local list is empty.
    Idle,
    /// A subscription is open but has not delivered yet.
    Subscribing,
    /// The local list mirrors the latest snapshot.
    Live,
}

/// A record in the local list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalRecord {
    pub record: ExpenseRecord,
    /// `true` while the insert of an optimistic entry has not settled.
    pub pending: bool,
}

/// Input to the controller, tagged with the scope it belongs to.
#[derive(Debug)]
pub enum SyncEvent {
    Snapshot {
        scope: Scope,
        result: ResultEngine<Snapshot>,
    },
    InsertSettled {
        scope: Scope,
        temp_id: RecordId,
        result: ResultEngine<RecordId>,
    },
    RemoveSettled {
        scope: Scope,
        record: ExpenseRecord,
        result: ResultEngine<()>,
    },
}

impl SyncEvent {
    pub fn scope(&self) -> &Scope {
        match self {
            Self::Snapshot { scope, .. }
            | Self::InsertSettled { scope, .. }
            | Self::RemoveSettled { scope, .. } => scope,
        }
    }
}

/// What applying an event changed, for the consumer to react to.
#[derive(Debug, PartialEq)]
pub enum Notice {
    /// The local list was replaced by a snapshot of this many records.
    Refreshed(usize),
    /// An insert was confirmed with its store-assigned id.
    Inserted(RecordId),
    /// A delete was confirmed.
    Removed(RecordId),
    /// The event belonged to a scope that is no longer current.
    Stale,
    /// A remote operation failed; local state was rolled back or cleared.
    Failed(EngineError),
}

/// The subscription currently feeding the controller.
///
/// Dropping it aborts the forwarding task, which in turn drops the store
/// subscription and stops its producer.
#[derive(Debug)]
struct ActiveSubscription {
    scope: Scope,
    forwarder: JoinHandle<()>,
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.forwarder.abort();
        tracing::debug!(owner = %self.scope.owner_id, cursor = %self.scope.cursor, "subscription released");
    }
}

pub struct SyncController<S: RecordStore> {
    store: S,
    phase: Phase,
    records: Vec<LocalRecord>,
    active: Option<ActiveSubscription>,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl<S: RecordStore> SyncController<S> {
    pub fn new(store: S) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            store,
            phase: Phase::Idle,
            records: Vec::new(),
            active: None,
            events_tx,
            events_rx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.active.as_ref().map(|active| &active.scope)
    }

    /// The local list, newest first, optimistic entries on top.
    pub fn records(&self) -> &[LocalRecord] {
        &self.records
    }

    /// The local list as plain records, for aggregation.
    pub fn expense_records(&self) -> impl Iterator<Item = &ExpenseRecord> + '_ {
        self.records.iter().map(|local| &local.record)
    }

    /// Point the controller at `scope`, or detach it with `None`.
    ///
    /// The previous subscription is released before a new one is opened and
    /// the local list is cleared. Setting the current scope again is a
    /// no-op.
    pub fn set_scope(&mut self, scope: Option<Scope>) -> ResultEngine<()> {
        if self.scope() == scope.as_ref() {
            return Ok(());
        }

        self.active = None;
        self.records.clear();
        self.phase = Phase::Idle;

        let Some(scope) = scope else {
            tracing::info!("sync detached");
            return Ok(());
        };

        let mut subscription = self
            .store
            .subscribe(scope.clone())
            .map_err(EngineError::remote_read)?;
        let events = self.events_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(result) = subscription.next().await {
                let event = SyncEvent::Snapshot {
                    scope: subscription.scope().clone(),
                    result,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        });

        tracing::info!(owner = %scope.owner_id, cursor = %scope.cursor, "sync subscribing");
        self.active = Some(ActiveSubscription { scope, forwarder });
        self.phase = Phase::Subscribing;
        Ok(())
    }

    /// Move to another cursor for the same owner.
    pub fn set_cursor(&mut self, cursor: Cursor) -> ResultEngine<()> {
        let owner_id = self
            .scope()
            .map(|scope| scope.owner_id.clone())
            .ok_or_else(|| EngineError::NoScope("no owner to move the cursor for".to_string()))?;
        self.set_scope(Some(Scope { owner_id, cursor }))
    }

    /// Drop the subscription and the local list.
    pub fn logout(&mut self) {
        // Detaching never touches the store, so it cannot fail.
        let _ = self.set_scope(None);
    }

    /// Show `draft` immediately and write it in the background.
    ///
    /// Returns the temporary id of the optimistic entry. The entry is only
    /// shown when the draft belongs to the current cursor. Its write result
    /// arrives later as a [`SyncEvent::InsertSettled`].
    pub fn insert(&mut self, draft: NewExpense) -> ResultEngine<RecordId> {
        draft.validate()?;
        let scope = self.require_scope()?.clone();
        if draft.owner_id != scope.owner_id {
            return Err(EngineError::InvalidId(format!(
                "draft owner {} does not match the active owner",
                draft.owner_id
            )));
        }

        let temp_id = RecordId::pending();
        if draft.belongs_to(scope.cursor) {
            let optimistic = draft.clone().into_record(temp_id.clone(), chrono::Utc::now());
            self.records.insert(
                0,
                LocalRecord {
                    record: optimistic,
                    pending: true,
                },
            );
        }

        let store = self.store.clone();
        let events = self.events_tx.clone();
        let settled_id = temp_id.clone();
        tokio::spawn(async move {
            let result = store.insert(draft).await;
            let _ = events.send(SyncEvent::InsertSettled {
                scope,
                temp_id: settled_id,
                result,
            });
        });

        Ok(temp_id)
    }

    /// Hide the record immediately and delete it in the background.
    ///
    /// The result arrives later as a [`SyncEvent::RemoveSettled`]; a failed
    /// delete puts the record back.
    pub fn remove(&mut self, id: &RecordId) -> ResultEngine<()> {
        let scope = self.require_scope()?.clone();
        if id.is_pending() {
            return Err(EngineError::InvalidId(format!(
                "{id} is not confirmed by the store yet"
            )));
        }
        let position = self
            .records
            .iter()
            .position(|local| &local.record.id == id)
            .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))?;
        let removed = self.records.remove(position).record;

        let store = self.store.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = store.delete(&removed.id).await;
            let _ = events.send(SyncEvent::RemoveSettled {
                scope,
                record: removed,
                result,
            });
        });

        Ok(())
    }

    /// Wait for the next event.
    ///
    /// The controller keeps a sender of its own channel, so this only
    /// returns `None` if the runtime is shutting down.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events_rx.recv().await
    }

    /// Wait for the next event and apply it.
    pub async fn process_next(&mut self) -> Option<Notice> {
        let event = self.next_event().await?;
        Some(self.apply(event))
    }

    /// Fold one event into the local state.
    pub fn apply(&mut self, event: SyncEvent) -> Notice {
        let current = self.scope() == Some(event.scope());
        match event {
            SyncEvent::Snapshot { scope, result } => {
                if !current {
                    tracing::warn!(owner = %scope.owner_id, cursor = %scope.cursor, "stale snapshot discarded");
                    return Notice::Stale;
                }
                match result {
                    Ok(snapshot) => {
                        let len = snapshot.len();
                        self.records = snapshot
                            .into_iter()
                            .map(|record| LocalRecord {
                                record,
                                pending: false,
                            })
                            .collect();
                        self.phase = Phase::Live;
                        tracing::debug!(cursor = %scope.cursor, records = len, "snapshot applied");
                        Notice::Refreshed(len)
                    }
                    Err(err) => {
                        tracing::error!(cursor = %scope.cursor, "subscription failed: {err}");
                        self.records.clear();
                        self.phase = Phase::Subscribing;
                        Notice::Failed(EngineError::remote_read(err))
                    }
                }
            }
            SyncEvent::InsertSettled {
                scope: _,
                temp_id,
                result,
            } => match result {
                Ok(id) => {
                    if current
                        && let Some(local) = self
                            .records
                            .iter_mut()
                            .find(|local| local.record.id == temp_id)
                    {
                        local.record.id = id.clone();
                        local.pending = false;
                    }
                    Notice::Inserted(id)
                }
                Err(err) => {
                    tracing::warn!(temp_id = %temp_id, "insert failed: {err}");
                    if current {
                        self.records.retain(|local| local.record.id != temp_id);
                    }
                    Notice::Failed(EngineError::remote_write(err))
                }
            },
            SyncEvent::RemoveSettled {
                scope: _,
                record,
                result,
            } => match result {
                Ok(()) => Notice::Removed(record.id),
                Err(err) => {
                    tracing::warn!(id = %record.id, "delete failed: {err}");
                    if current && !self.records.iter().any(|local| local.record.id == record.id) {
                        self.restore(record);
                    }
                    Notice::Failed(EngineError::remote_write(err))
                }
            },
        }
    }

    fn require_scope(&self) -> ResultEngine<&Scope> {
        self.scope()
            .ok_or_else(|| EngineError::NoScope("no owner or cursor selected".to_string()))
    }

    /// Put a confirmed record back in creation order (newest first), below
    /// any optimistic entries.
    fn restore(&mut self, record: ExpenseRecord) {
        let position = self
            .records
            .iter()
            .position(|local| !local.pending && local.record.created_at < record.created_at)
            .unwrap_or(self.records.len());
        self.records.insert(
            position,
            LocalRecord {
                record,
                pending: false,
            },
        );
    }
}

impl<S: RecordStore> std::fmt::Debug for SyncController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("phase", &self.phase)
            .field("scope", &self.scope())
            .field("records", &self.records.len())
            .finish()
    }
}
