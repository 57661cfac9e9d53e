//! # Reconciliation Engine
//!
//! Generic machinery shared by the list reconcilers:
//!
//! - local mutations: lock, apply optimistically, call the backend, then
//!   confirm with the authoritative value or roll back, and finally unlock
//! - realtime notifications: decode, classify, check the lock table, apply
//! - refresh: wholesale replacement, held back while any action is in flight
//!
//! The store and lock table sit behind one synchronous mutex that is only
//! taken for short, non-async sections. The lock on an action is released
//! by a drop guard so every exit path of a mutation, `?` included, clears it.

use super::{RefreshOutcome, SyncError};
use crate::client::optimistic::{
    ActionLockTable, Entity, EntityPatch, OptimisticListStore, StoreError,
};
use crate::shared::error::RpcResult;
use crate::shared::event::{classify, ActionKind, HasId, InvalidChangePayload, RawChange};
use crate::shared::shopping::{EntityId, RecordId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Store and lock table of one reconciler
#[derive(Debug)]
pub struct SyncState<T: Entity> {
    pub store: OptimisticListStore<T>,
    pub locks: ActionLockTable,
}

/// How to undo an optimistic mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback<T> {
    /// The entity did not exist before; remove it
    Remove(EntityId),
    /// Put the previous value back at its old position
    Restore { index: usize, previous: T },
}

impl<T: Entity> Rollback<T> {
    /// Snapshot of the stored entity `id`
    pub fn capture(
        store: &OptimisticListStore<T>,
        id: EntityId,
        what: &'static str,
    ) -> Result<Self, SyncError> {
        store
            .get_item(id)
            .map(|(index, previous)| Rollback::Restore {
                index,
                previous: previous.clone(),
            })
            .ok_or(SyncError::NotFound { what, id })
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Rollback::Remove(_) => None,
            Rollback::Restore { index, .. } => Some(*index),
        }
    }

    /// Undo the mutation. A removed entity comes back at its old index
    /// without displacing whatever sits there now.
    pub fn apply(self, store: &mut OptimisticListStore<T>) -> Result<(), StoreError> {
        match self {
            Rollback::Remove(id) => {
                store.delete_item(id);
                Ok(())
            }
            Rollback::Restore { index, previous } => {
                store.upsert_entity(&previous, Some(index), false)?;
                Ok(())
            }
        }
    }
}

/// Swap a provisional entity for the one the backend created.
///
/// The confirmed entity takes the provisional one's position.
pub fn replace_provisional<T: Entity>(
    store: &mut OptimisticListStore<T>,
    provisional: EntityId,
    confirmed: &T,
) -> Result<usize, StoreError> {
    let index = store.get_item_index(provisional);
    if store.get_item_index(confirmed.id()).is_some() {
        store.delete_item(provisional);
        return store.upsert_entity(confirmed, index, false);
    }
    store.upsert_entity(confirmed, index, true)
}

/// Run `refresh` on `target` every `period` until `target` is dropped.
///
/// The first run happens one period after spawning. Failures are logged.
pub fn spawn_refresh_loop<S, F, Fut>(
    target: Weak<S>,
    period: Duration,
    refresh: F,
) -> JoinHandle<()>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<RefreshOutcome, SyncError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(target) = target.upgrade() else {
                break;
            };
            match refresh(target).await {
                Ok(outcome) => tracing::debug!(?outcome, "periodic refresh"),
                Err(e) => tracing::warn!(error = %e, "periodic refresh failed"),
            }
        }
    })
}

/// Collection-specific handling of realtime rows
#[async_trait]
pub trait ChangeSource: Send + Sync {
    type Entity: Entity;
    /// Shape of `record` in a notification
    type Row: DeserializeOwned + HasId + Send + Sync;

    /// Complete entity standing in for a row until the follow-up fetch lands
    fn placeholder(&self, row: &Self::Row) -> Result<Self::Entity, SyncError>;

    /// Where new placeholders go; `None` appends
    fn placeholder_index(&self) -> Option<usize> {
        None
    }

    /// Fields of a row that can be applied to a stored entity as they are
    fn patch(&self, row: &Self::Row) -> EntityPatch;

    /// Authoritative state of one entity
    async fn fetch(&self, id: EntityId) -> Result<EntityPatch, SyncError>;
}

/// Reconciliation engine for one collection
#[derive(Debug)]
pub struct Reconciler<T: Entity> {
    name: &'static str,
    state: Mutex<SyncState<T>>,
    loading: AtomicUsize,
    last_error: Mutex<Option<SyncError>>,
    alive: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    provisional_ids: AtomicI64,
}

impl<T: Entity> Reconciler<T> {
    /// `name` labels log lines
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(SyncState {
                store: OptimisticListStore::new(),
                locks: ActionLockTable::new(),
            }),
            loading: AtomicUsize::new(0),
            last_error: Mutex::new(None),
            alive: AtomicBool::new(true),
            tasks: Mutex::new(Vec::new()),
            provisional_ids: AtomicI64::new(0),
        }
    }

    /// Id for an entity the backend has not created yet.
    ///
    /// Derived from the clock but strictly increasing, so creates issued in
    /// the same millisecond never share a placeholder.
    pub fn next_provisional_id(&self) -> EntityId {
        let candidate = chrono::Utc::now().timestamp_millis() * 2;
        let previous = self
            .provisional_ids
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.max(last + 2))
            })
            .unwrap_or_else(|last| last);
        candidate.max(previous + 2)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the store and lock table
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SyncState<T>) -> R) -> R {
        f(&mut self.lock_state())
    }

    /// Current contents of the store
    pub fn snapshot(&self) -> Vec<T> {
        self.lock_state().store.items().to_vec()
    }

    /// Snapshots published after every store mutation
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.lock_state().store.subscribe()
    }

    pub fn get(&self, id: EntityId) -> Option<T> {
        self.lock_state().store.get_item(id).map(|(_, item)| item.clone())
    }

    /// Whether a realtime notification of `kind` for `id` would be ignored
    pub fn is_action_blocked(&self, id: EntityId, kind: ActionKind) -> bool {
        self.lock_state().locks.is_action_blocked(id, kind)
    }

    /// Whether any local action is waiting for the backend
    pub fn has_pending_actions(&self) -> bool {
        !self.lock_state().locks.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    fn start_loading(&self) -> LoadingGuard<'_> {
        self.loading.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            counter: &self.loading,
        }
    }

    /// Error of the most recent failed operation, cleared by the next success
    pub fn last_error(&self) -> Option<SyncError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_last_error(&self, error: Option<SyncError>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Keep `task` until shutdown
    pub fn track_task(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|running| !running.is_finished());
        tasks.push(task);
    }

    /// Stop background tasks and ignore every response still in flight
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task.abort();
        }
        tracing::debug!(reconciler = self.name, "reconciler shut down");
    }

    fn block(&self, id: EntityId, kind: ActionKind) -> ActionGuard<'_, T> {
        self.with_state(|state| state.locks.block_action(id, kind));
        tracing::trace!(reconciler = self.name, id, action = %kind, "action blocked");
        ActionGuard {
            reconciler: self,
            id,
            kind,
        }
    }

    /// Run one local mutation.
    ///
    /// `id` is blocked for `kind` before `apply` touches the store and
    /// released after the backend answered, whatever the outcome. On success
    /// `confirm` folds the backend value into the store; on failure the
    /// [`Rollback`] returned by `apply` is applied and the backend error is
    /// returned. Responses arriving after [`shutdown`](Self::shutdown) are
    /// returned but leave the store alone.
    pub async fn run_mutation<R, Fut>(
        &self,
        id: EntityId,
        kind: ActionKind,
        apply: impl FnOnce(&mut OptimisticListStore<T>) -> Result<Rollback<T>, SyncError>,
        remote: Fut,
        confirm: impl FnOnce(&mut OptimisticListStore<T>, &R) -> Result<(), StoreError>,
    ) -> Result<R, SyncError>
    where
        Fut: Future<Output = RpcResult<R>>,
    {
        let _loading = self.start_loading();
        let _action = self.block(id, kind);
        let rollback = self.with_state(|state| apply(&mut state.store))?;

        let result = remote.await;
        if !self.is_alive() {
            tracing::debug!(reconciler = self.name, id, action = %kind, "stale response ignored");
            return result.map_err(SyncError::from);
        }

        match result {
            Ok(value) => {
                if let Err(e) = self.with_state(|state| confirm(&mut state.store, &value)) {
                    let error = SyncError::from(e);
                    tracing::error!(reconciler = self.name, id, action = %kind, error = %error, "could not apply backend value");
                    self.set_last_error(Some(error.clone()));
                    return Err(error);
                }
                self.set_last_error(None);
                Ok(value)
            }
            Err(network) => {
                tracing::warn!(reconciler = self.name, id, action = %kind, error = %network, "backend call failed, rolling back");
                if let Err(e) = self.with_state(|state| rollback.apply(&mut state.store)) {
                    tracing::error!(reconciler = self.name, id, error = %e, "rollback failed");
                }
                let error = SyncError::Network(network);
                self.set_last_error(Some(error.clone()));
                Err(error)
            }
        }
    }

    /// Fetch the whole collection and make it the store contents.
    ///
    /// While any action is in flight the result is discarded so no
    /// optimistic entry is lost; the next refresh picks it up.
    pub async fn refresh_with<Fut>(&self, fetch: Fut) -> Result<RefreshOutcome, SyncError>
    where
        Fut: Future<Output = RpcResult<Vec<T>>>,
    {
        let _loading = self.start_loading();
        match fetch.await {
            Ok(items) => {
                self.set_last_error(None);
                Ok(self.replace_unless_locked(items))
            }
            Err(network) => {
                tracing::warn!(reconciler = self.name, error = %network, "refresh failed");
                let error = SyncError::Network(network);
                self.set_last_error(Some(error.clone()));
                Err(error)
            }
        }
    }

    /// Replace the store contents unless an action is in flight
    pub fn replace_unless_locked(&self, items: Vec<T>) -> RefreshOutcome {
        if !self.is_alive() {
            return RefreshOutcome::Deferred;
        }
        let outcome = self.with_state(|state| {
            if !state.locks.is_empty() {
                return RefreshOutcome::Deferred;
            }
            state.store.replace_all(items);
            RefreshOutcome::Applied
        });
        if outcome == RefreshOutcome::Deferred {
            tracing::debug!(reconciler = self.name, "refresh deferred, local actions in flight");
        }
        outcome
    }

    /// Fold one realtime notification into the store.
    ///
    /// Never fails: anything wrong with the notification or the follow-up
    /// fetch is logged and the notification dropped.
    pub async fn apply_change<S>(&self, source: &S, change: RawChange)
    where
        S: ChangeSource<Entity = T>,
    {
        if !self.is_alive() {
            return;
        }
        if let Err(e) = self.try_apply_change(source, change).await {
            tracing::error!(reconciler = self.name, error = %e, "dropped change notification");
        }
    }

    async fn try_apply_change<S>(&self, source: &S, change: RawChange) -> Result<(), SyncError>
    where
        S: ChangeSource<Entity = T>,
    {
        let change = change.decode::<S::Row, RecordId>()?;
        let kind = classify(&change)?;
        let id = change.entity_id().ok_or(InvalidChangePayload)?;

        let row = match (kind, change.record) {
            (ActionKind::Delete, _) => None,
            (_, Some(row)) => Some(row),
            (_, None) => return Err(InvalidChangePayload.into()),
        };
        let prepared = row.as_ref().map(|row| (source.patch(row), source.placeholder(row)));
        let index = source.placeholder_index();

        // lock check and mutation share one critical section
        let applied = self.with_state(|state| {
            if state.locks.is_action_blocked(id, kind) {
                return Ok(RemoteApply::Suppressed);
            }
            let Some((patch, placeholder)) = prepared else {
                let removed = state.store.delete_item(id);
                return Ok(RemoteApply::Deleted(removed.is_some()));
            };
            // a stored entity takes the row as a patch, anything else a placeholder
            if state.store.get_item_index(id).is_some() {
                state.store.upsert_item(Some(patch), None, false)?;
            } else {
                state.store.upsert_entity(&placeholder?, index, false)?;
            }
            Ok::<_, SyncError>(RemoteApply::Applied)
        })?;

        match applied {
            RemoteApply::Suppressed => {
                tracing::debug!(reconciler = self.name, id, kind = %kind, "change suppressed by local action");
                Ok(())
            }
            RemoteApply::Deleted(removed) => {
                tracing::debug!(reconciler = self.name, id, removed, "remote delete");
                Ok(())
            }
            RemoteApply::Applied => {
                tracing::debug!(reconciler = self.name, id, kind = %kind, "remote change applied");
                self.hydrate(source, id).await
            }
        }
    }

    /// Lay the authoritative record over whatever the store holds for `id`
    async fn hydrate<S>(&self, source: &S, id: EntityId) -> Result<(), SyncError>
    where
        S: ChangeSource<Entity = T>,
    {
        let patch = source.fetch(id).await?;
        if !self.is_alive() {
            return Ok(());
        }
        self.with_state(|state| {
            if state.locks.contains(id) {
                tracing::debug!(reconciler = self.name, id, "follow-up fetch superseded by local action");
                return Ok(());
            }
            if state.store.get_item_index(id).is_none() {
                tracing::debug!(reconciler = self.name, id, "entity gone before follow-up fetch resolved");
                return Ok(());
            }
            state.store.upsert_item(Some(patch), None, false).map(|_| ())
        })?;
        Ok(())
    }
}

impl<T: Entity> Drop for Reconciler<T> {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner).drain(..) {
            task.abort();
        }
    }
}

/// What a realtime change did to the store
enum RemoteApply {
    Suppressed,
    Deleted(bool),
    Applied,
}

struct LoadingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ActionGuard<'a, T: Entity> {
    reconciler: &'a Reconciler<T>,
    id: EntityId,
    kind: ActionKind,
}

impl<T: Entity> Drop for ActionGuard<'_, T> {
    fn drop(&mut self) {
        let (id, kind) = (self.id, self.kind);
        self.reconciler
            .with_state(|state| state.locks.release_action(id, kind));
        tracing::trace!(reconciler = self.reconciler.name, id, action = %kind, "action released");
    }
}
