use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::client::TodoStore;
use crate::error::{ClientError, MutationKind, SyncError};
use crate::models::{Deadline, NewTodo, Todo, TodoPatch};
use crate::sync::session::EditSession;
use crate::sync::state::SyncState;

pub const LOAD_ERROR_MESSAGE: &str = "Error fetching todos";

/// How local state catches up after a successful update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileStrategy {
    /// Replace the local record with the one the store returned.
    #[default]
    PatchLocal,
    /// Fetch the whole list again.
    Refetch,
}

impl FromStr for ReconcileStrategy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" | "patch_local" | "local" => Ok(ReconcileStrategy::PatchLocal),
            "refetch" => Ok(ReconcileStrategy::Refetch),
            other => Err(ClientError::Config(format!(
                "unknown reconcile strategy: {} (expected patch or refetch)",
                other
            ))),
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::PatchLocal => f.write_str("patch"),
            ReconcileStrategy::Refetch => f.write_str("refetch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Failed(String),
    Ready,
}

/// What happened to a mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The id was not in local state; nothing was sent.
    Missing,
    /// A newer update for the same id succeeded before this one resolved.
    /// Its response was discarded.
    Superseded,
}

/// One table row as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoRow {
    pub id: String,
    pub text: String,
    pub deadline: Deadline,
    pub completed: bool,
    pub editing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoView {
    Loading,
    Error(String),
    Rows(Vec<TodoRow>),
}

/// A mutation applied locally while a fetch may still be in flight.
enum Settled {
    Upsert(u64, Todo),
    Remove(u64, String),
}

struct Inner {
    state: SyncState,
    session: EditSession,
    load: LoadState,
    fetch_generation: u64,
    /// Clock value when the latest fetch was issued, while it is in flight.
    pending_fetch: Option<u64>,
    clock: u64,
    /// Sequence number of the newest successful update per id.
    applied: HashMap<String, u64>,
    settled: Vec<Settled>,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// True if a mutation for `id` issued after `seq` has already succeeded.
    fn superseded(&self, id: &str, seq: u64) -> bool {
        self.applied.get(id).is_some_and(|&last| last > seq)
    }

    fn record_upsert(&mut self, todo: &Todo) {
        let stamp = self.tick();
        if self.pending_fetch.is_some() {
            self.settled.push(Settled::Upsert(stamp, todo.clone()));
        }
    }

    fn record_remove(&mut self, id: &str) {
        let stamp = self.tick();
        if self.pending_fetch.is_some() {
            self.settled.push(Settled::Remove(stamp, id.to_string()));
        }
    }

    /// Replays mutations that settled after a fetch was issued, since the
    /// fetched list may predate them.
    fn replay_since(&mut self, issued_at: u64, settled: Vec<Settled>) {
        for change in settled {
            match change {
                Settled::Upsert(stamp, todo) if stamp > issued_at => {
                    self.session.set_completed(&todo.id, todo.completed);
                    self.state.append(todo);
                }
                Settled::Remove(stamp, id) if stamp > issued_at => {
                    self.state.remove(&id);
                    self.session.forget(&id);
                }
                _ => {}
            }
        }
    }
}

/// Shared handle over the remote store and the local view of it.
///
/// Clones share the same state. The lock is only held between awaits, never
/// across a request.
#[derive(Clone)]
pub struct TodoSync {
    store: Arc<dyn TodoStore>,
    strategy: ReconcileStrategy,
    inner: Arc<Mutex<Inner>>,
}

impl TodoSync {
    pub fn new(store: Arc<dyn TodoStore>, strategy: ReconcileStrategy) -> Self {
        Self {
            store,
            strategy,
            inner: Arc::new(Mutex::new(Inner {
                state: SyncState::new(),
                session: EditSession::new(),
                load: LoadState::Loading,
                fetch_generation: 0,
                pending_fetch: None,
                clock: 0,
                applied: HashMap::new(),
                settled: Vec::new(),
            })),
        }
    }

    /// Fetches the list and reseeds local state and the completion buffer.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let (generation, issued_at) = {
            let mut inner = self.inner.lock().await;
            inner.fetch_generation += 1;
            let issued_at = inner.tick();
            inner.pending_fetch = Some(issued_at);
            (inner.fetch_generation, issued_at)
        };

        let result = self.store.list().await;

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if generation != inner.fetch_generation {
            debug!("discarding superseded fetch (generation {})", generation);
            return Ok(());
        }
        inner.pending_fetch = None;
        let settled = std::mem::take(&mut inner.settled);

        match result {
            Ok(todos) => {
                inner.state.seed(todos);
                inner.session.reseed_completion(inner.state.iter());
                inner.replay_since(issued_at, settled);
                inner.load = LoadState::Ready;
                info!("loaded {} todos", inner.state.len());
                Ok(())
            }
            Err(e) => {
                error!("{}: {}", LOAD_ERROR_MESSAGE, e);
                inner.load = LoadState::Failed(LOAD_ERROR_MESSAGE.to_string());
                Err(SyncError::Load(e))
            }
        }
    }

    /// Creates a record with a fresh id. Blank text is rejected before any
    /// request is made.
    pub async fn create(&self, new_todo: NewTodo) -> Result<Todo, SyncError> {
        if new_todo.text.trim().is_empty() {
            return Err(SyncError::EmptyText);
        }
        let todo = new_todo.into_todo();

        match self.store.create(&todo).await {
            Ok(stored) => {
                let mut inner = self.inner.lock().await;
                inner.session.set_completed(&stored.id, stored.completed);
                inner.state.append(stored.clone());
                inner.record_upsert(&stored);
                info!("created todo {}", stored.id);
                Ok(stored)
            }
            Err(e) => {
                error!("Error adding todo {}: {}", todo.id, e);
                Err(SyncError::Mutation {
                    kind: MutationKind::Create,
                    id: todo.id,
                    source: e,
                })
            }
        }
    }

    /// Sends the edit session's pending values for `id`.
    ///
    /// On failure the row stays in edit mode with its draft intact.
    pub async fn commit(&self, id: &str) -> Result<MutationOutcome, SyncError> {
        let (merged, seq) = {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;
            let Some(original) = inner.state.get(id) else {
                return Ok(MutationOutcome::Missing);
            };
            let merged = inner.session.merge(original);
            (merged, inner.tick())
        };

        let result = self.store.update(&merged).await;
        self.reconcile_update(id, seq, result, true).await
    }

    /// Applies `patch` over the current record and sends it, bypassing the
    /// edit session.
    pub async fn update(&self, id: &str, patch: TodoPatch) -> Result<MutationOutcome, SyncError> {
        let (merged, seq) = {
            let mut inner = self.inner.lock().await;
            let Some(original) = inner.state.get(id) else {
                return Ok(MutationOutcome::Missing);
            };
            let merged = patch.apply(original);
            (merged, inner.tick())
        };

        let result = self.store.update(&merged).await;
        self.reconcile_update(id, seq, result, false).await
    }

    /// Deletes `id` on the store. The request is sent even when the id is
    /// not in local state.
    pub async fn delete(&self, id: &str) -> Result<MutationOutcome, SyncError> {
        let result = self.store.delete(id).await;

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        match result {
            Ok(()) => {
                inner.state.remove(id);
                inner.session.forget(id);
                inner.applied.remove(id);
                inner.record_remove(id);
                info!("deleted todo {}", id);
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                error!("Error deleting todo {}: {}", id, e);
                Err(SyncError::Mutation {
                    kind: MutationKind::Delete,
                    id: id.to_string(),
                    source: e,
                })
            }
        }
    }

    async fn reconcile_update(
        &self,
        id: &str,
        seq: u64,
        result: Result<Todo, ClientError>,
        from_session: bool,
    ) -> Result<MutationOutcome, SyncError> {
        {
            let mut guard = self.inner.lock().await;
            let inner = &mut *guard;

            let stored = match result {
                Ok(stored) => stored,
                Err(e) => {
                    error!("Error updating todo {}: {}", id, e);
                    return Err(SyncError::Mutation {
                        kind: MutationKind::Update,
                        id: id.to_string(),
                        source: e,
                    });
                }
            };

            if inner.superseded(id, seq) {
                debug!("discarding superseded response for todo {} (seq {})", id, seq);
                return Ok(MutationOutcome::Superseded);
            }
            inner.applied.insert(id.to_string(), seq);

            if from_session {
                inner.session.finish(id);
            }
            // a delete may have settled while this update was in flight
            if inner.state.contains(id) {
                inner.session.set_completed(id, stored.completed);
                if self.strategy == ReconcileStrategy::PatchLocal {
                    inner.state.replace(stored.clone());
                    inner.record_upsert(&stored);
                }
            }
            info!("updated todo {}", id);
        }

        if self.strategy == ReconcileStrategy::Refetch {
            self.refresh().await?;
        }
        Ok(MutationOutcome::Applied)
    }

    pub async fn begin_edit(&self, id: &str, current_text: &str) {
        self.inner.lock().await.session.begin_edit(id, current_text);
    }

    pub async fn set_text(&self, value: impl Into<String>) -> Result<(), SyncError> {
        self.inner.lock().await.session.set_text(value)
    }

    pub async fn set_date_range(&self, deadline: Deadline) -> Result<(), SyncError> {
        self.inner.lock().await.session.set_date_range(deadline)
    }

    pub async fn set_completed(&self, id: &str, completed: bool) {
        self.inner.lock().await.session.set_completed(id, completed);
    }

    pub async fn cancel_edit(&self) {
        self.inner.lock().await.session.cancel();
    }

    pub async fn editing(&self) -> Option<String> {
        self.inner.lock().await.session.active().map(str::to_string)
    }

    pub async fn completion(&self, id: &str) -> Option<bool> {
        self.inner.lock().await.session.completed(id)
    }

    pub async fn load_state(&self) -> LoadState {
        self.inner.lock().await.load.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Todo> {
        self.inner.lock().await.state.get(id).cloned()
    }

    /// Records in remote order.
    pub async fn todos(&self) -> Vec<Todo> {
        self.inner.lock().await.state.iter().cloned().collect()
    }

    pub async fn view(&self) -> TodoView {
        let inner = self.inner.lock().await;
        match &inner.load {
            LoadState::Loading => TodoView::Loading,
            LoadState::Failed(message) => TodoView::Error(message.clone()),
            LoadState::Ready => TodoView::Rows(
                inner
                    .state
                    .display_order()
                    .map(|todo| {
                        let editing = inner.session.is_editing(&todo.id);
                        let text = match inner.session.draft(&todo.id) {
                            Some(draft) if editing => draft.text.clone(),
                            _ => todo.text.clone(),
                        };
                        TodoRow {
                            id: todo.id.clone(),
                            text,
                            deadline: todo.deadline,
                            completed: inner.session.completed(&todo.id).unwrap_or(todo.completed),
                            editing,
                        }
                    })
                    .collect(),
            ),
        }
    }
}
