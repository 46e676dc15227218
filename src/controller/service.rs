//! Controller - single authority for persisted state and the search lifecycle

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::registry::{SearchPhase, SearchRegistry};
use super::state::{PersistedState, PersistedStatePatch};
use super::storage::{StateStore, STATE_KEY};
use crate::acai::query::AcaiRecordFilter;
use crate::acai::{book_catalog, AcaiRecord, SearchBackend, SearchError, SearchParameters};
use crate::protocol::{decode_panel_message, ControllerMessage, CorrelationId, PanelMessage};

struct Shared {
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn StateStore>,
    registry: SearchRegistry,
    state: Mutex<PersistedState>,
    outbound: UnboundedSender<ControllerMessage>,
}

/// Cheap to clone; clones share the same state, registry and channel.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    /// Build a Controller, seeding its state from storage.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn StateStore>,
        outbound: UnboundedSender<ControllerMessage>,
    ) -> Self {
        let initial = load_from(store.as_ref());
        Self {
            shared: Arc::new(Shared {
                backend,
                store,
                registry: SearchRegistry::new(),
                state: Mutex::new(initial),
                outbound,
            }),
        }
    }

    /// Read the snapshot from storage, falling back to defaults.
    pub fn load_state(&self) -> PersistedState {
        load_from(self.shared.store.as_ref())
    }

    /// Copy of the in-memory state
    pub fn state(&self) -> PersistedState {
        self.lock_state().clone()
    }

    pub fn registry(&self) -> &SearchRegistry {
        &self.shared.registry
    }

    /// Merge a partial update and persist it.
    pub fn update_state(&self, patch: PersistedStatePatch) {
        if patch.is_empty() {
            return;
        }
        self.mutate(|state| state.apply(patch));
    }

    /// Pin or unpin a record by id.
    pub fn toggle_pinned(&self, record: AcaiRecord) {
        let record_id = record.id.clone();
        let pinned = self.mutate(|state| state.toggle_pinned(record));
        log::debug!(
            "Record {} {}",
            record_id,
            if pinned { "pinned" } else { "unpinned" }
        );
    }

    /// Replace the pinned set.
    pub fn set_pinned(&self, records: Vec<AcaiRecord>) {
        self.mutate(|state| state.set_pinned(records));
    }

    /// Send the full current state to the Panel.
    pub fn restore_state(&self) {
        let state = self.state();
        self.emit(ControllerMessage::RestoreState { state });
    }

    pub fn send_book_data(&self) {
        self.emit(ControllerMessage::SetBookData {
            book_data: book_catalog(),
        });
    }

    /// Idle → Dispatched. Invalid input is answered with `searchError` right away and
    /// never reaches the backend. Returns the background task when one was spawned.
    pub fn start_search(
        &self,
        params: SearchParameters,
        correlation_id: CorrelationId,
    ) -> Option<JoinHandle<()>> {
        if let Err(err) = AcaiRecordFilter::from_parameters(&params) {
            log::info!("Rejecting search {}: {}", correlation_id, err);
            self.emit(ControllerMessage::SearchError {
                message: err.user_message(),
                correlation_id,
            });
            return None;
        }

        let cancel_token = match self
            .shared
            .registry
            .register(correlation_id.clone(), params.clone())
        {
            Ok(token) => token,
            Err(phase) => {
                log::warn!(
                    "Ignoring search with reused correlation id {} (already {:?})",
                    correlation_id,
                    phase
                );
                return None;
            }
        };

        log::info!("Search {} dispatched: {:?}", correlation_id, params);

        let controller = self.clone();
        let backend = self.shared.backend.clone();
        Some(tokio::spawn(async move {
            let result = backend.search(&params, &cancel_token).await;
            controller.finish_search(correlation_id, params, result);
        }))
    }

    /// Dispatched → Cancelled. Does not wait for the backend to notice.
    pub fn cancel_search(&self, correlation_id: &CorrelationId) -> bool {
        if !self.shared.registry.cancel(correlation_id) {
            log::debug!(
                "Cancel for {} ignored ({:?})",
                correlation_id,
                self.shared.registry.phase(correlation_id)
            );
            return false;
        }

        log::info!("Search {} cancelled", correlation_id);
        self.emit(ControllerMessage::SearchCancelled {
            correlation_id: correlation_id.clone(),
        });
        true
    }

    fn finish_search(
        &self,
        correlation_id: CorrelationId,
        params: SearchParameters,
        result: Result<Vec<AcaiRecord>, SearchError>,
    ) {
        let registry = &self.shared.registry;

        match result {
            Ok(records) => {
                let Some(entry) = registry.settle(&correlation_id, SearchPhase::Resolved) else {
                    log::debug!("Discarding late result for {}", correlation_id);
                    return;
                };
                log::info!(
                    "Search {} resolved with {} records in {:?}",
                    correlation_id,
                    records.len(),
                    entry.dispatched_at.elapsed()
                );

                let snapshot = records.clone();
                self.mutate(|state| {
                    state.last_search = Some(params);
                    state.last_results = snapshot;
                });
                self.emit(ControllerMessage::SearchResult {
                    records,
                    correlation_id,
                });
            }
            Err(SearchError::Cancelled) => {
                // An explicit cancel has already acknowledged; only unsolicited ones need an ack
                if registry.settle(&correlation_id, SearchPhase::Cancelled).is_some() {
                    self.emit(ControllerMessage::SearchCancelled { correlation_id });
                } else {
                    log::debug!("Search {} finished cancelling", correlation_id);
                }
            }
            Err(err) => {
                if registry.settle(&correlation_id, SearchPhase::Failed).is_none() {
                    log::debug!("Discarding late failure for {}: {}", correlation_id, err);
                    return;
                }
                log::warn!("Search {} failed: {}", correlation_id, err);
                self.emit(ControllerMessage::SearchError {
                    message: err.user_message(),
                    correlation_id,
                });
            }
        }
    }

    /// Apply one Panel intent. Returns the search task if one was started.
    pub fn handle_message(&self, message: PanelMessage) -> Option<JoinHandle<()>> {
        log::debug!("Controller received {}", message.command());

        match message {
            PanelMessage::RequestInitialData => {
                self.send_book_data();
                self.restore_state();
            }
            PanelMessage::Search {
                params,
                correlation_id,
            } => return self.start_search(params, correlation_id),
            PanelMessage::CancelSearch { correlation_id } => {
                self.cancel_search(&correlation_id);
            }
            PanelMessage::UpdateState { state } => self.update_state(state),
            PanelMessage::RequestStateRestore => self.restore_state(),
            PanelMessage::UpdatePinnedRecords { records } => self.set_pinned(records),
            PanelMessage::TogglePinned { record } => self.toggle_pinned(record),
        }
        None
    }

    /// Decode and apply a raw webview payload. Malformed payloads are logged and dropped.
    pub fn handle_raw(&self, raw: &str) -> Option<JoinHandle<()>> {
        match decode_panel_message(raw) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                log::warn!("Dropping malformed panel message: {}", e);
                None
            }
        }
    }

    /// Process Panel messages one at a time until the channel closes.
    pub async fn run(self, mut inbound: UnboundedReceiver<PanelMessage>) {
        log::info!("Controller loop started");
        while let Some(message) = inbound.recv().await {
            self.handle_message(message);
        }

        let cancelled = self.shared.registry.cancel_all();
        if !cancelled.is_empty() {
            log::info!(
                "Panel channel closed, cancelled {} in-flight searches",
                cancelled.len()
            );
        }
        log::info!("Controller loop stopped");
    }

    fn lock_state(&self) -> MutexGuard<'_, PersistedState> {
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("Panel state lock poisoned, continuing with last value");
                poisoned.into_inner()
            }
        }
    }

    /// Mutate under the lock, then write the whole snapshot back before releasing it.
    fn mutate<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut PersistedState) -> T,
    {
        let mut state = self.lock_state();
        let out = f(&mut state);
        persist(self.shared.store.as_ref(), &state);
        out
    }

    fn emit(&self, message: ControllerMessage) {
        if self.shared.outbound.send(message).is_err() {
            log::debug!("Panel channel closed, dropping controller message");
        }
    }
}

fn load_from(store: &dyn StateStore) -> PersistedState {
    match store.load(STATE_KEY) {
        Ok(Some(json)) => match PersistedState::from_snapshot(&json) {
            Ok(Some(state)) => state,
            Ok(None) => {
                log::warn!("Stored panel state was written by a newer version, using defaults");
                PersistedState::default()
            }
            Err(e) => {
                log::warn!("Stored panel state is unreadable, using defaults: {}", e);
                PersistedState::default()
            }
        },
        Ok(None) => PersistedState::default(),
        Err(e) => {
            log::error!("Failed to load panel state, using defaults: {:#}", e);
            PersistedState::default()
        }
    }
}

fn persist(store: &dyn StateStore, state: &PersistedState) {
    let json = match serde_json::to_string(state) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Failed to serialize panel state: {}", e);
            return;
        }
    };
    if let Err(e) = store.save(STATE_KEY, &json) {
        log::warn!("Failed to persist panel state: {:#}", e);
    }
}
