// Host-side state for ACAI Resources
//
// Owns the Panel mirror and the two channel ends. The Controller never shares
// memory with the Panel: everything crosses the channels as messages.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::acai::{AcaiClient, AcaiConfig, SearchBackend};
use crate::config::AppConfig;
use crate::controller::{Controller, MemoryStore, StateStore};
use crate::database::DatabaseManager;
use crate::panel::{Panel, PanelAction, PanelView};
use crate::protocol::{ControllerMessage, PanelMessage};

/// Receiving ends handed to whoever drives the event loops
pub struct ControllerChannels {
    /// Panel → Controller, consumed by `Controller::run`
    pub panel_rx: UnboundedReceiver<PanelMessage>,
    /// Controller → Panel, consumed by `AppState::forward_to_panel`
    pub controller_rx: UnboundedReceiver<ControllerMessage>,
}

pub struct AppState {
    panel: Mutex<Panel>,
    to_controller: UnboundedSender<PanelMessage>,
    controller: Controller,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn StateStore>,
    ) -> (Self, ControllerChannels) {
        let (to_controller, panel_rx) = mpsc::unbounded_channel();
        let (to_panel, controller_rx) = mpsc::unbounded_channel();

        let controller = Controller::new(backend, store, to_panel);
        let state = Self {
            panel: Mutex::new(Panel::new()),
            to_controller,
            controller,
        };

        (
            state,
            ControllerChannels {
                panel_rx,
                controller_rx,
            },
        )
    }

    /// Build the production wiring: SQLite storage (or memory) and the HTTP client.
    pub fn from_config(config: &AppConfig) -> Result<(Self, ControllerChannels)> {
        let store = open_store(config);
        let client = AcaiClient::new(AcaiConfig::from(config))?;
        log::info!("ACAI client using {}", client.endpoint());
        Ok(Self::new(Arc::new(client), store))
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Apply a user action and send its messages to the Controller.
    pub async fn dispatch(&self, action: PanelAction) -> PanelView {
        let mut panel = self.panel.lock().await;
        for message in panel.dispatch(action) {
            if self.to_controller.send(message).is_err() {
                log::error!("Controller loop is gone, dropping panel message");
            }
        }
        panel.view()
    }

    pub async fn apply(&self, message: ControllerMessage) -> PanelView {
        let mut panel = self.panel.lock().await;
        panel.apply(message);
        panel.view()
    }

    pub async fn view(&self) -> PanelView {
        self.panel.lock().await.view()
    }

    /// Throw away the Panel's in-memory state, as when the panel is disposed and re-created.
    /// The caller is expected to dispatch `PanelAction::Mount` afterwards.
    pub async fn remount(&self) {
        *self.panel.lock().await = Panel::new();
    }

    /// Apply Controller messages as they arrive, reporting each new view.
    pub async fn forward_to_panel<F>(&self, mut inbound: UnboundedReceiver<ControllerMessage>, mut on_view: F)
    where
        F: FnMut(&PanelView),
    {
        while let Some(message) = inbound.recv().await {
            let view = self.apply(message).await;
            on_view(&view);
        }
        log::info!("Controller channel closed");
    }
}

/// Open the SQLite store, falling back to memory so the panel keeps working.
pub fn open_store(config: &AppConfig) -> Arc<dyn StateStore> {
    match DatabaseManager::new(config.database_path()) {
        Ok(db) => {
            log::info!("Panel state stored in {:?}", db.db_path());
            Arc::new(db)
        }
        Err(e) => {
            log::error!(
                "Failed to open state database, state will not survive restarts: {:#}",
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}
