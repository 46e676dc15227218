// Tauri host shell for the sidebar
//
// The webview only renders `PanelView` snapshots. User input comes back
// through `panel_dispatch`; Controller updates are pushed as `panel-state` events.

use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, State};

use crate::config::AppConfig;
use crate::panel::{PanelAction, PanelView};
use crate::state::{AppState, ControllerChannels};

/// Event carrying a fresh `PanelView` after each Controller message
pub const PANEL_STATE_EVENT: &str = "panel-state";

#[tauri::command]
pub async fn panel_dispatch(
    state: State<'_, Arc<AppState>>,
    action: PanelAction,
) -> Result<PanelView, String> {
    log::debug!("Panel action: {:?}", action);
    Ok(state.dispatch(action).await)
}

#[tauri::command]
pub async fn panel_view(state: State<'_, Arc<AppState>>) -> Result<PanelView, String> {
    Ok(state.view().await)
}

/// Build the app state and start both event loops.
pub fn setup(app: &AppHandle) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    log::info!("Data directory: {:?}", config.data_dir);

    let (state, channels) = AppState::from_config(&config)?;
    let state = Arc::new(state);
    let ControllerChannels {
        panel_rx,
        controller_rx,
    } = channels;

    app.manage(state.clone());

    tauri::async_runtime::spawn(state.controller().clone().run(panel_rx));

    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        state
            .forward_to_panel(controller_rx, |view| {
                if let Err(e) = handle.emit(PANEL_STATE_EVENT, view) {
                    log::warn!("Failed to emit {}: {}", PANEL_STATE_EVENT, e);
                }
            })
            .await;
    });

    Ok(())
}
