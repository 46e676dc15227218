// ACAI Resources - scripture reference sidebar
//
// - acai: GraphQL search client for ACAI records
// - controller: persisted state, search dispatch, cancellation
// - panel: local state mirror and display grouping
// - protocol: messages exchanged between Panel and Controller

pub mod acai;
pub mod config;
pub mod controller;
pub mod database;
pub mod panel;
pub mod protocol;
pub mod state;

#[cfg(feature = "desktop")]
pub mod desktop;

#[cfg(feature = "desktop")]
pub fn run() {
    // Initialize env_logger to output to stderr (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    tauri::Builder::default()
        .setup(|app| {
            log::info!("ACAI Resources setup starting...");

            if let Err(e) = desktop::setup(app.handle()) {
                log::error!("Failed to initialize sidebar: {:#}", e);
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Sidebar initialization failed: {}", e),
                )));
            }

            log::info!("ACAI Resources setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            desktop::panel_dispatch,
            desktop::panel_view,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
