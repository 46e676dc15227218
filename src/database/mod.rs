// Database module for ACAI Resources
// Provides SQLite persistence for the panel snapshot

pub mod manager;
pub mod migrations;
pub mod settings_repo;

pub use manager::DatabaseManager;
