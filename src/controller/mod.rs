//! Controller side of the sidebar
//!
//! This module provides:
//! - A single owner for persisted panel state, written through on every change
//! - Cancellable background searches keyed by correlation ID
//! - At most one terminal message per search, late outcomes dropped
//!
//! Module structure:
//! - state.rs: PersistedState, PersistedStatePatch
//! - registry.rs: SearchRegistry, SearchPhase lifecycle
//! - storage.rs: StateStore seam, MemoryStore
//! - service.rs: Controller dispatch and event loop

pub mod registry;
pub mod service;
pub mod state;
pub mod storage;

pub use registry::{SearchPhase, SearchRegistry};
pub use service::Controller;
pub use state::{PersistedState, PersistedStatePatch, STATE_VERSION};
pub use storage::{MemoryStore, StateStore, STATE_KEY};
