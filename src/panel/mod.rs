//! Panel side of the sidebar: local state mirror, user actions, display groups

pub mod grouping;
pub mod reducer;

pub use grouping::{group_records, RecordGroup, UNTYPED_GROUP};
pub use reducer::{Panel, PanelAction, PanelState, PanelView};
