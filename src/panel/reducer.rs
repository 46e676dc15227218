//! Panel-side reducer
//!
//! Mirrors the Controller's state, turns user actions into protocol messages and
//! applies inbound messages. Only the most recently dispatched correlation id is
//! tracked; anything else that arrives is stale and ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::grouping::{group_records, RecordGroup};
use crate::acai::query::AcaiRecordFilter;
use crate::acai::{AcaiRecord, BookInfo, RecordType, SearchParameters, SearchType};
use crate::controller::state::PersistedStatePatch;
use crate::protocol::{ControllerMessage, CorrelationId, PanelMessage};

/// What the user did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelAction {
    /// Panel created (or re-created): ask for books and saved state
    Mount,
    /// Panel visible again: ask for saved state only
    Resync,
    SelectBook { book_id: Option<String> },
    SetVerseRange { value: String },
    SetLabel { value: String },
    SetSearchType { search_type: SearchType },
    ToggleRecordType { record_type: RecordType },
    Search,
    CancelSearch,
    /// Re-run the last successful search
    Refresh,
    TogglePin { record_id: String },
    ToggleRecordExpanded { record_id: String },
    ToggleGroupExpanded { group: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub books: Vec<BookInfo>,
    pub search_type: SearchType,
    pub selected_book: Option<String>,
    pub verse_range: String,
    pub label_input: String,
    pub record_type_filter: BTreeSet<RecordType>,
    pub last_search: Option<SearchParameters>,
    pub results: Vec<AcaiRecord>,
    pub pinned: Vec<AcaiRecord>,
    pub expanded_records: BTreeSet<String>,
    pub expanded_groups: BTreeSet<String>,
    pub loading: bool,
    pub current_search: Option<CorrelationId>,
    pub error: Option<String>,
    /// Set once a restoreState has been applied
    pub restored: bool,
}

/// Render-ready snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    #[serde(flatten)]
    pub state: PanelState,
    pub groups: Vec<RecordGroup>,
}

#[derive(Debug, Default)]
pub struct Panel {
    state: PanelState,
    /// Parameters of the search identified by `state.current_search`
    pending: Option<SearchParameters>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    /// Parameters built from the current inputs
    pub fn search_parameters(&self) -> SearchParameters {
        let s = &self.state;
        let mut params = SearchParameters {
            search_type: s.search_type,
            record_type_filter: s.record_type_filter.clone(),
            ..Default::default()
        };
        match s.search_type {
            SearchType::ByReference => {
                params.book_id = s.selected_book.clone();
                params.verse_range = Some(s.verse_range.clone());
            }
            SearchType::ByLabel => {
                params.label_filter = Some(s.label_input.clone());
            }
        }
        params
    }

    pub fn groups(&self) -> Vec<RecordGroup> {
        let mut groups = group_records(&self.state.results);
        for group in &mut groups {
            group.expanded = self.state.expanded_groups.contains(&group.key);
        }
        groups
    }

    pub fn view(&self) -> PanelView {
        PanelView {
            state: self.state.clone(),
            groups: self.groups(),
        }
    }

    /// Apply a user action, returning the messages to send to the Controller.
    pub fn dispatch(&mut self, action: PanelAction) -> Vec<PanelMessage> {
        match action {
            PanelAction::Mount => vec![PanelMessage::RequestInitialData],
            PanelAction::Resync => vec![PanelMessage::RequestStateRestore],
            PanelAction::SelectBook { book_id } => {
                self.state.selected_book = book_id.clone();
                self.state.error = None;
                update(PersistedStatePatch {
                    selected_book: Some(book_id),
                    ..Default::default()
                })
            }
            PanelAction::SetVerseRange { value } => {
                self.state.verse_range = value.clone();
                self.state.error = None;
                update(PersistedStatePatch {
                    verse_range: Some(value),
                    ..Default::default()
                })
            }
            PanelAction::SetLabel { value } => {
                self.state.label_input = value.clone();
                self.state.error = None;
                update(PersistedStatePatch {
                    label_input: Some(value),
                    ..Default::default()
                })
            }
            PanelAction::SetSearchType { search_type } => {
                self.state.search_type = search_type;
                self.state.error = None;
                update(PersistedStatePatch {
                    search_type: Some(search_type),
                    ..Default::default()
                })
            }
            PanelAction::ToggleRecordType { record_type } => {
                let filter = &mut self.state.record_type_filter;
                if !filter.remove(&record_type) {
                    filter.insert(record_type);
                }
                update(PersistedStatePatch {
                    record_type_filter: Some(filter.clone()),
                    ..Default::default()
                })
            }
            PanelAction::Search => {
                let params = self.search_parameters();
                self.begin_search(params)
            }
            PanelAction::Refresh => match self.state.last_search.clone() {
                Some(params) => self.begin_search(params),
                None => Vec::new(),
            },
            PanelAction::CancelSearch => match self.state.current_search.take() {
                Some(correlation_id) => {
                    self.state.loading = false;
                    self.pending = None;
                    vec![PanelMessage::CancelSearch { correlation_id }]
                }
                None => Vec::new(),
            },
            PanelAction::TogglePin { record_id } => self.toggle_pin(&record_id),
            PanelAction::ToggleRecordExpanded { record_id } => {
                let expanded = &mut self.state.expanded_records;
                if !expanded.remove(&record_id) {
                    expanded.insert(record_id);
                }
                update(PersistedStatePatch {
                    expanded_records: Some(expanded.clone()),
                    ..Default::default()
                })
            }
            PanelAction::ToggleGroupExpanded { group } => {
                let expanded = &mut self.state.expanded_groups;
                if !expanded.remove(&group) {
                    expanded.insert(group);
                }
                update(PersistedStatePatch {
                    expanded_groups: Some(expanded.clone()),
                    ..Default::default()
                })
            }
        }
    }

    fn begin_search(&mut self, params: SearchParameters) -> Vec<PanelMessage> {
        // The search trigger is disabled while a search is loading
        if self.state.loading {
            return Vec::new();
        }

        if let Err(err) = AcaiRecordFilter::from_parameters(&params) {
            self.state.error = Some(err.user_message());
            return Vec::new();
        }

        let correlation_id = CorrelationId::new();
        self.state.loading = true;
        self.state.error = None;
        self.state.current_search = Some(correlation_id.clone());
        self.pending = Some(params.clone());

        vec![PanelMessage::Search {
            params,
            correlation_id,
        }]
    }

    fn toggle_pin(&mut self, record_id: &str) -> Vec<PanelMessage> {
        let state = &mut self.state;
        if let Some(pos) = state.pinned.iter().position(|r| r.id == record_id) {
            state.pinned.remove(pos);
        } else {
            match state.results.iter().find(|r| r.id == record_id) {
                Some(record) => state.pinned.push(record.clone()),
                None => return Vec::new(),
            }
        }

        vec![PanelMessage::UpdatePinnedRecords {
            records: state.pinned.clone(),
        }]
    }

    fn is_current(&self, correlation_id: &CorrelationId) -> bool {
        self.state.current_search.as_ref() == Some(correlation_id)
    }

    fn settle(&mut self) -> Option<SearchParameters> {
        self.state.loading = false;
        self.state.current_search = None;
        self.pending.take()
    }

    /// Apply a message from the Controller.
    pub fn apply(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::SetBookData { book_data } => self.state.books = book_data,
            ControllerMessage::RestoreState { state } => {
                let s = &mut self.state;
                s.search_type = state.search_type;
                s.selected_book = state.selected_book;
                s.verse_range = state.verse_range;
                s.label_input = state.label_input;
                s.record_type_filter = state.record_type_filter;
                s.last_search = state.last_search;
                s.results = state.last_results;
                s.pinned = state.pinned_records;
                s.expanded_records = state.expanded_records;
                s.expanded_groups = state.expanded_groups;
                s.restored = true;
            }
            ControllerMessage::SearchResult {
                records,
                correlation_id,
            } => {
                if !self.is_current(&correlation_id) {
                    log::debug!("Ignoring stale result for {}", correlation_id);
                    return;
                }
                let params = self.settle();
                self.state.results = records;
                self.state.error = None;
                if params.is_some() {
                    self.state.last_search = params;
                }
            }
            ControllerMessage::SearchError {
                message,
                correlation_id,
            } => {
                if !self.is_current(&correlation_id) {
                    log::debug!("Ignoring stale error for {}", correlation_id);
                    return;
                }
                self.settle();
                self.state.error = Some(message);
            }
            ControllerMessage::SearchCancelled { correlation_id } => {
                if self.is_current(&correlation_id) {
                    self.settle();
                }
            }
        }
    }
}

fn update(patch: PersistedStatePatch) -> Vec<PanelMessage> {
    vec![PanelMessage::UpdateState { state: patch }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::PersistedState;

    fn record(id: &str, record_type: &str) -> AcaiRecord {
        AcaiRecord {
            id: id.to_string(),
            label: id.to_string(),
            description: String::new(),
            record_type: record_type.to_string(),
            uri: String::new(),
            articles: None,
            assets: None,
        }
    }

    fn search_id(messages: &[PanelMessage]) -> CorrelationId {
        match messages {
            [PanelMessage::Search { correlation_id, .. }] => correlation_id.clone(),
            other => panic!("expected one search message, got {:?}", other),
        }
    }

    fn panel_with_book(book: &str) -> Panel {
        let mut panel = Panel::new();
        panel.dispatch(PanelAction::SelectBook {
            book_id: Some(book.to_string()),
        });
        panel
    }

    #[test]
    fn test_mount_requests_initial_data() {
        let mut panel = Panel::new();
        assert_eq!(
            panel.dispatch(PanelAction::Mount),
            vec![PanelMessage::RequestInitialData]
        );
        assert_eq!(
            panel.dispatch(PanelAction::Resync),
            vec![PanelMessage::RequestStateRestore]
        );
    }

    #[test]
    fn test_whole_book_search_parameters() {
        let mut panel = panel_with_book("JHN");
        let messages = panel.dispatch(PanelAction::Search);
        match &messages[..] {
            [PanelMessage::Search { params, .. }] => {
                assert_eq!(params.search_type, SearchType::ByReference);
                assert_eq!(params.book_id.as_deref(), Some("JHN"));
                assert_eq!(params.verse_range.as_deref(), Some(""));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(panel.state().loading);
    }

    #[test]
    fn test_invalid_input_stays_local() {
        let mut panel = Panel::new();
        assert!(panel.dispatch(PanelAction::Search).is_empty());
        assert!(panel.state().error.is_some());
        assert!(!panel.state().loading);

        let mut panel = panel_with_book("GEN");
        panel.dispatch(PanelAction::SetVerseRange {
            value: "1:1-2-3".to_string(),
        });
        assert!(panel.dispatch(PanelAction::Search).is_empty());
        assert!(panel.state().error.as_deref().unwrap().contains("1:1-2-3"));
    }

    #[test]
    fn test_search_disabled_while_loading() {
        let mut panel = panel_with_book("GEN");
        let first = search_id(&panel.dispatch(PanelAction::Search));
        assert!(panel.dispatch(PanelAction::Search).is_empty());
        assert_eq!(panel.state().current_search.as_ref(), Some(&first));
    }

    #[test]
    fn test_result_applies_only_for_current_search() {
        let mut panel = panel_with_book("GEN");
        let current = search_id(&panel.dispatch(PanelAction::Search));

        panel.apply(ControllerMessage::SearchResult {
            records: vec![record("stale", "PERSON")],
            correlation_id: CorrelationId::from("someone-else"),
        });
        assert!(panel.state().results.is_empty());
        assert!(panel.state().loading);

        panel.apply(ControllerMessage::SearchResult {
            records: vec![record("a", "PERSON")],
            correlation_id: current,
        });
        assert_eq!(panel.state().results.len(), 1);
        assert!(!panel.state().loading);
        assert!(panel.state().current_search.is_none());
        assert_eq!(
            panel.state().last_search.as_ref().and_then(|p| p.book_id.as_deref()),
            Some("GEN")
        );
    }

    #[test]
    fn test_cancel_makes_later_outcomes_stale() {
        let mut panel = panel_with_book("GEN");
        let id = search_id(&panel.dispatch(PanelAction::Search));

        assert_eq!(
            panel.dispatch(PanelAction::CancelSearch),
            vec![PanelMessage::CancelSearch {
                correlation_id: id.clone()
            }]
        );
        assert!(!panel.state().loading);
        assert!(panel.dispatch(PanelAction::CancelSearch).is_empty());

        panel.apply(ControllerMessage::SearchResult {
            records: vec![record("late", "PERSON")],
            correlation_id: id.clone(),
        });
        panel.apply(ControllerMessage::SearchCancelled { correlation_id: id });
        assert!(panel.state().results.is_empty());
        assert!(panel.state().error.is_none());
    }

    #[test]
    fn test_error_shown_for_current_search() {
        let mut panel = Panel::new();
        panel.dispatch(PanelAction::SetSearchType {
            search_type: SearchType::ByLabel,
        });
        panel.dispatch(PanelAction::SetLabel {
            value: "Nobody".to_string(),
        });
        let id = search_id(&panel.dispatch(PanelAction::Search));
        panel.apply(ControllerMessage::SearchError {
            message: "No records found".to_string(),
            correlation_id: id,
        });
        assert_eq!(panel.state().error.as_deref(), Some("No records found"));
        assert!(!panel.state().loading);
    }

    #[test]
    fn test_field_changes_emit_patches() {
        let mut panel = Panel::new();
        let messages = panel.dispatch(PanelAction::SetLabel {
            value: "Judah".to_string(),
        });
        assert_eq!(
            messages,
            vec![PanelMessage::UpdateState {
                state: PersistedStatePatch {
                    label_input: Some("Judah".to_string()),
                    ..Default::default()
                }
            }]
        );

        let messages = panel.dispatch(PanelAction::ToggleRecordType {
            record_type: RecordType::Place,
        });
        match &messages[..] {
            [PanelMessage::UpdateState { state }] => {
                let filter = state.record_type_filter.as_ref().unwrap();
                assert!(filter.contains(&RecordType::Place));
            }
            other => panic!("unexpected {:?}", other),
        }
        panel.dispatch(PanelAction::ToggleRecordType {
            record_type: RecordType::Place,
        });
        assert!(panel.state().record_type_filter.is_empty());
    }

    #[test]
    fn test_toggle_pin_round_trip() {
        let mut panel = Panel::new();
        panel.apply(ControllerMessage::RestoreState {
            state: PersistedState {
                last_results: vec![record("a", "PERSON")],
                ..Default::default()
            },
        });

        let pinned = panel.dispatch(PanelAction::TogglePin {
            record_id: "a".to_string(),
        });
        assert_eq!(
            pinned,
            vec![PanelMessage::UpdatePinnedRecords {
                records: vec![record("a", "PERSON")]
            }]
        );
        // Pinning keeps the record in results
        assert_eq!(panel.state().results.len(), 1);

        let unpinned = panel.dispatch(PanelAction::TogglePin {
            record_id: "a".to_string(),
        });
        assert_eq!(
            unpinned,
            vec![PanelMessage::UpdatePinnedRecords { records: vec![] }]
        );
        assert!(panel
            .dispatch(PanelAction::TogglePin {
                record_id: "missing".to_string()
            })
            .is_empty());
    }

    #[test]
    fn test_restore_and_refresh() {
        let mut panel = Panel::new();
        panel.apply(ControllerMessage::RestoreState {
            state: PersistedState {
                label_input: "Judah".to_string(),
                search_type: SearchType::ByLabel,
                last_search: Some(SearchParameters::by_label("Judah")),
                expanded_groups: ["PERSON".to_string()].into_iter().collect(),
                last_results: vec![record("judah", "PERSON, PLACE")],
                ..Default::default()
            },
        });
        assert!(panel.state().restored);
        assert_eq!(panel.state().label_input, "Judah");

        let groups = panel.groups();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].expanded);
        assert!(!groups[1].expanded);

        match &panel.dispatch(PanelAction::Refresh)[..] {
            [PanelMessage::Search { params, .. }] => {
                assert_eq!(params.label_filter.as_deref(), Some("Judah"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_action_wire_format() {
        let action: PanelAction = serde_json::from_value(serde_json::json!({
            "type": "selectBook",
            "bookId": "GEN"
        }))
        .unwrap();
        assert_eq!(
            action,
            PanelAction::SelectBook {
                book_id: Some("GEN".to_string())
            }
        );
        let view = serde_json::to_value(Panel::new().view()).unwrap();
        assert!(view.get("groups").is_some());
        assert!(view.get("verseRange").is_some());
    }
}
