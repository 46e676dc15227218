//! Controller ↔ Panel message protocol
//!
//! Both directions are tagged by `command`. Anything that does not decode into
//! one of these variants is rejected at the boundary.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::acai::{AcaiRecord, BookInfo, SearchParameters};
use crate::controller::state::{PersistedState, PersistedStatePatch};

/// Opaque token matching a search dispatch to its outcome
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Webviews sometimes send numeric ids; any JSON number maps to its decimal text
impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Unsigned(u64),
            Signed(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => CorrelationId(s),
            Raw::Unsigned(n) => CorrelationId(n.to_string()),
            Raw::Signed(n) => CorrelationId(n.to_string()),
            Raw::Float(n) => CorrelationId(n.to_string()),
        })
    }
}

/// Panel → Controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelMessage {
    /// Book list plus a state restore
    RequestInitialData,
    Search {
        params: SearchParameters,
        correlation_id: CorrelationId,
    },
    CancelSearch {
        correlation_id: CorrelationId,
    },
    UpdateState {
        state: PersistedStatePatch,
    },
    /// Resync after a remount without re-querying
    RequestStateRestore,
    /// Replace the pinned set
    UpdatePinnedRecords {
        records: Vec<AcaiRecord>,
    },
    TogglePinned {
        record: AcaiRecord,
    },
}

impl PanelMessage {
    pub fn command(&self) -> &'static str {
        match self {
            PanelMessage::RequestInitialData => "requestInitialData",
            PanelMessage::Search { .. } => "search",
            PanelMessage::CancelSearch { .. } => "cancelSearch",
            PanelMessage::UpdateState { .. } => "updateState",
            PanelMessage::RequestStateRestore => "requestStateRestore",
            PanelMessage::UpdatePinnedRecords { .. } => "updatePinnedRecords",
            PanelMessage::TogglePinned { .. } => "togglePinned",
        }
    }
}

/// Controller → Panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControllerMessage {
    SetBookData {
        book_data: Vec<BookInfo>,
    },
    RestoreState {
        state: PersistedState,
    },
    SearchResult {
        records: Vec<AcaiRecord>,
        correlation_id: CorrelationId,
    },
    /// Never carries a cancellation
    SearchError {
        message: String,
        correlation_id: CorrelationId,
    },
    SearchCancelled {
        correlation_id: CorrelationId,
    },
}

impl ControllerMessage {
    /// The search this message settles, if it is a terminal search message
    pub fn settles(&self) -> Option<&CorrelationId> {
        match self {
            ControllerMessage::SearchResult { correlation_id, .. }
            | ControllerMessage::SearchError { correlation_id, .. }
            | ControllerMessage::SearchCancelled { correlation_id } => Some(correlation_id),
            ControllerMessage::SetBookData { .. } | ControllerMessage::RestoreState { .. } => None,
        }
    }
}

/// Decode a raw webview payload
pub fn decode_panel_message(raw: &str) -> serde_json::Result<PanelMessage> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acai::SearchType;
    use serde_json::json;

    #[test]
    fn test_decode_search() {
        let raw = json!({
            "command": "search",
            "params": { "searchType": "byReference", "bookId": "GEN", "verseRange": "1:1-5" },
            "correlationId": "abc"
        })
        .to_string();
        match decode_panel_message(&raw).unwrap() {
            PanelMessage::Search {
                params,
                correlation_id,
            } => {
                assert_eq!(params.search_type, SearchType::ByReference);
                assert_eq!(params.book_id.as_deref(), Some("GEN"));
                assert_eq!(correlation_id.as_str(), "abc");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_numeric_correlation_id() {
        let raw = json!({ "command": "cancelSearch", "correlationId": 1 }).to_string();
        assert_eq!(
            decode_panel_message(&raw).unwrap(),
            PanelMessage::CancelSearch {
                correlation_id: CorrelationId::from("1")
            }
        );

        for (value, expected) in [(json!(-1), "-1"), (json!(1.0), "1"), (json!(2.5), "2.5")] {
            let raw = json!({ "command": "cancelSearch", "correlationId": value }).to_string();
            match decode_panel_message(&raw) {
                Ok(PanelMessage::CancelSearch { correlation_id }) => {
                    assert_eq!(correlation_id.as_str(), expected)
                }
                other => panic!("expected cancelSearch for {}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_unit_commands() {
        let msg = decode_panel_message(r#"{"command":"requestInitialData"}"#).unwrap();
        assert_eq!(msg, PanelMessage::RequestInitialData);
        assert_eq!(msg.command(), "requestInitialData");
        assert_eq!(
            serde_json::to_value(PanelMessage::RequestStateRestore).unwrap(),
            json!({ "command": "requestStateRestore" })
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(decode_panel_message(r#"{"command":"alert","text":"hi"}"#).is_err());
        assert!(decode_panel_message(r#"{"command":"cancelSearch"}"#).is_err());
    }

    #[test]
    fn test_update_state_payload() {
        let raw = json!({ "command": "updateState", "state": { "labelInput": "Judah" } }).to_string();
        match decode_panel_message(&raw).unwrap() {
            PanelMessage::UpdateState { state } => {
                assert_eq!(state.label_input.as_deref(), Some("Judah"))
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_controller_message_shape() {
        let msg = ControllerMessage::SearchError {
            message: "No records found".to_string(),
            correlation_id: CorrelationId::from("7"),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "command": "searchError", "message": "No records found", "correlationId": "7" })
        );
        assert_eq!(msg.settles().map(CorrelationId::as_str), Some("7"));

        let books = ControllerMessage::SetBookData { book_data: vec![] };
        assert_eq!(
            serde_json::to_value(&books).unwrap(),
            json!({ "command": "setBookData", "bookData": [] })
        );
        assert!(books.settles().is_none());
        let decoded: ControllerMessage = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }
}
