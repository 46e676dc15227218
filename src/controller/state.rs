//! Persisted application state and partial updates

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::acai::{AcaiRecord, RecordType, SearchParameters, SearchType};

/// Snapshot format version written with every save
pub const STATE_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    0
}

/// Durable snapshot owned by the Controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    /// Snapshots written before versioning have no tag and decode as 0
    #[serde(default = "legacy_version")]
    pub version: u32,
    pub search_type: SearchType,
    pub selected_book: Option<String>,
    pub verse_range: String,
    pub label_input: String,
    pub record_type_filter: BTreeSet<RecordType>,
    /// Parameters of the last successful search
    pub last_search: Option<SearchParameters>,
    pub last_results: Vec<AcaiRecord>,
    /// Display order is insertion order; membership is by id
    pub pinned_records: Vec<AcaiRecord>,
    pub expanded_records: BTreeSet<String>,
    pub expanded_groups: BTreeSet<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            search_type: SearchType::default(),
            selected_book: None,
            verse_range: String::new(),
            label_input: String::new(),
            record_type_filter: BTreeSet::new(),
            last_search: None,
            last_results: Vec::new(),
            pinned_records: Vec::new(),
            expanded_records: BTreeSet::new(),
            expanded_groups: BTreeSet::new(),
        }
    }
}

impl PersistedState {
    /// Decode a stored snapshot, upgrading older versions.
    /// Returns `None` when the snapshot comes from a newer build.
    pub fn from_snapshot(json: &str) -> serde_json::Result<Option<Self>> {
        let state: PersistedState = serde_json::from_str(json)?;
        Ok(state.upgrade())
    }

    fn upgrade(mut self) -> Option<Self> {
        if self.version > STATE_VERSION {
            return None;
        }
        if self.version == 0 {
            log::info!("Upgrading unversioned panel state snapshot");
        }
        self.version = STATE_VERSION;
        self.pinned_records = dedup_by_id(std::mem::take(&mut self.pinned_records));
        Some(self)
    }

    /// Shallow merge: every field present in the patch replaces the current value.
    pub fn apply(&mut self, patch: PersistedStatePatch) {
        if let Some(search_type) = patch.search_type {
            self.search_type = search_type;
        }
        if let Some(book) = patch.selected_book {
            self.selected_book = book;
        }
        if let Some(range) = patch.verse_range {
            self.verse_range = range;
        }
        if let Some(label) = patch.label_input {
            self.label_input = label;
        }
        if let Some(filter) = patch.record_type_filter {
            self.record_type_filter = filter;
        }
        if let Some(last_search) = patch.last_search {
            self.last_search = last_search;
        }
        if let Some(results) = patch.last_results {
            self.last_results = results;
        }
        if let Some(pinned) = patch.pinned_records {
            self.set_pinned(pinned);
        }
        if let Some(expanded) = patch.expanded_records {
            self.expanded_records = expanded;
        }
        if let Some(expanded) = patch.expanded_groups {
            self.expanded_groups = expanded;
        }
    }

    pub fn is_pinned(&self, record_id: &str) -> bool {
        self.pinned_records.iter().any(|r| r.id == record_id)
    }

    /// Add the record if absent, remove it if present. Returns whether it is pinned afterwards.
    pub fn toggle_pinned(&mut self, record: AcaiRecord) -> bool {
        if let Some(pos) = self.pinned_records.iter().position(|r| r.id == record.id) {
            self.pinned_records.remove(pos);
            false
        } else {
            self.pinned_records.push(record);
            true
        }
    }

    /// Replace the pinned set, keeping the first occurrence of each id
    pub fn set_pinned(&mut self, records: Vec<AcaiRecord>) {
        self.pinned_records = dedup_by_id(records);
    }
}

fn dedup_by_id(records: Vec<AcaiRecord>) -> Vec<AcaiRecord> {
    let mut seen = BTreeSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update sent with `updateState`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersistedStatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_book: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type_filter: Option<BTreeSet<RecordType>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_search: Option<Option<SearchParameters>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_results: Option<Vec<AcaiRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_records: Option<Vec<AcaiRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_records: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_groups: Option<BTreeSet<String>>,
}

impl PersistedStatePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
