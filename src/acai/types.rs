//! ACAI record and search parameter types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::error::SearchError;

/// Which filter drives a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    #[default]
    ByReference,
    ByLabel,
}

/// Record type tag understood by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Person,
    Place,
    Deity,
    Group,
    Flora,
    Fauna,
    Realia,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::Person,
        RecordType::Place,
        RecordType::Deity,
        RecordType::Group,
        RecordType::Flora,
        RecordType::Fauna,
        RecordType::Realia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Person => "PERSON",
            RecordType::Place => "PLACE",
            RecordType::Deity => "DEITY",
            RecordType::Group => "GROUP",
            RecordType::Flora => "FLORA",
            RecordType::Fauna => "FAUNA",
            RecordType::Realia => "REALIA",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for one search. A new value is built for every dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    pub search_type: SearchType,
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default)]
    pub verse_range: Option<String>,
    #[serde(default)]
    pub label_filter: Option<String>,
    /// Empty means no type constraint
    #[serde(default)]
    pub record_type_filter: BTreeSet<RecordType>,
}

impl SearchParameters {
    pub fn by_reference(book_id: impl Into<String>, verse_range: impl Into<String>) -> Self {
        Self {
            search_type: SearchType::ByReference,
            book_id: Some(book_id.into()),
            verse_range: Some(verse_range.into()),
            ..Default::default()
        }
    }

    pub fn by_label(label: impl Into<String>) -> Self {
        Self {
            search_type: SearchType::ByLabel,
            label_filter: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn with_record_types(mut self, types: impl IntoIterator<Item = RecordType>) -> Self {
        self.record_type_filter = types.into_iter().collect();
        self
    }

    /// Check the mode invariant: a book in reference mode, a non-empty label in label mode.
    pub fn validate(&self) -> Result<(), SearchError> {
        match self.search_type {
            SearchType::ByReference => {
                let book = self.book_id.as_deref().map(str::trim).unwrap_or("");
                if book.is_empty() {
                    return Err(SearchError::InvalidInput(
                        "Select a book before searching".to_string(),
                    ));
                }
                if super::books::find_book(book).is_none() {
                    return Err(SearchError::InvalidInput(format!("Unknown book: {}", book)));
                }
            }
            SearchType::ByLabel => {
                let label = self.label_filter.as_deref().map(str::trim).unwrap_or("");
                if label.is_empty() {
                    return Err(SearchError::InvalidInput(
                        "Enter a label to search for".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A localized article attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub localized: String,
}

/// A media or document asset attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub title: String,
    #[serde(default)]
    pub file: String,
}

/// A person, place, deity or other entity tied to scripture passages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcaiRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated tags, e.g. "PERSON, PLACE"
    #[serde(default)]
    pub record_type: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub articles: Option<Vec<Article>>,
    #[serde(default)]
    pub assets: Option<Vec<Asset>>,
}

impl AcaiRecord {
    /// Split `record_type` into normalized tags, skipping blanks and duplicates.
    pub fn type_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.record_type.split(',') {
            let tag = tag.trim().to_ascii_uppercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

/// Reference book entry sent to the Panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub id: String,
    pub name: String,
}
