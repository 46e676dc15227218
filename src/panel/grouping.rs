//! Display grouping of records by type tag

use serde::Serialize;

use crate::acai::{AcaiRecord, RecordType};

/// Group for records without any type tag
pub const UNTYPED_GROUP: &str = "OTHER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordGroup {
    /// Upper-case tag, e.g. "PERSON"
    pub key: String,
    pub title: String,
    pub records: Vec<AcaiRecord>,
    pub expanded: bool,
}

/// Fan records out into one group per tag. A record tagged "PERSON, PLACE"
/// appears in both groups. Groups keep first-appearance order.
pub fn group_records(records: &[AcaiRecord]) -> Vec<RecordGroup> {
    let mut groups: Vec<RecordGroup> = Vec::new();

    for record in records {
        let mut tags = record.type_tags();
        if tags.is_empty() {
            tags.push(UNTYPED_GROUP.to_string());
        }

        for tag in tags {
            match groups.iter_mut().find(|g| g.key == tag) {
                Some(group) => group.records.push(record.clone()),
                None => groups.push(RecordGroup {
                    title: group_title(&tag),
                    key: tag,
                    records: vec![record.clone()],
                    expanded: false,
                }),
            }
        }
    }

    groups
}

fn group_title(key: &str) -> String {
    let key = RecordType::from_tag(key)
        .map(|t| t.as_str())
        .unwrap_or(key);
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
