//! GraphQL query shape for the ACAI records endpoint

use serde::{Deserialize, Serialize};

use super::error::SearchError;
use super::reference::format_reference;
use super::types::{AcaiRecord, RecordType, SearchParameters, SearchType};

pub const ACAI_RECORDS_QUERY: &str = r#"query AcaiRecords($filters: AcaiRecordFilter) {
  acaiRecords(filters: $filters) {
    id
    label
    description
    recordType
    uri
    articles {
      title
      localized
    }
    assets {
      title
      file
    }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptureReferenceFilter {
    pub usfm_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelFilter {
    pub i_contains: String,
}

/// Filter object sent as the `filters` variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AcaiRecordFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripture_reference: Option<ScriptureReferenceFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub record_types: Vec<RecordType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelFilter>,
}

impl AcaiRecordFilter {
    /// Translate user-facing parameters. Fails with `InvalidInput` before any network call.
    pub fn from_parameters(params: &SearchParameters) -> Result<Self, SearchError> {
        params.validate()?;

        let mut filter = AcaiRecordFilter {
            record_types: params.record_type_filter.iter().copied().collect(),
            ..Default::default()
        };

        match params.search_type {
            SearchType::ByReference => {
                let book = params.book_id.as_deref().unwrap_or_default();
                let usfm_ref = format_reference(book, params.verse_range.as_deref())?;
                filter.scripture_reference = Some(ScriptureReferenceFilter { usfm_ref });
            }
            SearchType::ByLabel => {
                let label = params.label_filter.as_deref().unwrap_or_default().trim();
                filter.label = Some(LabelFilter {
                    i_contains: label.to_string(),
                });
            }
        }

        Ok(filter)
    }
}

#[derive(Debug, Serialize)]
pub struct Variables<'a> {
    pub filters: &'a AcaiRecordFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub operation_name: &'static str,
    pub query: &'static str,
    pub variables: Variables<'a>,
}

impl<'a> GraphQlRequest<'a> {
    pub fn acai_records(filters: &'a AcaiRecordFilter) -> Self {
        Self {
            operation_name: "AcaiRecords",
            query: ACAI_RECORDS_QUERY,
            variables: Variables { filters },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcaiRecordsData {
    #[serde(default)]
    pub acai_records: Option<Vec<AcaiRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<AcaiRecordsData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

impl GraphQlResponse {
    /// Normalize a decoded response: service errors become `Transport`, zero rows `NoResults`.
    pub fn into_records(self) -> Result<Vec<AcaiRecord>, SearchError> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SearchError::Transport(message));
        }

        let records = self
            .data
            .and_then(|d| d.acai_records)
            .unwrap_or_default();

        if records.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_book_filter_has_no_range() {
        let params = SearchParameters::by_reference("JHN", "");
        let filter = AcaiRecordFilter::from_parameters(&params).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({ "scriptureReference": { "usfmRef": "JHN" } })
        );
    }

    #[test]
    fn test_label_filter_with_types() {
        let params = SearchParameters::by_label(" Judah ")
            .with_record_types([RecordType::Place, RecordType::Person]);
        let filter = AcaiRecordFilter::from_parameters(&params).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "recordTypes": ["PERSON", "PLACE"],
                "label": { "iContains": "Judah" }
            })
        );
    }

    #[test]
    fn test_invalid_range_never_builds_filter() {
        let params = SearchParameters::by_reference("GEN", "1:x");
        assert!(matches!(
            AcaiRecordFilter::from_parameters(&params),
            Err(SearchError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_request_envelope() {
        let filter = AcaiRecordFilter::from_parameters(&SearchParameters::by_reference("GEN", "1:1-5"))
            .unwrap();
        let body = serde_json::to_value(GraphQlRequest::acai_records(&filter)).unwrap();
        assert_eq!(body["operationName"], "AcaiRecords");
        assert_eq!(
            body["variables"]["filters"]["scriptureReference"]["usfmRef"],
            "GEN 1:1-GEN 1:5"
        );
        assert!(body["query"].as_str().unwrap().contains("acaiRecords"));
    }

    #[test]
    fn test_response_normalization() {
        let empty: GraphQlResponse =
            serde_json::from_value(json!({ "data": { "acaiRecords": [] } })).unwrap();
        assert_eq!(empty.into_records(), Err(SearchError::NoResults));

        let errored: GraphQlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "bad filter" }]
        }))
        .unwrap();
        assert_eq!(
            errored.into_records(),
            Err(SearchError::Transport("bad filter".to_string()))
        );

        let ok: GraphQlResponse = serde_json::from_value(json!({
            "data": { "acaiRecords": [{
                "id": "person:judah",
                "label": "Judah",
                "description": "Son of Jacob",
                "recordType": "PERSON",
                "uri": "https://example.org/judah",
                "articles": [{ "title": "Judah", "localized": "..." }],
                "assets": null
            }] }
        }))
        .unwrap();
        let records = ok.into_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, "PERSON");
        assert_eq!(records[0].articles.as_ref().map(Vec::len), Some(1));
        assert!(records[0].assets.is_none());
    }
}
