//! Search failure taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for ACAI searches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchError {
    /// Malformed verse range or missing filter for the active mode
    InvalidInput(String),
    /// The service answered with zero records
    NoResults,
    /// Network or service failure
    Transport(String),
    /// Aborted through the cancellation token
    Cancelled,
}

impl SearchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::Cancelled)
    }

    /// Text shown in the Panel
    pub fn user_message(&self) -> String {
        match self {
            SearchError::InvalidInput(msg) => msg.clone(),
            SearchError::NoResults => "No records found".to_string(),
            SearchError::Transport(_) => {
                "An error occurred while searching. Please try again.".to_string()
            }
            SearchError::Cancelled => "Search cancelled".to_string(),
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            SearchError::NoResults => write!(f, "No records found"),
            SearchError::Transport(msg) => write!(f, "Request failed: {}", msg),
            SearchError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Transport(err.to_string())
    }
}
