//! Verse range normalization into the service's USFM reference syntax
//!
//! Accepted input forms (book prefix is added here, never typed by the user):
//! - ""          → "GEN"
//! - "3"         → "GEN 3"
//! - "1:1"       → "GEN 1:1"
//! - "1:1-5"     → "GEN 1:1-GEN 1:5"   (end inherits the start chapter)
//! - "1:1-2:3"   → "GEN 1:1-GEN 2:3"
//! - "1-3"       → "GEN 1-GEN 3"

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use super::books::find_book;
use super::error::SearchError;

static ENDPOINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?::(\d+))?$").expect("endpoint pattern is valid"));

/// One side of a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Endpoint {
    chapter: u32,
    verse: Option<u32>,
}

impl Endpoint {
    fn parse(raw: &str, range: &str) -> Result<Self, SearchError> {
        let raw = raw.trim();
        let caps = ENDPOINT_RE
            .captures(raw)
            .ok_or_else(|| malformed(range))?;

        let chapter = parse_number(&caps[1], range)?;
        let verse = match caps.get(2) {
            Some(v) => Some(parse_number(v.as_str(), range)?),
            None => None,
        };

        Ok(Self { chapter, verse })
    }

    fn has_chapter_marker(&self) -> bool {
        self.verse.is_some()
    }

    fn sort_key(&self) -> (u32, u32) {
        (self.chapter, self.verse.unwrap_or(0))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verse {
            Some(verse) => write!(f, "{}:{}", self.chapter, verse),
            None => write!(f, "{}", self.chapter),
        }
    }
}

fn parse_number(raw: &str, range: &str) -> Result<u32, SearchError> {
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => Err(malformed(range)),
        Ok(n) => Ok(n),
    }
}

fn malformed(range: &str) -> SearchError {
    SearchError::InvalidInput(format!("Invalid verse range: \"{}\"", range.trim()))
}

/// Build the `usfmRef` value for a book and an optional raw verse range.
pub fn format_reference(book_id: &str, verse_range: Option<&str>) -> Result<String, SearchError> {
    let book = find_book(book_id)
        .ok_or_else(|| SearchError::InvalidInput(format!("Unknown book: {}", book_id.trim())))?;

    let range = verse_range.map(str::trim).unwrap_or("");
    if range.is_empty() {
        return Ok(book.to_string());
    }

    let parts: Vec<&str> = range.split('-').collect();
    match parts.as_slice() {
        [single] => {
            let point = Endpoint::parse(single, range)?;
            Ok(format!("{} {}", book, point))
        }
        [start, end] => {
            let start = Endpoint::parse(start, range)?;
            let mut end = Endpoint::parse(end, range)?;

            match (start.has_chapter_marker(), end.has_chapter_marker()) {
                // "C:V-V": the bare number on the right is a verse in the start chapter
                (true, false) => {
                    end = Endpoint {
                        chapter: start.chapter,
                        verse: Some(end.chapter),
                    };
                }
                (false, true) => return Err(malformed(range)),
                _ => {}
            }

            if end.sort_key() < start.sort_key() {
                return Err(malformed(range));
            }

            Ok(format!("{} {}-{} {}", book, start, book, end))
        }
        _ => Err(malformed(range)),
    }
}
