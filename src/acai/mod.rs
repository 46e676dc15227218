//! ACAI search client
//!
//! Turns user filters into the remote GraphQL query, runs it, and normalizes
//! both records and failures:
//! - types.rs: AcaiRecord, SearchParameters, RecordType, BookInfo
//! - reference.rs: verse range → USFM reference formatting
//! - query.rs: GraphQL document, filter object, response decoding
//! - client.rs: SearchBackend trait and the HTTP AcaiClient
//! - error.rs: SearchError taxonomy
//! - books.rs: reference book catalog

pub mod books;
pub mod client;
pub mod error;
pub mod query;
pub mod reference;
pub mod types;

pub use books::{book_catalog, find_book};
pub use client::{AcaiClient, AcaiConfig, SearchBackend};
pub use error::SearchError;
pub use reference::format_reference;
pub use types::{AcaiRecord, Article, Asset, BookInfo, RecordType, SearchParameters, SearchType};
