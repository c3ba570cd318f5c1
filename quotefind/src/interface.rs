//! quotefind public interface
//!
//! Result records, the error enum, and the traits at the seams between the
//! matching core and its storage collaborator.

use serde::{Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a single search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Not computed yet
    #[default]
    Pending,
    /// At least one quote scored at or above the phrase threshold
    Matches,
    /// Ranking ran and nothing cleared the phrase threshold
    NoMatches,
    /// The query normalized to zero words; ranking was skipped
    NoQuery,
    /// The store could not be reached, or returned inconsistent data
    Error,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// Denormalized quote as shown to the user. Owned by the store; the core only
/// requests it by identifier after ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub quote_id: i64,
    /// Title of the play the quote comes from
    pub title: String,
    pub url: String,
    /// Character speaking the line, if the source names one
    pub speaker: Option<String>,
    /// Literal quote text
    pub phrase: String,
}

/// One ranked quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub record: DisplayRecord,
    pub score: f64,
}

/// Search result container
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchResult {
    /// Query as the caller received it, before any cleanup
    pub original_query: String,
    /// Query that was actually tokenized and ranked
    pub query: String,
    pub status: SearchStatus,
    /// At most `result_limit` entries, score descending
    pub matches: Vec<ResultEntry>,
    /// Number of quotes at or above the phrase threshold (may exceed `matches.len()`)
    pub total_matches: u64,
    /// Wall-clock time spent ranking and resolving records
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Option<Duration>,
    pub error: Option<String>,
}

impl SearchResult {
    pub fn has_matches(&self) -> bool {
        self.status == SearchStatus::Matches
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }

    /// Identifiers of the returned quotes, in rank order
    pub fn quote_ids(&self) -> Vec<i64> {
        self.matches.iter().map(|m| m.record.quote_id).collect()
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match elapsed {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

/// Error type for quotefind operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteFindError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("No display record for ranked quote {quote_id}")]
    InternalInconsistency { quote_id: i64 },
    #[error("Duplicate quote identifier {quote_id} in corpus")]
    DuplicateQuote { quote_id: i64 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Search task failed: {0}")]
    TaskFailed(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Corpus side of the storage collaborator. Called once per engine instance.
pub trait CorpusSource: Send + Sync {
    /// Every `(quote_id, whitespace-delimited tokens)` pair in the store.
    /// A reachable but empty store returns `Ok(vec![])`.
    fn fetch_all_tokenized_entries(&self) -> Result<Vec<(i64, String)>, QuoteFindError>;
}

/// Record side of the storage collaborator. Called after ranking.
pub trait RecordSource: Send + Sync {
    /// `Ok(None)` means the store is reachable but has no such quote.
    fn fetch_display_record(&self, quote_id: i64) -> Result<Option<DisplayRecord>, QuoteFindError>;

    /// Fetch several records, one slot per input id, in input order
    fn fetch_display_records(
        &self,
        quote_ids: &[i64],
    ) -> Result<Vec<Option<DisplayRecord>>, QuoteFindError> {
        quote_ids
            .iter()
            .map(|&id| self.fetch_display_record(id))
            .collect()
    }
}

/// The service interface of a long-lived, loaded search engine.
pub trait QuoteFinderApi: Send + Sync {
    /// Rank the corpus against an already-cleaned query
    fn search(&self, query: &str) -> SearchResult;

    /// Clean a raw user query (punctuation, one-letter words) and search it
    fn search_raw(&self, raw_query: &str) -> SearchResult;

    /// Number of scoreable quotes loaded
    fn corpus_len(&self) -> usize;
}

impl From<crate::database::DatabaseError> for QuoteFindError {
    fn from(e: crate::database::DatabaseError) -> Self {
        QuoteFindError::StoreUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for QuoteFindError {
    fn from(e: std::io::Error) -> Self {
        QuoteFindError::Io(e.to_string())
    }
}
