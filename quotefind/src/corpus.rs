//! Immutable in-memory corpus of tokenized quotes.
//!
//! Entries are kept in ascending identifier order regardless of the order the
//! store returned them in, so equal scores always rank the same way.

use crate::interface::{CorpusSource, QuoteFindError};
use crate::models::CorpusEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    skipped_empty: usize,
}

impl Corpus {
    /// Build from `(quote_id, token string)` rows.
    ///
    /// Rows that tokenize to nothing are left out (they can never match).
    /// A repeated identifier is an error.
    pub fn from_rows<I>(rows: I) -> Result<Self, QuoteFindError>
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let mut entries: Vec<CorpusEntry> = Vec::new();
        let mut skipped_empty = 0;

        for (id, tokens) in rows {
            let entry = CorpusEntry::new(id, &tokens);
            if entry.tokens.is_empty() {
                skipped_empty += 1;
                continue;
            }
            entries.push(entry);
        }

        entries.sort_by_key(|e| e.id);
        if let Some(dup) = entries.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(QuoteFindError::DuplicateQuote { quote_id: dup[0].id });
        }

        Ok(Self { entries, skipped_empty })
    }

    /// Fetch every row from the store and build the corpus
    pub fn load(source: &dyn CorpusSource) -> Result<Self, QuoteFindError> {
        let rows = source.fetch_all_tokenized_entries()?;
        let fetched = rows.len();
        let corpus = Self::from_rows(rows)?;

        tracing::info!(
            fetched,
            loaded = corpus.len(),
            skipped_empty = corpus.skipped_empty,
            "loaded quote corpus"
        );
        if corpus.is_empty() {
            tracing::warn!("quote store is reachable but holds no scoreable quotes");
        }
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows dropped at load time because they had no tokens
    pub fn skipped_empty(&self) -> usize {
        self.skipped_empty
    }

    /// All entries, ascending by identifier
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&CorpusEntry> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of distinct words across the corpus
    pub fn vocabulary_size(&self) -> usize {
        let mut words: Vec<&str> = self.entries.iter().flat_map(|e| e.tokens.iter()).collect();
        words.sort_unstable();
        words.dedup();
        words.len()
    }
}
