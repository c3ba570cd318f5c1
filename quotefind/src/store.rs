//! QuoteFinder - long-lived search engine over one loaded corpus
//!
//! Architecture: the corpus is loaded once at construction and never changes.
//! Each query is ranked against every entry (rayon), then the top identifiers
//! are resolved to display records through the record source.
//!
//! Concurrency Model:
//! - Corpus is read-only after load, shared without locking
//! - The distance cache is shared by every query on this instance (parking_lot Mutex)
//! - `search_async` runs the CPU-bound work on tokio's blocking pool
//! - Uses a global fallback runtime when called outside any tokio runtime

use crate::config::{MatchConfig, Settings};
use crate::corpus::Corpus;
use crate::database::QuoteDatabase;
use crate::distance::{CacheStats, EditDistanceComputer};
use crate::interface::{
    CorpusSource, QuoteFindError, QuoteFinderApi, RecordSource, ResultEntry, SearchResult, SearchStatus,
};
use crate::models::{ScoredCandidate, TokenSequence};
use crate::query::prepare_query;
use crate::ranking::Ranker;
use once_cell::sync::Lazy;
use std::sync::{Arc, Once};
use std::time::Instant;

/// Global fallback Tokio runtime for async searches issued outside any runtime context.
/// Shared across all QuoteFinder instances and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

static RAYON_INIT: Once = Once::new();

/// Initialize the global Rayon thread pool, leaving one core for Tokio
fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let rayon_threads = num_threads.saturating_sub(1).max(1);

        // Fails only if another component already built the global pool; that pool is used instead
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon_threads)
            .thread_name(|i| format!("quotefind-rayon-{}", i))
            .build_global();
    });
}

enum Backend {
    Ready {
        corpus: Corpus,
        records: Arc<dyn RecordSource>,
    },
    /// The store could not be opened; every search reports this detail
    Unavailable(String),
}

/// Thread-safe quote search engine
///
/// Construct once and share via `Arc`. To pick up new quotes, build a new instance.
pub struct QuoteFinder {
    backend: Backend,
    distances: EditDistanceComputer,
    config: MatchConfig,
}

impl QuoteFinder {
    /// Open the configured database read-only and load its corpus
    pub fn open(settings: &Settings) -> Result<Self, QuoteFindError> {
        settings.matching.validate()?;
        let db = Arc::new(QuoteDatabase::open_read_only(&settings.db_file)?);
        let records: Arc<dyn RecordSource> = db.clone();
        let finder = Self::with_sources(db.as_ref(), records, settings.matching)?;

        tracing::info!(
            db = %settings.db_file.display(),
            quotes = finder.corpus_len(),
            "quote finder ready"
        );
        if settings.development_mode {
            tracing::debug!(config = ?settings.matching, "matching configuration");
        }
        Ok(finder)
    }

    /// Load the corpus from `corpus_source`; resolve results through `records`
    pub fn with_sources(
        corpus_source: &dyn CorpusSource,
        records: Arc<dyn RecordSource>,
        config: MatchConfig,
    ) -> Result<Self, QuoteFindError> {
        config.validate()?;
        let corpus = Corpus::load(corpus_source)?;
        Self::from_parts(corpus, records, config)
    }

    pub fn from_parts(
        corpus: Corpus,
        records: Arc<dyn RecordSource>,
        config: MatchConfig,
    ) -> Result<Self, QuoteFindError> {
        config.validate()?;
        init_rayon();
        Ok(Self {
            backend: Backend::Ready { corpus, records },
            distances: EditDistanceComputer::new(config.cache_capacity),
            config,
        })
    }

    /// A finder whose store could not be reached. Every search yields status `Error`.
    pub fn unavailable(detail: impl Into<String>, config: MatchConfig) -> Self {
        let detail = detail.into();
        tracing::warn!(detail = %detail, "quote store unavailable, searches will report errors");
        Self {
            backend: Backend::Unavailable(detail),
            distances: EditDistanceComputer::new(config.cache_capacity.max(1)),
            config,
        }
    }

    /// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
    fn runtime_handle(&self) -> tokio::runtime::Handle {
        tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backend, Backend::Ready { .. })
    }

    pub fn corpus_len(&self) -> usize {
        match &self.backend {
            Backend::Ready { corpus, .. } => corpus.len(),
            Backend::Unavailable(_) => 0,
        }
    }

    /// Drop all memoized distances. Results are unaffected.
    pub fn clear_cache(&self) {
        self.distances.cache().clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.distances.cache().stats()
    }

    /// Rank the corpus against `query` as given (lower-cased and whitespace-split only)
    pub fn search(&self, query: &str) -> SearchResult {
        self.execute(query.to_string(), query.to_string())
    }

    /// Strip punctuation and one-letter words from `raw_query`, then search
    pub fn search_raw(&self, raw_query: &str) -> SearchResult {
        let cleaned = prepare_query(raw_query).unwrap_or_default();
        self.execute(raw_query.to_string(), cleaned)
    }

    /// `search` on tokio's blocking pool
    pub async fn search_async(self: &Arc<Self>, query: String) -> Result<SearchResult, QuoteFindError> {
        let finder = Arc::clone(self);
        let handle = self
            .runtime_handle()
            .spawn_blocking(move || finder.search(&query));

        handle
            .await
            .map_err(|e| QuoteFindError::TaskFailed(e.to_string()))
    }

    fn execute(&self, original_query: String, query: String) -> SearchResult {
        let mut result = SearchResult {
            original_query,
            query,
            ..Default::default()
        };

        let tokens = TokenSequence::from_text(&result.query);
        if tokens.is_empty() {
            result.status = SearchStatus::NoQuery;
            return result;
        }

        let (corpus, records) = match &self.backend {
            Backend::Ready { corpus, records } => (corpus, records),
            Backend::Unavailable(detail) => {
                result.status = SearchStatus::Error;
                result.error = Some(QuoteFindError::StoreUnavailable(detail.clone()).to_string());
                return result;
            }
        };

        let started = Instant::now();
        let ranking = Ranker::from_config(&self.config, &self.distances).rank(&tokens, corpus);
        let ranked_in = started.elapsed();
        result.total_matches = ranking.total() as u64;

        if ranking.is_empty() {
            result.status = SearchStatus::NoMatches;
            result.elapsed = Some(started.elapsed());
            return result;
        }

        match Self::resolve(records.as_ref(), ranking.top()) {
            Ok(matches) => {
                result.matches = matches;
                result.status = SearchStatus::Matches;
            }
            Err(e) => {
                if let QuoteFindError::InternalInconsistency { quote_id } = e {
                    tracing::error!(quote_id, "ranked quote has no display record");
                } else {
                    tracing::warn!(error = %e, "record lookup failed");
                }
                result.status = SearchStatus::Error;
                result.error = Some(e.to_string());
            }
        }
        result.elapsed = Some(started.elapsed());

        tracing::debug!(
            query = %result.query,
            corpus = corpus.len(),
            retained = result.total_matches,
            ranked_ms = ranked_in.as_secs_f64() * 1000.0,
            total_ms = result.elapsed_secs() * 1000.0,
            "search complete"
        );
        result
    }

    /// Fetch display records for ranked candidates, keeping rank order
    fn resolve(
        records: &dyn RecordSource,
        ranked: &[ScoredCandidate],
    ) -> Result<Vec<ResultEntry>, QuoteFindError> {
        let ids: Vec<i64> = ranked.iter().map(|c| c.id).collect();
        let mut fetched = records.fetch_display_records(&ids)?.into_iter();

        // A source returning fewer slots than IDs leaves the tail unresolved
        ranked
            .iter()
            .map(|candidate| {
                let record = fetched.next().flatten().ok_or(QuoteFindError::InternalInconsistency {
                    quote_id: candidate.id,
                })?;
                Ok(ResultEntry {
                    record,
                    score: candidate.score,
                })
            })
            .collect()
    }
}

impl QuoteFinderApi for QuoteFinder {
    fn search(&self, query: &str) -> SearchResult {
        QuoteFinder::search(self, query)
    }

    fn search_raw(&self, raw_query: &str) -> SearchResult {
        QuoteFinder::search_raw(self, raw_query)
    }

    fn corpus_len(&self) -> usize {
        QuoteFinder::corpus_len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Normalizer;
    use crate::interface::DisplayRecord;
    use std::collections::HashMap;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    /// In-memory store: tokens derived by lower-casing the phrase
    struct MemoryStore {
        rows: Vec<(i64, String)>,
        records: HashMap<i64, DisplayRecord>,
    }

    impl MemoryStore {
        fn new(quotes: &[(i64, &str)]) -> Self {
            let rows = quotes.iter().map(|(id, p)| (*id, p.to_lowercase())).collect();
            let records = quotes
                .iter()
                .map(|(id, p)| {
                    (
                        *id,
                        DisplayRecord {
                            quote_id: *id,
                            title: format!("П'єса {}", id),
                            url: format!("https://example.org/plays/{}", id),
                            speaker: (id % 2 == 0).then(|| "Баба".to_string()),
                            phrase: p.to_string(),
                        },
                    )
                })
                .collect();
            Self { rows, records }
        }

        fn without_record(mut self, id: i64) -> Self {
            self.records.remove(&id);
            self
        }
    }

    impl CorpusSource for MemoryStore {
        fn fetch_all_tokenized_entries(&self) -> Result<Vec<(i64, String)>, QuoteFindError> {
            Ok(self.rows.clone())
        }
    }

    impl RecordSource for MemoryStore {
        fn fetch_display_record(&self, quote_id: i64) -> Result<Option<DisplayRecord>, QuoteFindError> {
            Ok(self.records.get(&quote_id).cloned())
        }
    }

    struct Unreachable;

    impl CorpusSource for Unreachable {
        fn fetch_all_tokenized_entries(&self) -> Result<Vec<(i64, String)>, QuoteFindError> {
            Err(QuoteFindError::StoreUnavailable("connection refused".into()))
        }
    }

    impl RecordSource for Unreachable {
        fn fetch_display_record(&self, _quote_id: i64) -> Result<Option<DisplayRecord>, QuoteFindError> {
            Err(QuoteFindError::StoreUnavailable("connection refused".into()))
        }
    }

    fn finder(quotes: &[(i64, &str)], config: MatchConfig) -> QuoteFinder {
        let store = Arc::new(MemoryStore::new(quotes));
        QuoteFinder::with_sources(store.as_ref(), store.clone(), config).unwrap()
    }

    const QUOTES: &[(i64, &str)] = &[
        (1, "Так би усє кишки у тєбя і шваркнули"),
        (2, "Шо мовчите скуштували"),
        (3, "Молодой культурний чєловєк бьйот кота"),
        (4, "Дєтство Геббельса"),
        (5, "Чого вам не хвата"),
    ];

    // ── Lifecycle ────────────────────────────────────────────────

    #[test]
    fn test_with_sources_loads_corpus() {
        let finder = finder(QUOTES, MatchConfig::default());
        assert_eq!(finder.corpus_len(), 5);
        assert!(finder.is_available());
        assert_eq!(finder.config(), &MatchConfig::strict());
    }

    #[test]
    fn test_with_sources_propagates_unreachable_store() {
        let result = QuoteFinder::with_sources(&Unreachable, Arc::new(Unreachable), MatchConfig::default());
        assert!(matches!(result, Err(QuoteFindError::StoreUnavailable(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(MemoryStore::new(QUOTES));
        let config = MatchConfig { result_limit: 0, ..MatchConfig::default() };
        assert!(matches!(
            QuoteFinder::with_sources(store.as_ref(), store.clone(), config),
            Err(QuoteFindError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_store_is_reachable_but_matches_nothing() {
        let finder = finder(&[], MatchConfig::default());
        assert_eq!(finder.corpus_len(), 0);
        let result = finder.search("кишки");
        assert_eq!(result.status, SearchStatus::NoMatches);
        assert!(result.error.is_none());
    }

    // ── Search ───────────────────────────────────────────────────

    #[test]
    fn test_literal_homoglyph_scenario() {
        let config = MatchConfig {
            word_threshold: 0.5,
            normalizer: Normalizer::Max,
            ..MatchConfig::default()
        };
        let finder = finder(&[(1, "кишки шваркнули")], config);

        // Latin "p" in the second word
        let result = finder.search("кишки шваpкнули");
        assert_eq!(result.status, SearchStatus::Matches);
        assert_eq!(result.quote_ids(), vec![1]);
        assert_eq!(result.matches[0].score, 1.0);
        assert_eq!(result.total_matches, 1);
        assert!(result.elapsed.is_some());
    }

    #[test]
    fn test_empty_query_skips_ranking() {
        let finder = finder(QUOTES, MatchConfig::default());
        for query in ["", "   ", "\t\n"] {
            let result = finder.search(query);
            assert_eq!(result.status, SearchStatus::NoQuery);
            assert!(result.matches.is_empty());
            assert!(result.elapsed.is_none());
        }
        assert_eq!(finder.cache_stats().misses, 0);
    }

    #[test]
    fn test_no_matches() {
        let finder = finder(QUOTES, MatchConfig::default());
        let result = finder.search("абсолютно інший текст");
        assert_eq!(result.status, SearchStatus::NoMatches);
        assert_eq!(result.total_matches, 0);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let finder = finder(QUOTES, MatchConfig::default());
        let result = finder.search("ДЄТСТВО геббельса");
        assert_eq!(result.quote_ids().first(), Some(&4));
    }

    #[test]
    fn test_results_capped_at_limit() {
        let quotes: Vec<(i64, String)> = (1..=10).map(|i| (i, "шо за ностальгія".to_string())).collect();
        let quotes: Vec<(i64, &str)> = quotes.iter().map(|(i, p)| (*i, p.as_str())).collect();
        let finder = finder(&quotes, MatchConfig::default());

        let result = finder.search("шо за ностальгія");
        assert_eq!(result.total_matches, 10);
        assert_eq!(result.quote_ids(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_results_sorted_by_score() {
        let finder = finder(
            &[
                (1, "культурний чєловєк бьйот кота вночі"),
                (2, "культурний чєловєк"),
                (3, "культурний чєловєк бьйот"),
            ],
            MatchConfig::default(),
        );
        let result = finder.search("культурний чєловєк");
        assert_eq!(result.quote_ids(), vec![2, 3, 1]);
        let scores: Vec<f64> = result.matches.iter().map(|m| m.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_phrase_threshold_boundary() {
        // Half the query words shared: score = 1 / (1 + 2 + 2 * 0.001)
        let quotes = &[(1, "чого вам не хвата")];
        let query = "чого вам тюрми село";

        let above = MatchConfig { phrase_threshold: 0.334, ..MatchConfig::default() };
        let result = finder(quotes, above).search(query);
        assert_eq!(result.status, SearchStatus::NoMatches);

        let below = MatchConfig { phrase_threshold: 0.333, ..MatchConfig::default() };
        let result = finder(quotes, below).search(query);
        assert_eq!(result.status, SearchStatus::Matches);
        assert!((result.matches[0].score - 1.0 / 3.002).abs() < 1e-12);
    }

    #[test]
    fn test_search_raw_cleans_query() {
        let finder = finder(QUOTES, MatchConfig::default());
        let result = finder.search_raw("Шо мовчите, скуштували?");
        assert_eq!(result.original_query, "Шо мовчите, скуштували?");
        assert_eq!(result.query, "Шо мовчите скуштували");
        assert_eq!(result.quote_ids().first(), Some(&2));
        assert_eq!(result.matches[0].score, 1.0);
    }

    #[test]
    fn test_search_raw_punctuation_only_is_no_query() {
        let finder = finder(QUOTES, MatchConfig::default());
        assert_eq!(finder.search_raw("?!").status, SearchStatus::NoQuery);
        assert_eq!(finder.search_raw("").status, SearchStatus::NoQuery);
    }

    #[test]
    fn test_repeated_search_is_idempotent() {
        let finder = finder(QUOTES, MatchConfig::lenient());
        let first = finder.search("чого вам хвата");
        let second = finder.search("чого вам хвата");
        assert_eq!(first.matches, second.matches);
        assert_eq!(first.total_matches, second.total_matches);
        assert!(finder.cache_stats().hits > 0);

        finder.clear_cache();
        assert_eq!(finder.cache_stats().entries, 0);
        assert_eq!(finder.search("чого вам хвата").matches, first.matches);
    }

    // ── Errors ───────────────────────────────────────────────────

    #[test]
    fn test_missing_record_is_internal_inconsistency() {
        let store = Arc::new(MemoryStore::new(QUOTES).without_record(4));
        let finder = QuoteFinder::with_sources(store.as_ref(), store.clone(), MatchConfig::default()).unwrap();

        let result = finder.search("дєтство геббельса");
        assert_eq!(result.status, SearchStatus::Error);
        assert!(result.matches.is_empty());
        assert_eq!(result.total_matches, 1);
        assert_eq!(
            result.error.as_deref(),
            Some(QuoteFindError::InternalInconsistency { quote_id: 4 }.to_string().as_str())
        );
    }

    /// Record source that resolves only the first ID of each batch
    struct TruncatingRecords(MemoryStore);

    impl RecordSource for TruncatingRecords {
        fn fetch_display_record(&self, quote_id: i64) -> Result<Option<DisplayRecord>, QuoteFindError> {
            self.0.fetch_display_record(quote_id)
        }

        fn fetch_display_records(&self, quote_ids: &[i64]) -> Result<Vec<Option<DisplayRecord>>, QuoteFindError> {
            quote_ids
                .iter()
                .take(1)
                .map(|id| self.0.fetch_display_record(*id))
                .collect()
        }
    }

    #[test]
    fn test_short_record_batch_is_internal_inconsistency() {
        let quotes = &[(1, "кишки шваркнули"), (2, "кишки шваркнули")];
        let store = MemoryStore::new(quotes);
        let records = Arc::new(TruncatingRecords(MemoryStore::new(quotes)));
        let finder = QuoteFinder::with_sources(&store, records, MatchConfig::default()).unwrap();

        let result = finder.search("кишки шваркнули");
        assert_eq!(result.status, SearchStatus::Error);
        assert_eq!(result.total_matches, 2);
        assert!(result.matches.is_empty());
        assert_eq!(
            result.error.as_deref(),
            Some(QuoteFindError::InternalInconsistency { quote_id: 2 }.to_string().as_str())
        );
    }

    #[test]
    fn test_record_fetch_failure_reports_error() {
        let store = MemoryStore::new(QUOTES);
        let finder = QuoteFinder::with_sources(&store, Arc::new(Unreachable), MatchConfig::default()).unwrap();

        let result = finder.search("дєтство геббельса");
        assert_eq!(result.status, SearchStatus::Error);
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_unavailable_finder_reports_error() {
        let finder = QuoteFinder::unavailable("unable to open database file", MatchConfig::default());
        assert!(!finder.is_available());
        assert_eq!(finder.corpus_len(), 0);

        let result = finder.search("кишки");
        assert_eq!(result.status, SearchStatus::Error);
        assert!(result.error.unwrap().contains("unable to open database file"));

        // Empty input never reaches the store
        assert_eq!(finder.search("").status, SearchStatus::NoQuery);
    }

    // ── Concurrency ──────────────────────────────────────────────

    #[test]
    fn test_concurrent_searches_share_cache() {
        let finder = Arc::new(finder(QUOTES, MatchConfig::default()));
        let expected = finder.search("молодой культурний чєловєк").matches;

        std::thread::scope(|s| {
            for _ in 0..4 {
                let finder = Arc::clone(&finder);
                let expected = expected.clone();
                s.spawn(move || {
                    for _ in 0..10 {
                        assert_eq!(finder.search("молодой культурний чєловєк").matches, expected);
                    }
                });
            }
        });
    }

    #[tokio::test]
    async fn test_search_async() {
        let finder = Arc::new(finder(QUOTES, MatchConfig::default()));
        let result = finder.search_async("кишки шваркнули".to_string()).await.unwrap();
        assert_eq!(result.status, SearchStatus::Matches);
        assert_eq!(result.quote_ids().first(), Some(&1));
    }

    #[test]
    fn test_search_async_on_explicit_runtime() {
        let rt = runtime();
        let finder = Arc::new(finder(QUOTES, MatchConfig::default()));
        let result = rt.block_on(finder.search_async("".to_string())).unwrap();
        assert_eq!(result.status, SearchStatus::NoQuery);
    }

    #[test]
    fn test_trait_object_delegates() {
        let finder = finder(QUOTES, MatchConfig::default());
        let api: &dyn QuoteFinderApi = &finder;
        assert_eq!(api.corpus_len(), 5);
        assert_eq!(api.search("дєтство геббельса").quote_ids(), vec![4]);
    }
}
