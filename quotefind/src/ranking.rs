//! Corpus-wide scoring, filtering and ordering for one query.
//!
//! Every corpus entry is scored independently (in parallel with rayon), entries
//! below the phrase threshold are dropped, and the survivors are sorted by
//! descending score. The sort is stable over a corpus that is already in
//! ascending identifier order, so ties always resolve to the lower identifier.

use rayon::prelude::*;

use crate::config::MatchConfig;
use crate::corpus::Corpus;
use crate::distance::EditDistanceComputer;
use crate::matching::PhraseScorer;
use crate::models::{ScoredCandidate, TokenSequence};

/// Outcome of ranking one query against the corpus
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
    retained: Vec<ScoredCandidate>,
    limit: usize,
}

impl Ranking {
    /// The best `limit` candidates, best first
    pub fn top(&self) -> &[ScoredCandidate] {
        &self.retained[..self.retained.len().min(self.limit)]
    }

    /// Every candidate that cleared the phrase threshold, best first
    pub fn retained(&self) -> &[ScoredCandidate] {
        &self.retained
    }

    /// Number of candidates that cleared the phrase threshold
    pub fn total(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }
}

pub struct Ranker<'a> {
    scorer: PhraseScorer<'a>,
    phrase_threshold: f64,
    limit: usize,
}

impl<'a> Ranker<'a> {
    pub fn new(scorer: PhraseScorer<'a>, phrase_threshold: f64, limit: usize) -> Self {
        Self {
            scorer,
            phrase_threshold,
            limit,
        }
    }

    pub fn from_config(config: &MatchConfig, distances: &'a EditDistanceComputer) -> Self {
        Self::new(
            PhraseScorer::from_config(config, distances),
            config.phrase_threshold,
            config.result_limit,
        )
    }

    pub fn rank(&self, query: &TokenSequence, corpus: &Corpus) -> Ranking {
        if query.is_empty() {
            return Ranking {
                retained: Vec::new(),
                limit: self.limit,
            };
        }

        // par_iter + collect keeps corpus order, which the stable sort relies on
        let mut retained: Vec<ScoredCandidate> = corpus
            .entries()
            .par_iter()
            .filter_map(|entry| {
                let score = self.scorer.score(query, &entry.tokens);
                (score >= self.phrase_threshold).then_some(ScoredCandidate {
                    id: entry.id,
                    score,
                })
            })
            .collect();

        retained.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            query = %query.joined(),
            corpus = corpus.len(),
            retained = retained.len(),
            "ranked corpus"
        );

        Ranking {
            retained,
            limit: self.limit,
        }
    }
}
