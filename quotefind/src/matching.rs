//! Word-level fuzzy equivalence and phrase-level scoring.
//!
//! Phrase scoring is a greedy bipartite consumption, not an optimal assignment:
//! query words are visited in order, each takes the first still-unmatched phrase
//! word it is fuzzy-equivalent to, and both leave play. The result is
//!
//! ```text
//! score = 1 / (1 + unmatched_query + unmatched_phrase * penalty)
//! ```
//!
//! so a missing query word costs a full point while an extra phrase word costs
//! only `penalty`. A short query covering part of a long quote still scores well.

use crate::config::{MatchConfig, Normalizer};
use crate::distance::EditDistanceComputer;
use crate::models::TokenSequence;

/// Decides whether two words are close enough to count as the same word
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordMatcher {
    threshold: f64,
    normalizer: Normalizer,
}

impl WordMatcher {
    pub fn new(threshold: f64, normalizer: Normalizer) -> Self {
        Self { threshold, normalizer }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(config.word_threshold, config.normalizer)
    }

    /// Edit distance divided by the configured length denominator
    pub fn diff_rate(&self, distances: &EditDistanceComputer, w1: &str, w2: &str) -> f64 {
        let distance = distances.distance(w1, w2);
        let denominator = self
            .normalizer
            .denominator(w1.chars().count(), w2.chars().count());
        if denominator == 0 {
            // Only reachable with an empty word; nothing matches the empty word but itself
            return if distance == 0 { 0.0 } else { f64::INFINITY };
        }
        distance as f64 / denominator as f64
    }

    pub fn is_match(&self, distances: &EditDistanceComputer, w1: &str, w2: &str) -> bool {
        self.diff_rate(distances, w1, w2) < self.threshold
    }
}

/// Breakdown of a phrase score
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseScore {
    pub score: f64,
    /// (query word, phrase word) pairs in the order they were consumed
    pub pairs: Vec<(String, String)>,
    pub unmatched_query: usize,
    pub unmatched_phrase: usize,
}

/// Scores a query against one corpus phrase
#[derive(Debug, Clone, Copy)]
pub struct PhraseScorer<'a> {
    matcher: WordMatcher,
    distances: &'a EditDistanceComputer,
    penalty: f64,
}

impl<'a> PhraseScorer<'a> {
    pub fn new(matcher: WordMatcher, distances: &'a EditDistanceComputer, penalty: f64) -> Self {
        Self { matcher, distances, penalty }
    }

    pub fn from_config(config: &MatchConfig, distances: &'a EditDistanceComputer) -> Self {
        Self::new(
            WordMatcher::from_config(config),
            distances,
            config.unmatched_phrase_penalty,
        )
    }

    pub fn score(&self, query: &TokenSequence, phrase: &TokenSequence) -> f64 {
        self.score_detailed(query, phrase).score
    }

    pub fn score_detailed(&self, query: &TokenSequence, phrase: &TokenSequence) -> PhraseScore {
        // Duplicates collapse: a word consumed once is gone for all its occurrences
        let query_words = query.distinct();
        let phrase_words = phrase.distinct();
        let mut phrase_taken = vec![false; phrase_words.len()];
        let mut pairs = Vec::new();

        for qw in &query_words {
            let hit = phrase_words
                .iter()
                .enumerate()
                .find(|(j, pw)| !phrase_taken[*j] && self.matcher.is_match(self.distances, qw, pw));

            if let Some((j, pw)) = hit {
                phrase_taken[j] = true;
                pairs.push((qw.to_string(), pw.to_string()));
            }
        }

        let unmatched_query = query_words.len() - pairs.len();
        let unmatched_phrase = phrase_words.len() - pairs.len();
        let score = 1.0 / (1.0 + unmatched_query as f64 + unmatched_phrase as f64 * self.penalty);

        PhraseScore {
            score,
            pairs,
            unmatched_query,
            unmatched_phrase,
        }
    }
}
