//! Core data models: words, token sequences, corpus entries and scored candidates.

use std::collections::HashSet;

/// A normalized (lower-cased) whitespace-delimited token
pub type Word = String;

/// Ordered words of a query or of a corpus phrase.
///
/// Scoring treats the words as a set, but the order is kept because the greedy
/// matcher walks it: when several words qualify, earlier ones are consumed first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenSequence {
    words: Vec<Word>,
}

impl TokenSequence {
    /// Lower-case and whitespace-split free text
    pub fn from_text(text: &str) -> Self {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Distinct words in first-occurrence order
    pub fn distinct(&self) -> Vec<&str> {
        let mut seen = HashSet::with_capacity(self.words.len());
        self.iter().filter(|w| seen.insert(*w)).collect()
    }

    /// Words re-joined with single spaces
    pub fn joined(&self) -> String {
        self.words.join(" ")
    }
}

impl FromIterator<Word> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Word>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().filter(|w| !w.is_empty()).collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

/// A quote identifier with its tokenized phrase. Never empty once inside a `Corpus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub id: i64,
    pub tokens: TokenSequence,
}

impl CorpusEntry {
    pub fn new(id: i64, tokens: &str) -> Self {
        Self {
            id,
            tokens: TokenSequence::from_text(tokens),
        }
    }
}

/// Transient (identifier, score) pair produced per query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub id: i64,
    pub score: f64,
}
