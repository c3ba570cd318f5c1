//! Matching configuration and process settings.
//!
//! Two historical tunings of the matcher exist and disagree on the diff-rate
//! normalizer, the word threshold and the phrase penalty. Both are available
//! as presets; `MatchConfig::default()` is the strict one.

use crate::interface::QuoteFindError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON settings file
pub const CONFIG_ENV: &str = "QUOTEFIND_CONFIG";

/// Default number of ranked quotes returned per query
pub const DEFAULT_RESULT_LIMIT: usize = 4;

/// Default bound on memoized word-pair distances
pub const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Denominator used to turn an edit distance into a diff rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalizer {
    /// Shorter word length. Stricter for words of unequal length.
    Min,
    /// Longer word length.
    #[default]
    Max,
}

impl Normalizer {
    pub fn denominator(self, len_a: usize, len_b: usize) -> usize {
        match self {
            Normalizer::Min => len_a.min(len_b),
            Normalizer::Max => len_a.max(len_b),
        }
    }
}

impl std::str::FromStr for Normalizer {
    type Err = QuoteFindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Normalizer::Min),
            "max" => Ok(Normalizer::Max),
            other => Err(QuoteFindError::InvalidConfig(format!(
                "unknown normalizer '{}', expected 'min' or 'max'",
                other
            ))),
        }
    }
}

/// Every tunable of the matching core
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Two words match when `distance / normalizer < word_threshold`
    pub word_threshold: f64,
    /// Quotes scoring below this are dropped
    pub phrase_threshold: f64,
    /// Weight of each phrase word the query left unmatched
    pub unmatched_phrase_penalty: f64,
    pub normalizer: Normalizer,
    pub result_limit: usize,
    pub cache_capacity: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl MatchConfig {
    /// Max-normalized diff rate under 0.35, phrase penalty 0.001
    pub fn strict() -> Self {
        Self {
            word_threshold: 0.35,
            phrase_threshold: 0.65,
            unmatched_phrase_penalty: 0.001,
            normalizer: Normalizer::Max,
            result_limit: DEFAULT_RESULT_LIMIT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Min-normalized diff rate under 0.5, phrase penalty 0.01
    pub fn lenient() -> Self {
        Self {
            word_threshold: 0.5,
            phrase_threshold: 0.65,
            unmatched_phrase_penalty: 0.01,
            normalizer: Normalizer::Min,
            result_limit: DEFAULT_RESULT_LIMIT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn validate(&self) -> Result<(), QuoteFindError> {
        let invalid = |msg: String| -> Result<(), QuoteFindError> {
            Err(QuoteFindError::InvalidConfig(msg))
        };

        if !(self.word_threshold > 0.0 && self.word_threshold < 1.0) {
            return invalid(format!("word_threshold must be in (0, 1), got {}", self.word_threshold));
        }
        if !(self.phrase_threshold > 0.0 && self.phrase_threshold <= 1.0) {
            return invalid(format!("phrase_threshold must be in (0, 1], got {}", self.phrase_threshold));
        }
        if !self.unmatched_phrase_penalty.is_finite() || self.unmatched_phrase_penalty < 0.0 {
            return invalid(format!(
                "unmatched_phrase_penalty must be finite and non-negative, got {}",
                self.unmatched_phrase_penalty
            ));
        }
        if self.result_limit == 0 {
            return invalid("result_limit must be at least 1".to_string());
        }
        if self.cache_capacity == 0 {
            return invalid("cache_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Process-level settings: where the quotes live and how to match them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_file: PathBuf,
    pub matching: MatchConfig,
    /// Verbose logging of queries and engine setup
    pub development_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_file: PathBuf::from("quotes.sqlite"),
            matching: MatchConfig::default(),
            development_mode: false,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file and validate the matching section
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QuoteFindError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| QuoteFindError::Io(format!("{}: {}", path.display(), e)))?;
        let settings: Settings = serde_json::from_str(&text)
            .map_err(|e| QuoteFindError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        settings.matching.validate()?;
        Ok(settings)
    }

    /// Load from `$QUOTEFIND_CONFIG` when set, defaults otherwise
    pub fn from_env() -> Result<Self, QuoteFindError> {
        Self::load_or_default(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// Load from `path` when given, defaults otherwise. An empty path counts as unset.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self, QuoteFindError> {
        match path.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
