//! quotefind - fuzzy phrase search over a fixed corpus of quotes
//!
//! Queries are matched word by word using bounded edit distance, phrases are
//! scored by greedy word consumption, and the whole corpus is ranked per query.
//! Quotes and their display records live in SQLite.

pub mod config;
pub mod corpus;
pub mod database;
pub mod demo_data;
pub mod distance;
pub mod interface;
pub mod matching;
pub mod models;
pub mod query;
pub mod ranking;
mod store;

pub use config::{MatchConfig, Normalizer, Settings};
pub use interface::*;
pub use store::QuoteFinder;
