//! Search the quote database from the command line.
//!
//! Usage:
//!     cargo run --release --bin find-quotes -- [QUERIES...] [--db quotes.sqlite]
//!
//! With no queries, runs the built-in demo queries.

use anyhow::{Context, Result};
use clap::Parser;
use quotefind::config::CONFIG_ENV;
use quotefind::demo_data::DEMO_QUERIES;
use quotefind::{Normalizer, QuoteFinder, SearchResult, SearchStatus, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fuzzy quote search
#[derive(Parser, Debug)]
#[command(name = "find-quotes", version, about, long_about = None)]
struct Cli {
    /// Queries to run (demo queries when omitted)
    queries: Vec<String>,

    /// JSON settings file (default: $QUOTEFIND_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database, overrides the settings file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Maximum word diff rate (exclusive)
    #[arg(long)]
    word_threshold: Option<f64>,

    /// Minimum phrase score (inclusive)
    #[arg(long)]
    phrase_threshold: Option<f64>,

    /// Diff rate denominator: min or max word length
    #[arg(long)]
    normalizer: Option<Normalizer>,

    /// Results per query
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Strip punctuation and one-letter words from queries first
    #[arg(long)]
    raw: bool,

    /// Print each result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::from_env()
                .with_context(|| format!("loading settings named by ${}", CONFIG_ENV))?,
        };

        if let Some(db) = &self.db {
            settings.db_file = db.clone();
        }
        let matching = &mut settings.matching;
        if let Some(t) = self.word_threshold {
            matching.word_threshold = t;
        }
        if let Some(t) = self.phrase_threshold {
            matching.phrase_threshold = t;
        }
        if let Some(n) = self.normalizer {
            matching.normalizer = n;
        }
        if let Some(limit) = self.limit {
            matching.result_limit = limit;
        }
        matching.validate().context("invalid matching options")?;
        Ok(settings)
    }
}

fn print_result(query: &str, result: &SearchResult) {
    let rule = "=".repeat(70);
    println!("{}\n{}\n{}", rule, query, rule);
    println!(
        "{:.3}s, {} matches\n",
        result.elapsed_secs(),
        result.total_matches
    );

    match result.status {
        SearchStatus::Error => {
            println!("error: {}\n", result.error.as_deref().unwrap_or("unknown"));
            return;
        }
        SearchStatus::NoQuery => {
            println!("(empty query)\n");
            return;
        }
        _ => {}
    }

    for m in &result.matches {
        let prefix = m
            .record
            .speaker
            .as_deref()
            .map(|s| format!("{}: ", s))
            .unwrap_or_default();
        println!(
            "{}\n{}\n{}{}\n{}  {:.4}\n",
            m.record.title,
            "-".repeat(m.record.title.chars().count()),
            prefix,
            m.record.phrase,
            m.record.quote_id,
            m.score
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    let default_level = if cli.verbose || settings.development_mode {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // An unreachable store still answers every query, with status "error"
    let finder = QuoteFinder::open(&settings).unwrap_or_else(|e| {
        QuoteFinder::unavailable(
            format!("{}: {}", settings.db_file.display(), e),
            settings.matching,
        )
    });

    // Demo queries are raw user text with punctuation
    let (queries, raw): (Vec<String>, bool) = if cli.queries.is_empty() {
        (DEMO_QUERIES.iter().map(|q| q.to_string()).collect(), true)
    } else {
        (cli.queries.clone(), cli.raw)
    };

    for query in &queries {
        let result = if raw {
            finder.search_raw(query)
        } else {
            finder.search(query)
        };

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(query, &result);
        }
    }

    tracing::debug!(cache = ?finder.cache_stats(), "done");
    Ok(())
}
