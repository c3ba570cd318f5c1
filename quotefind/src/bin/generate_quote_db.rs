//! Generate a quote database from the built-in demo corpus.
//!
//! This creates a SQLite database using the native Rust database code,
//! ensuring schema compatibility with `find-quotes`.
//!
//! Usage:
//!     cargo run --release --bin generate-quote-db -- [output_path] [--synthetic N] [--seed S]
//!
//! Default output: quotes.sqlite

use anyhow::{Context, Result};
use clap::Parser;
use quotefind::database::{NewQuote, QuoteDatabase};
use quotefind::demo_data::{seed_demo, synthetic_phrases};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Synthetic quotes are inserted in batches of this size
const BATCH_SIZE: usize = 1_000;

#[derive(Parser, Debug)]
#[command(name = "generate-quote-db", version, about = "Write the demo quote corpus to SQLite")]
struct Cli {
    /// Output database path (replaced if it exists)
    #[arg(default_value = "quotes.sqlite")]
    output: PathBuf,

    /// Extra random quotes built from the demo vocabulary
    #[arg(long, default_value_t = 0)]
    synthetic: usize,

    /// Seed for synthetic quotes
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let output = &cli.output;
    if output.exists() {
        std::fs::remove_file(output)
            .with_context(|| format!("removing existing database {}", output.display()))?;
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    println!("Generating quote database...");
    println!("Output: {}", output.display());

    let db = QuoteDatabase::open(output).context("creating database")?;
    let demo = seed_demo(&db).context("writing demo corpus")?;
    println!("  Wrote {} demo quotes", demo);

    if cli.synthetic > 0 {
        let play_id = db
            .insert_play("Синтетика", "https://example.org/plays/synthetic")
            .context("writing synthetic play")?;
        let phrases = synthetic_phrases(cli.synthetic, cli.seed);

        for (i, chunk) in phrases.chunks(BATCH_SIZE).enumerate() {
            let quotes: Vec<NewQuote<'_>> = chunk
                .iter()
                .map(|phrase| NewQuote {
                    play_id,
                    speaker: None,
                    phrase,
                })
                .collect();
            db.insert_quotes(&quotes).context("writing synthetic quotes")?;
            println!(
                "  Generated {}/{} synthetic quotes...",
                (i * BATCH_SIZE + chunk.len()),
                cli.synthetic
            );
        }
    }

    println!("\nDone!");
    println!("  Plays:  {}", db.count_plays()?);
    println!("  Quotes: {}", db.count_quotes()?);
    Ok(())
}
