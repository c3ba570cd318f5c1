//! Built-in demo corpus and synthetic quote generation.
//!
//! Used by the `generate-quote-db` binary, the benchmarks and the tests.

use crate::database::{DatabaseResult, NewQuote, QuoteDatabase};
use crate::query::tokenize_phrase;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct DemoQuote {
    pub speaker: Option<&'static str>,
    pub phrase: &'static str,
}

pub struct DemoPlay {
    pub title: &'static str,
    pub url: &'static str,
    pub quotes: &'static [DemoQuote],
}

const fn said(speaker: &'static str, phrase: &'static str) -> DemoQuote {
    DemoQuote {
        speaker: Some(speaker),
        phrase,
    }
}

const fn line(phrase: &'static str) -> DemoQuote {
    DemoQuote {
        speaker: None,
        phrase,
    }
}

pub const DEMO_PLAYS: &[DemoPlay] = &[
    DemoPlay {
        title: "Дєтство",
        url: "https://example.org/plays/detstvo",
        quotes: &[
            said("Баба", "Так би усє кишки у тєбя і шваркнули!"),
            said("Дід", "Шо мовчите, скуштували?"),
            said("Мать", "Дєтство Геббельса, от шо це таке."),
            line("А ти в бєлки видів?"),
        ],
    },
    DemoPlay {
        title: "Сєльскє вєчєра",
        url: "https://example.org/plays/vechera",
        quotes: &[
            said("Баба", "Шо за ностальгія? Чого вам щас не хвата, тюрми?"),
            said("Дід", "Така робота, шо нема шо взять."),
            said("Сусід", "Молодой культурний чєловєк бьйот кота."),
            line("Хто там в сінях тупотить?"),
        ],
    },
    DemoPlay {
        title: "Наука",
        url: "https://example.org/plays/nauka",
        quotes: &[
            said("Професор", "Дослідники калу приїхали з області."),
            said("Аспірант", "Ми вам пробірки привезли, підпишіть тут."),
            said("Професор", "Наука не терпить суєти і п'яних лаборантів."),
        ],
    },
    DemoPlay {
        title: "Вибори",
        url: "https://example.org/plays/vybory",
        quotes: &[
            said("Голова", "Чого вам не хвата, сала чи грошей?"),
            said("Секретар", "Бюлетені в шафі, ключ у баби."),
            line("Голосуйте серцем, а не шлунком."),
        ],
    },
];

/// Queries run by `find-quotes` when none are given
pub const DEMO_QUERIES: &[&str] = &[
    "дослідники калу",
    "Шо за ностальгія, чого вам щас не хвата, тюрми?",
    "Така робота, шо нема шо взять",
    // Latin "p" in the second word
    "кишки шваpкнули",
    "Шо мовчите, скуштували",
];

/// Number of quotes across all demo plays
pub fn demo_quote_count() -> usize {
    DEMO_PLAYS.iter().map(|p| p.quotes.len()).sum()
}

/// Write every demo play and quote into `db`. Returns the number of quotes written.
pub fn seed_demo(db: &QuoteDatabase) -> DatabaseResult<usize> {
    let mut written = 0;
    for play in DEMO_PLAYS {
        let play_id = db.insert_play(play.title, play.url)?;
        let quotes: Vec<NewQuote<'_>> = play
            .quotes
            .iter()
            .map(|q| NewQuote {
                play_id,
                speaker: q.speaker,
                phrase: q.phrase,
            })
            .collect();
        written += db.insert_quotes(&quotes)?.len();
    }
    tracing::info!(plays = DEMO_PLAYS.len(), quotes = written, "seeded demo corpus");
    Ok(written)
}

/// Lower-cased distinct words of the demo corpus, sorted
pub fn demo_vocabulary() -> Vec<String> {
    let mut words: Vec<String> = DEMO_PLAYS
        .iter()
        .flat_map(|p| p.quotes.iter())
        .flat_map(|q| {
            tokenize_phrase(q.phrase)
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    words.sort();
    words.dedup();
    words
}

/// `count` random phrases of 3 to 9 demo words each, reproducible for a given seed
pub fn synthetic_phrases(count: usize, seed: u64) -> Vec<String> {
    let vocabulary = demo_vocabulary();
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            let len = rng.gen_range(3..=9);
            (0..len)
                .map(|_| vocabulary[rng.gen_range(0..vocabulary.len())].as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
