use criterion::{criterion_group, criterion_main, Criterion};
use quotefind::database::{NewQuote, QuoteDatabase};
use quotefind::demo_data::{seed_demo, synthetic_phrases};
use quotefind::distance::edit_distance;
use quotefind::{QuoteFinder, Settings};

const SYNTHETIC_QUOTES: usize = 5_000;

fn setup_finder(dir: &tempfile::TempDir) -> QuoteFinder {
    let path = dir.path().join("bench.sqlite");
    let db = QuoteDatabase::open(&path).unwrap();
    seed_demo(&db).unwrap();

    let play_id = db.insert_play("Синтетика", "https://example.org/plays/synthetic").unwrap();
    let phrases = synthetic_phrases(SYNTHETIC_QUOTES, 42);
    let quotes: Vec<NewQuote<'_>> = phrases
        .iter()
        .map(|phrase| NewQuote { play_id, speaker: None, phrase })
        .collect();
    db.insert_quotes(&quotes).unwrap();
    drop(db);

    let settings = Settings {
        db_file: path,
        ..Settings::default()
    };
    QuoteFinder::open(&settings).unwrap()
}

fn bench_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let finder = setup_finder(&dir);

    let queries = vec![
        ("single_word", "ностальгія"),
        ("exact_phrase", "шо мовчите скуштували"),
        ("homoglyph_typo", "кишки шваpкнули"),
        ("long_query", "шо за ностальгія чого вам щас не хвата тюрми"),
        ("no_match", "зовсім інший текст без збігів"),
    ];

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for (name, query) in &queries {
        group.bench_function(format!("warm/{}", name), |b| {
            b.iter(|| finder.search(query));
        });
    }
    for (name, query) in &queries {
        group.bench_function(format!("cold/{}", name), |b| {
            b.iter(|| {
                finder.clear_cache();
                finder.search(query)
            });
        });
    }
    group.finish();
}

fn bench_edit_distance(c: &mut Criterion) {
    let pairs = vec![
        ("short", "кот", "кіт"),
        ("medium", "шваpкнули", "шваркнули"),
        ("long", "ностальгія", "лаборантів"),
    ];

    let mut group = c.benchmark_group("edit_distance");
    for (name, a, b) in pairs {
        group.bench_function(name, |bench| {
            bench.iter(|| edit_distance(std::hint::black_box(a), std::hint::black_box(b)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search, bench_edit_distance);
criterion_main!(benches);
