//! SQLite database layer for the quote store
//!
//! Two tables: `plays` (title and link of a source play) and `quotes` (one line
//! of dialogue each, with its pre-tokenized form in `tokens`).
//! Uses r2d2 connection pooling so record lookups from concurrent searches do
//! not serialize on a single connection.

use crate::interface::{CorpusSource, DisplayRecord, QuoteFindError, RecordSource};
use crate::query::tokenize_phrase;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const SELECT_DISPLAY_RECORD: &str = r#"
    SELECT q.quote_id, p.title, p.url, q.speaker, q.phrase
    FROM quotes q JOIN plays p ON p.play_id = q.play_id"#;

/// Bound on `?` parameters per `IN (...)` lookup, well under SQLite's variable limit
const MAX_IDS_PER_QUERY: usize = 500;

/// A quote to be written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewQuote<'a> {
    pub play_id: i64,
    pub speaker: Option<&'a str>,
    pub phrase: &'a str,
}

/// Thread-safe quote store using connection pooling
pub struct QuoteDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl QuoteDatabase {
    /// Open or create a database at the given path, creating the schema if needed
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an existing database for searching only.
    ///
    /// A missing file is an error rather than an empty store.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("quote database not found at {}", path.display()),
            )
            .into());
        }

        let manager = SqliteConnectionManager::file(path).with_flags(
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        );
        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool };
        db.verify_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            Ok(())
        });

        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS plays (
                play_id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS quotes (
                quote_id INTEGER PRIMARY KEY,
                play_id INTEGER NOT NULL REFERENCES plays(play_id) ON DELETE CASCADE,
                speaker TEXT,
                phrase TEXT NOT NULL,
                tokens TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_quotes_play ON quotes(play_id);
        "#,
        )?;
        Ok(())
    }

    /// Fail early on a file that is not a quote store
    fn verify_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.prepare("SELECT quote_id, play_id, speaker, phrase, tokens FROM quotes LIMIT 0")?;
        conn.prepare("SELECT play_id, title, url FROM plays LIMIT 0")?;
        Ok(())
    }

    pub fn count_quotes(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_plays(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM plays", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a play and return its ID
    pub fn insert_play(&self, title: &str, url: &str) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO plays (title, url) VALUES (?1, ?2)",
            params![title, url],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a quote, deriving its stored tokens from the phrase. Returns the quote ID.
    pub fn insert_quote(&self, play_id: i64, speaker: Option<&str>, phrase: &str) -> DatabaseResult<i64> {
        self.insert_quote_with_tokens(play_id, speaker, phrase, &tokenize_phrase(phrase))
    }

    /// Insert a quote with an explicit token string
    pub fn insert_quote_with_tokens(
        &self,
        play_id: i64,
        speaker: Option<&str>,
        phrase: &str,
        tokens: &str,
    ) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO quotes (play_id, speaker, phrase, tokens) VALUES (?1, ?2, ?3, ?4)",
            params![play_id, speaker, phrase, tokens],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert many quotes in a single transaction. Returns IDs in input order.
    pub fn insert_quotes(&self, quotes: &[NewQuote<'_>]) -> DatabaseResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(quotes.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO quotes (play_id, speaker, phrase, tokens) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for quote in quotes {
                stmt.execute(params![
                    quote.play_id,
                    quote.speaker,
                    quote.phrase,
                    tokenize_phrase(quote.phrase),
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Every `(quote_id, tokens)` pair, ascending by ID
    pub fn fetch_all_tokenized_entries(&self) -> DatabaseResult<Vec<(i64, String)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT quote_id, tokens FROM quotes ORDER BY quote_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_display_record(&self, quote_id: i64) -> DatabaseResult<Option<DisplayRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE q.quote_id = ?1", SELECT_DISPLAY_RECORD);
        let record = conn
            .query_row(&sql, [quote_id], Self::row_to_display_record)
            .optional()?;
        Ok(record)
    }

    /// Fetch several records in one query, one slot per input ID, in input order
    pub fn fetch_display_records(&self, quote_ids: &[i64]) -> DatabaseResult<Vec<Option<DisplayRecord>>> {
        if quote_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut found: HashMap<i64, DisplayRecord> = HashMap::with_capacity(quote_ids.len());
        for chunk in quote_ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("{} WHERE q.quote_id IN ({})", SELECT_DISPLAY_RECORD, placeholders);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), Self::row_to_display_record)?;
            for row in rows {
                let record = row?;
                found.insert(record.quote_id, record);
            }
        }

        Ok(quote_ids
            .iter()
            .map(|id| found.get(id).cloned())
            .collect())
    }

    fn row_to_display_record(row: &rusqlite::Row) -> rusqlite::Result<DisplayRecord> {
        Ok(DisplayRecord {
            quote_id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            speaker: row.get(3)?,
            phrase: row.get(4)?,
        })
    }
}

impl CorpusSource for QuoteDatabase {
    fn fetch_all_tokenized_entries(&self) -> Result<Vec<(i64, String)>, QuoteFindError> {
        Ok(QuoteDatabase::fetch_all_tokenized_entries(self)?)
    }
}

impl RecordSource for QuoteDatabase {
    fn fetch_display_record(&self, quote_id: i64) -> Result<Option<DisplayRecord>, QuoteFindError> {
        Ok(QuoteDatabase::fetch_display_record(self, quote_id)?)
    }

    fn fetch_display_records(&self, quote_ids: &[i64]) -> Result<Vec<Option<DisplayRecord>>, QuoteFindError> {
        Ok(QuoteDatabase::fetch_display_records(self, quote_ids)?)
    }
}
