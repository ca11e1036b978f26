use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;
use vocab_core::{ReviewUpdate, StoreError, StoreResult, Word, WordSheet, WordStore};

use crate::error::DbResult;

const WORD_COLUMNS: &str = "id, term, definition, part_of_speech, pronunciation, example,
     example_translation, learned, review_count, last_reviewed, created_at, sheet_id";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> DbResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sheets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS words (
                id TEXT PRIMARY KEY,
                term TEXT NOT NULL,
                definition TEXT NOT NULL DEFAULT '',
                learned INTEGER NOT NULL DEFAULT 0,
                review_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed TEXT,
                created_at TEXT NOT NULL,
                sheet_id TEXT,
                FOREIGN KEY(sheet_id) REFERENCES sheets(id)
            );",
        )?;
        self.ensure_word_columns()?;
        Ok(())
    }

    /// Adds the content columns that databases created by older builds lack.
    fn ensure_word_columns(&self) -> rusqlite::Result<()> {
        let mut existing = HashSet::new();
        {
            let mut stmt = self.conn.prepare("PRAGMA table_info(words)")?;
            let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
            for column in columns {
                existing.insert(column?);
            }
        }

        for column in [
            "part_of_speech",
            "pronunciation",
            "example",
            "example_translation",
        ] {
            if !existing.contains(column) {
                log::debug!("adding missing words.{column} column");
                self.conn.execute(
                    &format!("ALTER TABLE words ADD COLUMN {column} TEXT NOT NULL DEFAULT ''"),
                    [],
                )?;
            }
        }
        Ok(())
    }

    pub fn insert_sheet(&self, sheet: &WordSheet) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO sheets (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                sheet.id.to_string(),
                sheet.name,
                format_time(sheet.created_at)
            ],
        )?;
        Ok(())
    }

    pub fn rename_sheet(&self, sheet_id: Uuid, name: &str) -> DbResult<bool> {
        let affected = self.conn.execute(
            "UPDATE sheets SET name = ?1 WHERE id = ?2",
            params![name, sheet_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn insert_word(&self, word: &Word) -> DbResult<()> {
        self.conn.execute(
            &format!("INSERT INTO words ({WORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
            params![
                word.id.to_string(),
                word.term,
                word.definition,
                word.part_of_speech,
                word.pronunciation,
                word.example,
                word.example_translation,
                word.learned,
                word.review_count,
                word.last_reviewed.map(format_time),
                format_time(word.created_at),
                word.sheet_id.map(|id| id.to_string())
            ],
        )?;
        Ok(())
    }

    pub fn word_exists(&self, term: &str) -> DbResult<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM words WHERE lower(term) = lower(?1) LIMIT 1")?;
        let mut rows = stmt.query(params![term])?;
        Ok(rows.next()?.is_some())
    }

    pub fn get_word(&self, word_id: Uuid) -> DbResult<Option<Word>> {
        let word = self
            .conn
            .query_row(
                &format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?1"),
                params![word_id.to_string()],
                word_from_row,
            )
            .optional()?;
        Ok(word)
    }

    pub fn load_all_words(&self) -> DbResult<Vec<Word>> {
        let mut words = Vec::new();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORD_COLUMNS}
             FROM words
             ORDER BY created_at, rowid"
        ))?;
        let rows = stmt.query_map([], word_from_row)?;
        for word in rows {
            words.push(word?);
        }
        Ok(words)
    }

    /// Newest first.
    pub fn list_sheets(&self) -> DbResult<Vec<WordSheet>> {
        self.query_sheets(
            "SELECT id, name, created_at
             FROM sheets
             ORDER BY created_at DESC",
        )
    }

    /// Sheets holding at least one word, newest first.
    pub fn sheets_with_words(&self) -> DbResult<Vec<WordSheet>> {
        self.query_sheets(
            "SELECT s.id, s.name, s.created_at
             FROM sheets s
             WHERE EXISTS (SELECT 1 FROM words w WHERE w.sheet_id = s.id)
             ORDER BY s.created_at DESC",
        )
    }

    fn query_sheets(&self, sql: &str) -> DbResult<Vec<WordSheet>> {
        let mut sheets = Vec::new();
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(WordSheet {
                id: parse_uuid(0, &row.get::<_, String>(0)?)?,
                name: row.get(1)?,
                created_at: parse_time(2, &row.get::<_, String>(2)?)?,
            })
        })?;
        for sheet in rows {
            sheets.push(sheet?);
        }
        Ok(sheets)
    }

    pub fn delete_word(&self, word_id: Uuid) -> DbResult<()> {
        self.conn
            .execute("DELETE FROM words WHERE id = ?1", params![word_id.to_string()])?;
        Ok(())
    }

    pub fn delete_all_words(&self) -> DbResult<()> {
        self.conn.execute_batch("DELETE FROM words;")?;
        Ok(())
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl WordStore for SqliteStore {
    fn load_words(&self) -> StoreResult<Vec<Word>> {
        Ok(self.load_all_words()?)
    }

    fn save_reviews(&self, updates: &[ReviewUpdate]) -> StoreResult<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|err| StoreError::Backend(Box::new(err)))?;
        for update in updates {
            let affected = tx
                .execute(
                    "UPDATE words SET learned = ?1, review_count = ?2, last_reviewed = ?3 WHERE id = ?4",
                    params![
                        update.learned,
                        update.review_count,
                        format_time(update.last_reviewed),
                        update.word_id.to_string()
                    ],
                )
                .map_err(|err| StoreError::Backend(Box::new(err)))?;
            if affected == 0 {
                return Err(StoreError::NotFound(update.word_id));
            }
        }
        tx.commit()
            .map_err(|err| StoreError::Backend(Box::new(err)))?;
        log::debug!("saved {} review updates", updates.len());
        Ok(())
    }
}

fn word_from_row(row: &Row<'_>) -> rusqlite::Result<Word> {
    let last_reviewed = row
        .get::<_, Option<String>>(9)?
        .map(|value| parse_time(9, &value))
        .transpose()?;
    let sheet_id = row
        .get::<_, Option<String>>(11)?
        .map(|value| parse_uuid(11, &value))
        .transpose()?;
    Ok(Word {
        id: parse_uuid(0, &row.get::<_, String>(0)?)?,
        term: row.get(1)?,
        definition: row.get(2)?,
        part_of_speech: row.get(3)?,
        pronunciation: row.get(4)?,
        example: row.get(5)?,
        example_translation: row.get(6)?,
        learned: row.get(7)?,
        review_count: row.get(8)?,
        last_reviewed,
        created_at: parse_time(10, &row.get::<_, String>(10)?)?,
        sheet_id,
    })
}

/// Fixed-width RFC 3339 so that text order matches time order.
pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}
