//! JSON backup of sheets and words.
//!
//! Keys are camelCase and sorted, timestamps are fractional seconds since the
//! Unix epoch. Importing merges into the existing data: known sheets are
//! renamed, known words are left alone.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vocab_core::{Word, WordSheet};

use crate::error::{DbError, DbResult};
use crate::sqlite::SqliteStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExportData {
    pub words: Vec<ExportWord>,
    pub sheets: Vec<ExportSheet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportWord {
    pub id: String,
    pub term: String,
    pub definition: String,
    pub part_of_speech: String,
    pub pronunciation: String,
    pub example: String,
    #[serde(rename = "exampleCn")]
    pub example_translation: String,
    pub learned: bool,
    pub review_count: u32,
    pub last_reviewed: Option<f64>,
    pub created_at: f64,
    pub sheet_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSheet {
    pub id: String,
    pub name: String,
    pub created_at: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub sheets_added: usize,
    pub sheets_renamed: usize,
    pub words_added: usize,
    pub words_skipped: usize,
}

impl ExportData {
    pub fn to_json(&self) -> DbResult<String> {
        // Going through `Value` sorts the keys.
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn from_json(json: &str) -> DbResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: &Path) -> DbResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> DbResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

impl From<&Word> for ExportWord {
    fn from(word: &Word) -> Self {
        Self {
            id: word.id.to_string(),
            term: word.term.clone(),
            definition: word.definition.clone(),
            part_of_speech: word.part_of_speech.clone(),
            pronunciation: word.pronunciation.clone(),
            example: word.example.clone(),
            example_translation: word.example_translation.clone(),
            learned: word.learned,
            review_count: word.review_count,
            last_reviewed: word.last_reviewed.map(to_epoch),
            created_at: to_epoch(word.created_at),
            sheet_id: word.sheet_id.map(|id| id.to_string()),
        }
    }
}

impl From<&WordSheet> for ExportSheet {
    fn from(sheet: &WordSheet) -> Self {
        Self {
            id: sheet.id.to_string(),
            name: sheet.name.clone(),
            created_at: to_epoch(sheet.created_at),
        }
    }
}

impl SqliteStore {
    pub fn export(&self) -> DbResult<ExportData> {
        Ok(ExportData {
            words: self.load_all_words()?.iter().map(ExportWord::from).collect(),
            sheets: self.list_sheets()?.iter().map(ExportSheet::from).collect(),
        })
    }

    /// Merges `data` into the store in a single transaction.
    pub fn import(&self, data: &ExportData) -> DbResult<ImportSummary> {
        let tx = self.connection().unchecked_transaction()?;
        let mut summary = ImportSummary::default();

        let existing_sheets: HashSet<Uuid> = self.list_sheets()?.iter().map(|s| s.id).collect();
        let mut sheet_ids: HashMap<&str, Uuid> = HashMap::new();
        for sheet in &data.sheets {
            let parsed = Uuid::parse_str(&sheet.id).ok();
            match parsed {
                Some(id) if existing_sheets.contains(&id) => {
                    self.rename_sheet(id, &sheet.name)?;
                    summary.sheets_renamed += 1;
                    sheet_ids.insert(sheet.id.as_str(), id);
                }
                _ => {
                    let id = parsed
                        .filter(|id| !sheet_ids.values().any(|known| known == id))
                        .unwrap_or_else(Uuid::new_v4);
                    self.insert_sheet(&WordSheet {
                        id,
                        name: sheet.name.clone(),
                        created_at: from_epoch(sheet.created_at)?,
                    })?;
                    summary.sheets_added += 1;
                    sheet_ids.insert(sheet.id.as_str(), id);
                }
            }
        }

        let mut known_words: HashSet<Uuid> = self.load_all_words()?.iter().map(|w| w.id).collect();
        for word in &data.words {
            let parsed = Uuid::parse_str(&word.id).ok();
            if parsed.is_some_and(|id| known_words.contains(&id)) {
                summary.words_skipped += 1;
                continue;
            }
            let id = parsed.unwrap_or_else(Uuid::new_v4);
            let sheet_id = word
                .sheet_id
                .as_deref()
                .and_then(|sheet| sheet_ids.get(sheet).copied());
            self.insert_word(&Word {
                id,
                term: word.term.clone(),
                definition: word.definition.clone(),
                part_of_speech: word.part_of_speech.clone(),
                pronunciation: word.pronunciation.clone(),
                example: word.example.clone(),
                example_translation: word.example_translation.clone(),
                learned: word.learned,
                review_count: word.review_count,
                last_reviewed: word.last_reviewed.map(from_epoch).transpose()?,
                created_at: from_epoch(word.created_at)?,
                sheet_id,
            })?;
            known_words.insert(id);
            summary.words_added += 1;
        }

        tx.commit()?;
        log::info!(
            "imported {} sheets ({} renamed) and {} words ({} skipped)",
            summary.sheets_added,
            summary.sheets_renamed,
            summary.words_added,
            summary.words_skipped
        );
        Ok(summary)
    }
}

fn to_epoch(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

fn from_epoch(seconds: f64) -> DbResult<DateTime<Utc>> {
    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() {
        return Err(DbError::Config(format!("invalid timestamp {seconds}")));
    }
    DateTime::from_timestamp_micros(micros as i64)
        .ok_or_else(|| DbError::Config(format!("timestamp {seconds} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_seconds_keep_microseconds() {
        let at = Utc.with_ymd_and_hms(2026, 1, 14, 9, 30, 15).unwrap()
            + chrono::Duration::microseconds(250_500);
        assert_eq!(from_epoch(to_epoch(at)).unwrap(), at);
        assert!(from_epoch(f64::NAN).is_err());
        assert!(from_epoch(1e300).is_err());
    }

    #[test]
    fn json_keys_are_sorted_camel_case() {
        let now = Utc.with_ymd_and_hms(2026, 1, 14, 0, 0, 0).unwrap();
        let word = Word::new("lucid", "clear", now);
        let data = ExportData {
            words: vec![ExportWord::from(&word)],
            sheets: Vec::new(),
        };
        let json = data.to_json().unwrap();

        let created = json.find("\"createdAt\"").unwrap();
        let definition = json.find("\"definition\"").unwrap();
        let example_cn = json.find("\"exampleCn\"").unwrap();
        let sheet_id = json.find("\"sheetId\"").unwrap();
        assert!(created < definition && definition < example_cn && example_cn < sheet_id);
        assert!(json.find("\"sheets\"").unwrap() < json.find("\"words\"").unwrap());
        assert!(json.contains("\"lastReviewed\": null"));
        assert_eq!(ExportData::from_json(&json).unwrap(), data);
    }
}
