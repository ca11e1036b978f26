use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;
use vocab_core::{Word, WordSheet};
use vocab_store::{ExportData, ExportSheet, ExportWord, ImportSummary, SqliteStore};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 14, 9, 0, 0).unwrap()
}

fn open(dir: &tempfile::TempDir, name: &str) -> SqliteStore {
    let store = SqliteStore::open(&dir.path().join(name)).unwrap();
    store.init().unwrap();
    store
}

#[test]
fn export_then_import_into_empty_store() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let source = open(&dir, "source.db");

    let sheet = WordSheet::new("Unit 3", now());
    source.insert_sheet(&sheet).unwrap();
    let mut reviewed = Word::new("meticulous", "very careful", now()).in_sheet(sheet.id);
    reviewed.learned = true;
    reviewed.review_count = 2;
    reviewed.last_reviewed = Some(now() + Duration::days(1));
    source.insert_word(&reviewed).unwrap();
    source
        .insert_word(&Word::new("loose", "not firmly fixed", now() + Duration::seconds(1)))
        .unwrap();

    let path = dir.path().join("backup.json");
    source.export().unwrap().write_to(&path).unwrap();

    let target = open(&dir, "target.db");
    let summary = target.import(&ExportData::read_from(&path).unwrap()).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            sheets_added: 1,
            sheets_renamed: 0,
            words_added: 2,
            words_skipped: 0,
        }
    );
    assert_eq!(target.load_all_words().unwrap(), source.load_all_words().unwrap());
    assert_eq!(target.list_sheets().unwrap(), vec![sheet]);

    // Importing the same file again changes nothing but sheet names.
    let again = target.import(&ExportData::read_from(&path).unwrap()).unwrap();
    assert_eq!(again.words_added, 0);
    assert_eq!(again.words_skipped, 2);
    assert_eq!(again.sheets_renamed, 1);
}

#[test]
fn import_renames_known_sheets_and_remaps_bad_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir, "words.db");
    let sheet = WordSheet::new("old name", now());
    store.insert_sheet(&sheet).unwrap();

    let data = ExportData {
        sheets: vec![
            ExportSheet {
                id: sheet.id.to_string(),
                name: "new name".to_string(),
                created_at: 1_768_381_200.0,
            },
            ExportSheet {
                id: "not-a-uuid".to_string(),
                name: "imported".to_string(),
                created_at: 1_768_381_200.5,
            },
        ],
        words: vec![ExportWord {
            id: "also-not-a-uuid".to_string(),
            term: "quell".to_string(),
            definition: "to put an end to".to_string(),
            part_of_speech: "v.".to_string(),
            pronunciation: String::new(),
            example: String::new(),
            example_translation: String::new(),
            learned: false,
            review_count: 0,
            last_reviewed: None,
            created_at: 1_768_381_200.0,
            sheet_id: Some("not-a-uuid".to_string()),
        }],
    };

    let summary = store.import(&data).unwrap();
    assert_eq!(summary.sheets_renamed, 1);
    assert_eq!(summary.sheets_added, 1);
    assert_eq!(summary.words_added, 1);

    let sheets = store.list_sheets().unwrap();
    let imported = sheets.iter().find(|s| s.name == "imported").unwrap();
    assert!(sheets.iter().any(|s| s.id == sheet.id && s.name == "new name"));

    let words = store.load_all_words().unwrap();
    assert_eq!(words.len(), 1);
    assert_ne!(words[0].id, Uuid::nil());
    assert_eq!(words[0].sheet_id, Some(imported.id));
}

#[test]
fn malformed_json_is_rejected() {
    assert!(ExportData::from_json("{\"words\": 3}").is_err());
}
