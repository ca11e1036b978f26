mod config;
mod error;
mod export;
mod sqlite;

pub use config::{AppConfig, DatabaseConfig, default_data_dir};
pub use error::{DbError, DbResult};
pub use export::{ExportData, ExportSheet, ExportWord, ImportSummary};
pub use sqlite::SqliteStore;
