use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use vocab_core::ReviewConfig;

use crate::error::{DbError, DbResult};
use crate::sqlite::SqliteStore;

const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "words.db";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub review: ReviewConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `words.db` inside the data directory.
    pub path: Option<PathBuf>,
}

pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "vocab", "Vocab")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl AppConfig {
    /// Reads the config file, writing one with defaults if it does not exist yet.
    pub fn load(path: &Path) -> DbResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = AppConfig::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, toml::to_string_pretty(&config)?)?;
            log::info!("wrote default config to {}", path.display());
            Ok(config)
        }
    }

    /// Loads `config.toml` from `data_dir`, then applies `.env` and environment overrides.
    pub fn bootstrap(data_dir: &Path) -> DbResult<Self> {
        fs::create_dir_all(data_dir)?;
        let mut config = Self::load(&data_dir.join(CONFIG_FILE))?;
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                log::warn!("ignoring unreadable .env file: {err}");
            }
        }
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> DbResult<()> {
        if let Some(path) = lookup("VOCAB_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("VOCAB_UTC_OFFSET_MINUTES") {
            let value = value.trim();
            self.review.utc_offset_minutes = if value.eq_ignore_ascii_case("local") {
                None
            } else {
                Some(value.parse().map_err(|_| {
                    DbError::Config(format!(
                        "VOCAB_UTC_OFFSET_MINUTES must be an integer or 'local', got '{value}'"
                    ))
                })?)
            };
        }
        if let Some(value) = lookup("VOCAB_RECOMMENDED_USES_SCOPE") {
            self.review.recommended_uses_scope = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(DbError::Config(format!(
                        "VOCAB_RECOMMENDED_USES_SCOPE must be true or false, got '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join(DB_FILE))
    }

    /// Opens and initializes the configured database.
    pub fn open_store(&self, data_dir: &Path) -> DbResult<SqliteStore> {
        let path = self.database_path(data_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = SqliteStore::open(&path)?;
        store.init()?;
        Ok(store)
    }
}
