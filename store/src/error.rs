use thiserror::Error;
use vocab_core::StoreError;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid export file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config file: {0}")]
    TomlRead(#[from] toml::de::Error),
    #[error("could not write config file: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("{0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}
