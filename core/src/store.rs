use std::cell::Cell;
use std::error::Error;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{ReviewUpdate, Word};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("word {0} not found")]
    NotFound(Uuid),
    #[error("word store failure: {0}")]
    Backend(#[source] Box<dyn Error + Send + Sync>),
}

/// Where words come from and where review results go.
pub trait WordStore {
    fn load_words(&self) -> StoreResult<Vec<Word>>;
    fn save_reviews(&self, updates: &[ReviewUpdate]) -> StoreResult<()>;
}

impl<S: WordStore + ?Sized> WordStore for &S {
    fn load_words(&self) -> StoreResult<Vec<Word>> {
        (**self).load_words()
    }

    fn save_reviews(&self, updates: &[ReviewUpdate]) -> StoreResult<()> {
        (**self).save_reviews(updates)
    }
}

impl<S: WordStore + ?Sized> WordStore for Box<S> {
    fn load_words(&self) -> StoreResult<Vec<Word>> {
        (**self).load_words()
    }

    fn save_reviews(&self, updates: &[ReviewUpdate]) -> StoreResult<()> {
        (**self).save_reviews(updates)
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant. `set` moves it.
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
