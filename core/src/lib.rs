use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod reviewer;
pub mod schedule;
pub mod session;
pub mod store;

pub use reviewer::{Reviewer, VerdictReport};
pub use schedule::{
    days_between, interval_days, is_due, learning_stats, mode_counts, select_due,
    select_for_mode, DayBoundary, LearningStats, ModeCounts, INTERVAL_DAYS,
};
pub use session::{ReviewSession, SessionPhase, StartOutcome, VerdictOutcome};
pub use store::{Clock, FixedClock, StoreError, StoreResult, SystemClock, WordStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReviewMode {
    ReviewAll,
    ContinueLast,
    RecommendedReview,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    pub id: Uuid,
    pub term: String,
    pub definition: String,
    pub part_of_speech: String,
    pub pronunciation: String,
    pub example: String,
    pub example_translation: String,
    pub learned: bool,
    pub review_count: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub sheet_id: Option<Uuid>,
}

impl Word {
    pub fn new(term: impl Into<String>, definition: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            term: term.into(),
            definition: definition.into(),
            part_of_speech: String::new(),
            pronunciation: String::new(),
            example: String::new(),
            example_translation: String::new(),
            learned: false,
            review_count: 0,
            last_reviewed: None,
            created_at: now,
            sheet_id: None,
        }
    }

    pub fn in_sheet(mut self, sheet_id: Uuid) -> Self {
        self.sheet_id = Some(sheet_id);
        self
    }

    /// Copies the review fields of `update` onto this word.
    pub fn apply(&mut self, update: &ReviewUpdate) {
        self.learned = update.learned;
        self.review_count = update.review_count;
        self.last_reviewed = Some(update.last_reviewed);
    }
}

/// A named, dated collection of words.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordSheet {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl WordSheet {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now,
        }
    }
}

/// The review fields written back to the word store after a verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub word_id: Uuid,
    pub learned: bool,
    pub review_count: u32,
    pub last_reviewed: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    Sheet(Uuid),
    Words(HashSet<Uuid>),
}

impl Scope {
    pub fn contains(&self, word: &Word) -> bool {
        match self {
            Scope::All => true,
            Scope::Sheet(sheet_id) => word.sheet_id == Some(*sheet_id),
            Scope::Words(ids) => ids.contains(&word.id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReviewConfig {
    /// Fixed offset whose midnight separates calendar days. Unset means the
    /// system time zone.
    pub utc_offset_minutes: Option<i32>,
    pub recommended_uses_scope: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: None,
            recommended_uses_scope: false,
        }
    }
}

impl ReviewConfig {
    pub fn day_boundary(&self) -> DayBoundary {
        let Some(minutes) = self.utc_offset_minutes else {
            return DayBoundary::Local;
        };
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(offset) => DayBoundary::Fixed(offset),
            None => {
                log::warn!("utc_offset_minutes {minutes} is out of range, using the system time zone");
                DayBoundary::Local
            }
        }
    }
}
