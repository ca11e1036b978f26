//! Due-word selection.
//!
//! A word that was never reviewed is always due. Otherwise it becomes due once
//! the number of calendar days since `last_reviewed` reaches the interval for
//! its `review_count`. Review frequency decreases as the count grows, with a
//! floor of one review every 30 days.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ReviewConfig, ReviewMode, Scope, Word};

/// Interval in days, indexed by review count. Counts past the end reuse the last entry.
pub const INTERVAL_DAYS: [i64; 6] = [0, 1, 3, 7, 15, 30];

pub fn interval_days(review_count: u32) -> i64 {
    let last = INTERVAL_DAYS.len() - 1;
    let index = usize::try_from(review_count).map_or(last, |count| count.min(last));
    INTERVAL_DAYS[index]
}

/// Whole calendar days from `from` to `to`, counted midnight to midnight in `tz`.
pub fn days_between<Tz: TimeZone>(from: DateTime<Utc>, to: DateTime<Utc>, tz: &Tz) -> i64 {
    let from_day = from.with_timezone(tz).date_naive();
    let to_day = to.with_timezone(tz).date_naive();
    to_day.signed_duration_since(from_day).num_days()
}

/// Where one calendar day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBoundary {
    /// Midnight in the system time zone, DST included.
    Local,
    Fixed(FixedOffset),
}

impl DayBoundary {
    pub fn days_between(self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        match self {
            DayBoundary::Local => days_between(from, to, &Local),
            DayBoundary::Fixed(offset) => days_between(from, to, &offset),
        }
    }
}

pub fn is_due(word: &Word, now: DateTime<Utc>, config: &ReviewConfig) -> bool {
    due_in(word, now, config.day_boundary())
}

fn due_in(word: &Word, now: DateTime<Utc>, boundary: DayBoundary) -> bool {
    let Some(last_reviewed) = word.last_reviewed else {
        return true;
    };
    boundary.days_between(last_reviewed, now) >= interval_days(word.review_count)
}

pub fn select_due<'w>(words: &'w [Word], now: DateTime<Utc>, config: &ReviewConfig) -> Vec<&'w Word> {
    let boundary = config.day_boundary();
    words.iter().filter(|word| due_in(word, now, boundary)).collect()
}

/// Words eligible for a session in `mode`, in input order.
pub fn select_for_mode<'w>(
    mode: ReviewMode,
    words: &'w [Word],
    scope: &Scope,
    forgotten: &HashSet<Uuid>,
    now: DateTime<Utc>,
    config: &ReviewConfig,
) -> Vec<&'w Word> {
    match mode {
        ReviewMode::ReviewAll => words.iter().filter(|word| scope.contains(word)).collect(),
        ReviewMode::ContinueLast => words
            .iter()
            .filter(|word| scope.contains(word))
            .filter(|word| !word.learned || forgotten.contains(&word.id))
            .collect(),
        ReviewMode::RecommendedReview => {
            let due = select_due(words, now, config);
            if config.recommended_uses_scope {
                due.into_iter().filter(|word| scope.contains(word)).collect()
            } else {
                due
            }
        }
    }
}

/// Queue sizes offered on the mode selection screen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeCounts {
    pub recommended: usize,
    pub review_all: usize,
    pub continue_last: usize,
}

pub fn mode_counts(
    words: &[Word],
    scope: &Scope,
    forgotten: &HashSet<Uuid>,
    now: DateTime<Utc>,
    config: &ReviewConfig,
) -> ModeCounts {
    let count = |mode| select_for_mode(mode, words, scope, forgotten, now, config).len();
    ModeCounts {
        recommended: count(ReviewMode::RecommendedReview),
        review_all: count(ReviewMode::ReviewAll),
        continue_last: count(ReviewMode::ContinueLast),
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LearningStats {
    pub total: usize,
    pub learned: usize,
    pub to_learn: usize,
}

pub fn learning_stats(words: &[Word]) -> LearningStats {
    let learned = words.iter().filter(|word| word.learned).count();
    LearningStats {
        total: words.len(),
        learned,
        to_learn: words.len() - learned,
    }
}
