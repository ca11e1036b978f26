use uuid::Uuid;

use crate::schedule::ModeCounts;
use crate::session::{ReviewSession, SessionPhase, StartOutcome, VerdictOutcome};
use crate::store::{Clock, StoreError, StoreResult, WordStore};
use crate::{ReviewConfig, ReviewMode, ReviewUpdate, Scope, Word};

/// Result of a verdict that was applied.
#[derive(Debug)]
pub struct VerdictReport {
    pub outcome: VerdictOutcome,
    /// Set when persisting failed. The session has still advanced.
    pub save_error: Option<StoreError>,
}

/// Drives a [`ReviewSession`] against a word store and a clock.
///
/// Review updates that could not be saved stay pending and are retried with
/// the next save. They are also replayed over every snapshot loaded from the
/// store, so a failed save never rolls back what the user already reviewed.
pub struct Reviewer<S, C> {
    store: S,
    clock: C,
    session: ReviewSession,
    pending: Vec<ReviewUpdate>,
}

impl<S: WordStore, C: Clock> Reviewer<S, C> {
    pub fn new(store: S, clock: C, config: ReviewConfig) -> Self {
        Self {
            store,
            clock,
            session: ReviewSession::new(config),
            pending: Vec::new(),
        }
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_scope(&mut self, scope: Scope) {
        self.session.set_scope(scope);
    }

    pub fn pending_saves(&self) -> usize {
        self.pending.len()
    }

    pub fn mode_counts(&self) -> StoreResult<ModeCounts> {
        let words = self.load_snapshot()?;
        Ok(self.session.mode_counts(&words, self.clock.now()))
    }

    pub fn start(&mut self, mode: ReviewMode) -> StoreResult<StartOutcome> {
        if self.session.phase() == SessionPhase::Presenting {
            return Ok(StartOutcome::Rejected);
        }
        let words = self.load_snapshot()?;
        Ok(self.session.start(mode, words, self.clock.now()))
    }

    pub fn current(&self) -> Option<&Word> {
        self.session.present_current()
    }

    pub fn submit_verdict(&mut self, word_id: Uuid, remembered: bool) -> Option<VerdictReport> {
        let outcome = self
            .session
            .submit_verdict(word_id, remembered, self.clock.now())?;
        self.queue_update(outcome.update);
        let save_error = self.flush().err();
        Some(VerdictReport {
            outcome,
            save_error,
        })
    }

    pub fn offer_replay(&self) -> bool {
        self.session.offer_replay()
    }

    pub fn replay_forgotten(&mut self) -> StartOutcome {
        self.session.replay_forgotten()
    }

    /// Called whenever the review surface regains focus.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Saves every pending update. On failure they stay pending.
    ///
    /// Updates for words the store no longer has are dropped and the rest is
    /// saved again. The first such `NotFound` is still returned.
    pub fn flush(&mut self) -> StoreResult<()> {
        let mut missing = None;
        while !self.pending.is_empty() {
            match self.store.save_reviews(&self.pending) {
                Ok(()) => self.pending.clear(),
                Err(StoreError::NotFound(word_id))
                    if self.pending.iter().any(|pending| pending.word_id == word_id) =>
                {
                    log::warn!("dropping review update for {word_id}, the word no longer exists");
                    self.pending.retain(|pending| pending.word_id != word_id);
                    missing.get_or_insert(word_id);
                }
                Err(err) => {
                    log::warn!(
                        "failed to save {} review updates, will retry: {err}",
                        self.pending.len()
                    );
                    return Err(err);
                }
            }
        }
        match missing {
            Some(word_id) => Err(StoreError::NotFound(word_id)),
            None => Ok(()),
        }
    }

    fn queue_update(&mut self, update: ReviewUpdate) {
        self.pending.retain(|pending| pending.word_id != update.word_id);
        self.pending.push(update);
    }

    fn load_snapshot(&self) -> StoreResult<Vec<Word>> {
        let mut words = self.store.load_words()?;
        for update in &self.pending {
            if let Some(word) = words.iter_mut().find(|word| word.id == update.word_id) {
                word.apply(update);
            }
        }
        Ok(words)
    }
}
