//! Review session state machine.
//!
//! A session starts when a [`ReviewMode`] is chosen and presents its queue
//! front to back. Every verdict removes the front word, so a word is shown at
//! most once per pass. When the queue runs dry the session lands in
//! [`SessionPhase::RoundComplete`]. From there the caller either starts over
//! or replays the words marked as forgotten.
//!
//! Stale or duplicate verdicts (a word id that is not the current front) are
//! ignored without touching any state.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::{self, ModeCounts};
use crate::{ReviewConfig, ReviewMode, ReviewUpdate, Scope, Word};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    ModeSelection,
    Presenting,
    RoundComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { queued: usize },
    /// Nothing qualified for the chosen mode.
    NothingToReview,
    /// A pass is already being presented.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictOutcome {
    pub update: ReviewUpdate,
    pub remembered: bool,
    pub round_complete: bool,
}

#[derive(Debug, Default)]
pub struct ReviewSession {
    config: ReviewConfig,
    scope: Scope,
    words: Vec<Word>,
    index: HashMap<Uuid, usize>,
    queue: VecDeque<Uuid>,
    forgotten: HashSet<Uuid>,
    mode: Option<ReviewMode>,
    phase: SessionPhase,
}

impl ReviewSession {
    pub fn new(config: ReviewConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Takes effect at the next start or replay.
    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mode(&self) -> Option<ReviewMode> {
        self.mode
    }

    /// False outside of an active pass, including right after a round completes.
    pub fn mode_selected(&self) -> bool {
        self.phase == SessionPhase::Presenting
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn forgotten_count(&self) -> usize {
        self.forgotten.len()
    }

    pub fn is_forgotten(&self, word_id: Uuid) -> bool {
        self.forgotten.contains(&word_id)
    }

    pub fn forgotten_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.forgotten.iter()
    }

    /// The session's word snapshot, including verdicts applied so far.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn start(&mut self, mode: ReviewMode, words: Vec<Word>, now: DateTime<Utc>) -> StartOutcome {
        if self.phase == SessionPhase::Presenting {
            log::debug!("start {mode:?} rejected, a pass is already in progress");
            return StartOutcome::Rejected;
        }

        if mode != ReviewMode::ContinueLast {
            self.forgotten.clear();
        }

        let selected: Vec<Uuid> = schedule::select_for_mode(
            mode,
            &words,
            &self.scope,
            &self.forgotten,
            now,
            &self.config,
        )
        .into_iter()
        .map(|word| word.id)
        .collect();

        self.load_snapshot(words);
        self.enqueue(selected);
        for word_id in &self.queue {
            self.forgotten.remove(word_id);
        }
        self.mode = Some(mode);

        if self.queue.is_empty() {
            log::debug!("start {mode:?}: nothing to review");
            // Leftover ids outside the scope must not trigger a replay offer.
            self.forgotten.clear();
            self.phase = SessionPhase::RoundComplete;
            return StartOutcome::NothingToReview;
        }

        self.phase = SessionPhase::Presenting;
        log::debug!("start {mode:?}: {} words queued", self.queue.len());
        StartOutcome::Started {
            queued: self.queue.len(),
        }
    }

    pub fn present_current(&self) -> Option<&Word> {
        let word_id = self.queue.front()?;
        self.index.get(word_id).map(|&idx| &self.words[idx])
    }

    pub fn submit_verdict(
        &mut self,
        word_id: Uuid,
        remembered: bool,
        now: DateTime<Utc>,
    ) -> Option<VerdictOutcome> {
        if self.queue.front() != Some(&word_id) {
            log::trace!("ignoring verdict for {word_id}, it is not the current word");
            return None;
        }
        let idx = *self.index.get(&word_id)?;
        self.queue.pop_front();

        let word = &mut self.words[idx];
        if remembered {
            word.learned = true;
            self.forgotten.remove(&word_id);
        } else {
            self.forgotten.insert(word_id);
            if self.mode == Some(ReviewMode::ReviewAll) {
                word.learned = false;
            }
        }
        word.review_count = word.review_count.saturating_add(1);
        word.last_reviewed = Some(now);

        let update = ReviewUpdate {
            word_id,
            learned: word.learned,
            review_count: word.review_count,
            last_reviewed: now,
        };

        let round_complete = self.queue.is_empty();
        if round_complete {
            self.phase = SessionPhase::RoundComplete;
            log::debug!(
                "round complete, {} words marked forgotten",
                self.forgotten.len()
            );
        }

        Some(VerdictOutcome {
            update,
            remembered,
            round_complete,
        })
    }

    /// Only a `ContinueLast` round prompts to go over forgotten words again.
    pub fn offer_replay(&self) -> bool {
        self.phase == SessionPhase::RoundComplete
            && self.mode == Some(ReviewMode::ContinueLast)
            && !self.forgotten.is_empty()
    }

    pub fn replay_forgotten(&mut self) -> StartOutcome {
        let Some(mode) = self.mode else {
            return StartOutcome::Rejected;
        };
        if self.phase != SessionPhase::RoundComplete {
            return StartOutcome::Rejected;
        }

        let library_wide = mode == ReviewMode::RecommendedReview && !self.config.recommended_uses_scope;
        let replay: Vec<Uuid> = self
            .words
            .iter()
            .filter(|word| library_wide || self.scope.contains(word))
            .filter(|word| self.forgotten.contains(&word.id))
            .map(|word| word.id)
            .collect();
        self.enqueue(replay);
        self.forgotten.clear();

        if self.queue.is_empty() {
            self.phase = SessionPhase::ModeSelection;
            self.mode = None;
            return StartOutcome::NothingToReview;
        }

        self.phase = SessionPhase::Presenting;
        log::debug!("replaying {} forgotten words", self.queue.len());
        StartOutcome::Started {
            queued: self.queue.len(),
        }
    }

    /// Drops every trace of the current session. The scope is kept.
    pub fn reset(&mut self) {
        self.words.clear();
        self.index.clear();
        self.queue.clear();
        self.forgotten.clear();
        self.mode = None;
        self.phase = SessionPhase::ModeSelection;
    }

    pub fn mode_counts(&self, words: &[Word], now: DateTime<Utc>) -> ModeCounts {
        schedule::mode_counts(words, &self.scope, &self.forgotten, now, &self.config)
    }

    fn load_snapshot(&mut self, words: Vec<Word>) {
        self.index.clear();
        for (idx, word) in words.iter().enumerate() {
            self.index.entry(word.id).or_insert(idx);
        }
        self.words = words;
    }

    fn enqueue(&mut self, ids: Vec<Uuid>) {
        let mut seen = HashSet::new();
        self.queue = ids
            .into_iter()
            .filter(|id| self.index.contains_key(id) && seen.insert(*id))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap()
    }

    fn words(count: usize) -> Vec<Word> {
        let created = now() - Duration::days(30);
        (0..count)
            .map(|n| Word::new(format!("term-{n}"), format!("definition-{n}"), created))
            .collect()
    }

    fn front_id(session: &ReviewSession) -> Uuid {
        session.present_current().map(|word| word.id).unwrap()
    }

    fn word<'s>(session: &'s ReviewSession, id: Uuid) -> &'s Word {
        session.words().iter().find(|word| word.id == id).unwrap()
    }

    #[test]
    fn recommended_round_does_not_offer_replay() {
        let batch = words(3);
        let ids: Vec<Uuid> = batch.iter().map(|w| w.id).collect();
        let mut session = ReviewSession::new(ReviewConfig::default());

        assert_eq!(
            session.start(ReviewMode::RecommendedReview, batch, now()),
            StartOutcome::Started { queued: 3 }
        );
        assert!(session.mode_selected());

        for (id, remembered) in ids.iter().zip([true, false, true]) {
            assert_eq!(front_id(&session), *id);
            session.submit_verdict(*id, remembered, now()).unwrap();
        }

        assert_eq!(session.remaining(), 0);
        assert_eq!(session.present_current(), None);
        assert_eq!(session.phase(), SessionPhase::RoundComplete);
        assert!(!session.mode_selected());
        assert_eq!(session.forgotten_ids().copied().collect::<Vec<_>>(), vec![ids[1]]);
        assert!(!session.offer_replay());
    }

    #[test]
    fn continue_last_replays_forgotten_words() {
        let batch = words(2);
        let ids: Vec<Uuid> = batch.iter().map(|w| w.id).collect();
        let mut session = ReviewSession::new(ReviewConfig::default());

        session.start(ReviewMode::ContinueLast, batch, now());
        for id in &ids {
            let outcome = session.submit_verdict(*id, false, now()).unwrap();
            assert_eq!(outcome.round_complete, *id == ids[1]);
        }
        assert!(session.offer_replay());

        assert_eq!(session.replay_forgotten(), StartOutcome::Started { queued: 2 });
        assert_eq!(session.forgotten_count(), 0);
        assert_eq!(session.mode(), Some(ReviewMode::ContinueLast));
        assert_eq!(front_id(&session), ids[0]);
        session.submit_verdict(ids[0], true, now()).unwrap();
        assert_eq!(front_id(&session), ids[1]);
    }

    #[test]
    fn verdict_updates_review_fields_once() {
        let mut batch = words(2);
        batch[0].review_count = 4;
        let first = batch[0].id;
        let mut session = ReviewSession::new(ReviewConfig::default());
        session.start(ReviewMode::ReviewAll, batch, now());

        let later = now() + Duration::minutes(5);
        let outcome = session.submit_verdict(first, false, later).unwrap();
        assert_eq!(
            outcome.update,
            ReviewUpdate {
                word_id: first,
                learned: false,
                review_count: 5,
                last_reviewed: later,
            }
        );
        assert!(!outcome.round_complete);
        assert_eq!(word(&session, first).review_count, 5);
        assert_eq!(word(&session, first).last_reviewed, Some(later));
        assert!(session.is_forgotten(first));

        // A duplicate callback for the same word is ignored.
        assert_eq!(session.submit_verdict(first, true, later), None);
        assert_eq!(word(&session, first).review_count, 5);
        assert!(session.is_forgotten(first));
    }

    #[test]
    fn remembered_marks_learned_and_clears_forgotten() {
        let mut batch = words(1);
        batch[0].learned = true;
        let id = batch[0].id;
        let mut session = ReviewSession::new(ReviewConfig::default());

        // Forgotten in a ContinueLast pass, then remembered on the next one.
        session.start(ReviewMode::ContinueLast, batch.clone(), now());
        assert_eq!(session.present_current(), None);
        session.reset();

        batch[0].learned = false;
        session.start(ReviewMode::ContinueLast, batch, now());
        session.submit_verdict(id, false, now()).unwrap();
        assert!(session.is_forgotten(id));

        let snapshot = session.words().to_vec();
        assert_eq!(
            session.start(ReviewMode::ContinueLast, snapshot, now()),
            StartOutcome::Started { queued: 1 }
        );
        assert!(!session.is_forgotten(id));
        let outcome = session.submit_verdict(id, true, now()).unwrap();
        assert!(outcome.update.learned);
        assert!(!session.is_forgotten(id));
        assert!(!session.offer_replay());
    }

    #[test]
    fn forgetting_in_review_all_unlearns_the_word() {
        let mut batch = words(1);
        batch[0].learned = true;
        let id = batch[0].id;
        let mut session = ReviewSession::new(ReviewConfig::default());

        session.start(ReviewMode::ReviewAll, batch, now());
        let outcome = session.submit_verdict(id, false, now()).unwrap();
        assert!(!outcome.update.learned);
        assert!(outcome.round_complete);
        assert!(!session.offer_replay());
    }

    #[test]
    fn forgetting_outside_review_all_keeps_learned() {
        let mut batch = words(1);
        batch[0].learned = true;
        let id = batch[0].id;
        let mut session = ReviewSession::new(ReviewConfig::default());

        session.start(ReviewMode::RecommendedReview, batch, now());
        let outcome = session.submit_verdict(id, false, now()).unwrap();
        assert!(outcome.update.learned);
    }

    #[test]
    fn stale_verdict_changes_nothing() {
        let batch = words(2);
        let second = batch[1].id;
        let mut session = ReviewSession::new(ReviewConfig::default());
        session.start(ReviewMode::ReviewAll, batch.clone(), now());

        assert_eq!(session.submit_verdict(second, false, now()), None);
        assert_eq!(session.submit_verdict(Uuid::new_v4(), true, now()), None);
        assert_eq!(session.remaining(), 2);
        assert_eq!(session.forgotten_count(), 0);
        assert_eq!(session.words(), batch.as_slice());
    }

    #[test]
    fn verdict_without_a_session_is_ignored() {
        let mut session = ReviewSession::new(ReviewConfig::default());
        assert_eq!(session.submit_verdict(Uuid::new_v4(), true, now()), None);
        assert_eq!(session.phase(), SessionPhase::ModeSelection);
    }

    #[test]
    fn second_start_while_presenting_is_rejected() {
        let batch = words(2);
        let first = batch[0].id;
        let mut session = ReviewSession::new(ReviewConfig::default());

        session.start(ReviewMode::ContinueLast, batch.clone(), now());
        assert_eq!(
            session.start(ReviewMode::ReviewAll, batch, now()),
            StartOutcome::Rejected
        );
        assert_eq!(session.mode(), Some(ReviewMode::ContinueLast));
        assert_eq!(session.remaining(), 2);
        assert_eq!(front_id(&session), first);
    }

    #[test]
    fn empty_start_is_nothing_to_review() {
        let mut session = ReviewSession::new(ReviewConfig::default());
        assert_eq!(
            session.start(ReviewMode::ReviewAll, Vec::new(), now()),
            StartOutcome::NothingToReview
        );
        assert_eq!(session.phase(), SessionPhase::RoundComplete);
        assert!(!session.mode_selected());
        assert!(!session.offer_replay());

        // A new start is accepted right away.
        assert_eq!(
            session.start(ReviewMode::ReviewAll, words(1), now()),
            StartOutcome::Started { queued: 1 }
        );
    }

    #[test]
    fn empty_continue_last_does_not_offer_replay() {
        let sheet = Uuid::new_v4();
        let mut batch = words(2);
        batch[0].sheet_id = Some(sheet);
        let (inside, outside) = (batch[0].id, batch[1].id);
        let mut session = ReviewSession::new(ReviewConfig::default());

        session.start(ReviewMode::ContinueLast, batch, now());
        session.submit_verdict(inside, true, now()).unwrap();
        session.submit_verdict(outside, false, now()).unwrap();
        assert!(session.is_forgotten(outside));

        // The sheet holds only a learned word, so nothing is queued.
        session.set_scope(Scope::Sheet(sheet));
        let snapshot = session.words().to_vec();
        assert_eq!(
            session.start(ReviewMode::ContinueLast, snapshot, now()),
            StartOutcome::NothingToReview
        );
        assert_eq!(session.phase(), SessionPhase::RoundComplete);
        assert_eq!(session.forgotten_count(), 0);
        assert!(!session.offer_replay());
    }

    #[test]
    fn fresh_review_all_clears_forgotten() {
        let batch = words(1);
        let id = batch[0].id;
        let mut session = ReviewSession::new(ReviewConfig::default());
        session.start(ReviewMode::ContinueLast, batch, now());
        session.submit_verdict(id, false, now()).unwrap();
        assert!(session.offer_replay());

        let snapshot = session.words().to_vec();
        session.start(ReviewMode::ReviewAll, snapshot, now());
        assert_eq!(session.forgotten_count(), 0);
    }

    #[test]
    fn replay_outside_scope_returns_to_mode_selection() {
        let sheet = Uuid::new_v4();
        let mut batch = words(2);
        batch[0].sheet_id = Some(sheet);
        let outside = batch[1].id;
        let mut session = ReviewSession::new(ReviewConfig::default());

        session.start(ReviewMode::ContinueLast, batch, now());
        session.submit_verdict(front_id(&session), true, now()).unwrap();
        session.submit_verdict(outside, false, now()).unwrap();
        assert!(session.offer_replay());

        session.set_scope(Scope::Sheet(sheet));
        assert_eq!(session.replay_forgotten(), StartOutcome::NothingToReview);
        assert_eq!(session.phase(), SessionPhase::ModeSelection);
        assert_eq!(session.mode(), None);
        assert_eq!(session.forgotten_count(), 0);
    }

    #[test]
    fn replay_requires_a_completed_round() {
        let mut session = ReviewSession::new(ReviewConfig::default());
        assert_eq!(session.replay_forgotten(), StartOutcome::Rejected);

        session.start(ReviewMode::ContinueLast, words(2), now());
        assert_eq!(session.replay_forgotten(), StartOutcome::Rejected);
        assert_eq!(session.remaining(), 2);
    }

    #[test]
    fn reset_clears_the_session() {
        let batch = words(2);
        let first = batch[0].id;
        let sheet = Scope::Words(batch.iter().map(|w| w.id).collect());
        let mut session = ReviewSession::new(ReviewConfig::default());
        session.set_scope(sheet.clone());
        session.start(ReviewMode::ContinueLast, batch, now());
        session.submit_verdict(first, false, now()).unwrap();

        session.reset();
        assert_eq!(session.present_current(), None);
        assert_eq!(session.mode(), None);
        assert_eq!(session.phase(), SessionPhase::ModeSelection);
        assert_eq!(session.forgotten_count(), 0);
        assert_eq!(session.remaining(), 0);
        assert_eq!(session.scope(), &sheet);
    }

    #[test]
    fn duplicate_ids_in_snapshot_are_queued_once() {
        let batch = words(1);
        let doubled = vec![batch[0].clone(), batch[0].clone()];
        let mut session = ReviewSession::new(ReviewConfig::default());
        assert_eq!(
            session.start(ReviewMode::ReviewAll, doubled, now()),
            StartOutcome::Started { queued: 1 }
        );
    }
}
