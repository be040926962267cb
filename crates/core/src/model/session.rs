use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::ids::PlaythroughId;
use crate::model::tier::Tier;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizStateError {
    #[error("time remaining {remaining}s exceeds the {limit}s limit")]
    TimeOutOfRange { remaining: u32, limit: u32 },

    #[error("answer for {0} recorded twice")]
    DuplicateAnswer(AnswerKey),

    #[error("answer for {0} is ahead of the current position")]
    AnswerAheadOfPosition(AnswerKey),

    #[error("score {score} does not match logged answers ({expected})")]
    ScoreMismatch { score: u32, expected: u32 },

    #[error("a session that has not started cannot carry progress")]
    NotStartedWithProgress,

    #[error("answer for {0} is marked both correct and timed out")]
    CorrectAfterTimeout(AnswerKey),
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// State-machine status of a playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    NotStarted,
    InProgress,
    LevelComplete,
    GameOver,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::NotStarted => "not-started",
            Phase::InProgress => "in-progress",
            Phase::LevelComplete => "level-complete",
            Phase::GameOver => "game-over",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ANSWER LOG ────────────────────────────────────────────────────────────────
//

/// Position of a question within a playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnswerKey {
    pub tier: Tier,
    pub index: usize,
}

impl AnswerKey {
    #[must_use]
    pub fn new(tier: Tier, index: usize) -> Self {
        Self { tier, index }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tier, self.index)
    }
}

/// How one position was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// The clock ran out before the player answered.
    pub timed_out: bool,
}

impl AnswerOutcome {
    #[must_use]
    pub fn answered(correct: bool) -> Self {
        Self {
            correct,
            timed_out: false,
        }
    }

    #[must_use]
    pub fn expired() -> Self {
        Self {
            correct: false,
            timed_out: true,
        }
    }
}

/// Append-only record of answer outcomes per position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerLog {
    entries: BTreeMap<AnswerKey, AnswerOutcome>,
}

impl AnswerLog {
    /// Record an outcome.
    ///
    /// # Errors
    ///
    /// Returns `QuizStateError::DuplicateAnswer` if the position already has an entry.
    pub fn record(&mut self, key: AnswerKey, outcome: AnswerOutcome) -> Result<(), QuizStateError> {
        if self.entries.contains_key(&key) {
            return Err(QuizStateError::DuplicateAnswer(key));
        }
        self.entries.insert(key, outcome);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: AnswerKey) -> Option<AnswerOutcome> {
        self.entries.get(&key).copied()
    }

    /// Number of correct answers logged for `tier`.
    #[must_use]
    pub fn correct_in(&self, tier: Tier) -> usize {
        self.entries
            .iter()
            .filter(|(key, outcome)| key.tier == tier && outcome.correct)
            .count()
    }

    /// Entries in (tier, index) order.
    pub fn iter(&self) -> impl Iterator<Item = (AnswerKey, AnswerOutcome)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn expected_score(&self) -> u32 {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.correct)
            .map(|(key, _)| key.tier.points())
            .sum()
    }
}

//
// ─── QUIZ STATE ────────────────────────────────────────────────────────────────
//

/// Raw parts of a persisted session, checked by [`QuizState::from_persisted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizStateParts {
    pub playthrough_id: PlaythroughId,
    pub tier: Tier,
    pub question_index: usize,
    pub score: u32,
    pub answers: Vec<(AnswerKey, AnswerOutcome)>,
    pub phase: Phase,
    pub time_remaining: u32,
    pub revision: u64,
}

/// The mutable session aggregate.
///
/// Phase gating lives in the progression engine; the mutators here only keep
/// the data-level invariants: score grows by tier points, time only ticks down
/// or resets to the limit, and the answer log is append-only. Every mutation
/// bumps `revision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizState {
    playthrough_id: PlaythroughId,
    tier: Tier,
    question_index: usize,
    score: u32,
    answer_log: AnswerLog,
    phase: Phase,
    time_remaining: u32,
    revision: u64,
}

impl QuizState {
    /// A session nobody has started yet.
    #[must_use]
    pub fn not_started(time_limit: u32) -> Self {
        Self {
            playthrough_id: PlaythroughId::new_random(),
            tier: Tier::easiest(),
            question_index: 0,
            score: 0,
            answer_log: AnswerLog::default(),
            phase: Phase::NotStarted,
            time_remaining: time_limit,
            revision: 0,
        }
    }

    /// Rehydrate a session from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizStateError` when the parts are inconsistent: time above the
    /// limit, duplicate or out-of-order answers, a timed-out answer marked
    /// correct, a score that does not match the log, or progress on a session
    /// that never started.
    pub fn from_persisted(parts: QuizStateParts, time_limit: u32) -> Result<Self, QuizStateError> {
        if parts.time_remaining > time_limit {
            return Err(QuizStateError::TimeOutOfRange {
                remaining: parts.time_remaining,
                limit: time_limit,
            });
        }

        let mut answer_log = AnswerLog::default();
        for (key, outcome) in parts.answers {
            let ahead = key.tier > parts.tier
                || (key.tier == parts.tier && key.index > parts.question_index);
            if ahead {
                return Err(QuizStateError::AnswerAheadOfPosition(key));
            }
            if outcome.correct && outcome.timed_out {
                return Err(QuizStateError::CorrectAfterTimeout(key));
            }
            answer_log.record(key, outcome)?;
        }

        if parts.phase == Phase::NotStarted && (parts.score > 0 || !answer_log.is_empty()) {
            return Err(QuizStateError::NotStartedWithProgress);
        }

        let expected = answer_log.expected_score();
        if expected != parts.score {
            return Err(QuizStateError::ScoreMismatch {
                score: parts.score,
                expected,
            });
        }

        Ok(Self {
            playthrough_id: parts.playthrough_id,
            tier: parts.tier,
            question_index: parts.question_index,
            score: parts.score,
            answer_log,
            phase: parts.phase,
            time_remaining: parts.time_remaining,
            revision: parts.revision,
        })
    }

    #[must_use]
    pub fn playthrough_id(&self) -> PlaythroughId {
        self.playthrough_id
    }

    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn answer_log(&self) -> &AnswerLog {
        &self.answer_log
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Key of the question at the current position.
    #[must_use]
    pub fn current_key(&self) -> AnswerKey {
        AnswerKey::new(self.tier, self.question_index)
    }

    /// Logged outcome for the current position, if it was answered.
    #[must_use]
    pub fn current_outcome(&self) -> Option<AnswerOutcome> {
        self.answer_log.get(self.current_key())
    }

    /// Correct answers logged for the current tier.
    #[must_use]
    pub fn correct_in_current_tier(&self) -> usize {
        self.answer_log.correct_in(self.tier)
    }

    /// Begin a new playthrough in place: fresh id, empty log, easiest tier.
    pub fn restart(&mut self, time_limit: u32) {
        self.playthrough_id = PlaythroughId::new_random();
        self.tier = Tier::easiest();
        self.question_index = 0;
        self.score = 0;
        self.answer_log = AnswerLog::default();
        self.phase = Phase::InProgress;
        self.time_remaining = time_limit;
        self.bump();
    }

    /// Log the outcome for the current position and return the points awarded.
    ///
    /// # Errors
    ///
    /// Returns `QuizStateError::DuplicateAnswer` if the position was already answered.
    pub fn record_answer(&mut self, correct: bool) -> Result<u32, QuizStateError> {
        self.record(AnswerOutcome::answered(correct))
    }

    /// Log a timed-out, incorrect outcome for the current position.
    ///
    /// # Errors
    ///
    /// Returns `QuizStateError::DuplicateAnswer` if the position was already answered.
    pub fn record_expiry(&mut self) -> Result<u32, QuizStateError> {
        self.record(AnswerOutcome::expired())
    }

    fn record(&mut self, outcome: AnswerOutcome) -> Result<u32, QuizStateError> {
        self.answer_log.record(self.current_key(), outcome)?;
        let points = if outcome.correct { self.tier.points() } else { 0 };
        self.score = self.score.saturating_add(points);
        self.bump();
        Ok(points)
    }

    /// Move to the next question of the same tier with a full clock.
    pub fn advance_question(&mut self, time_limit: u32) {
        self.question_index += 1;
        self.time_remaining = time_limit;
        self.bump();
    }

    /// Enter `level-complete` and move to the next harder tier.
    ///
    /// Returns the new tier, or `None` (and changes nothing) on the hardest tier.
    pub fn advance_tier(&mut self, time_limit: u32) -> Option<Tier> {
        let next = self.tier.next()?;
        self.tier = next;
        self.question_index = 0;
        self.time_remaining = time_limit;
        self.phase = Phase::LevelComplete;
        self.bump();
        Some(next)
    }

    /// `level-complete` back to `in-progress`.
    pub fn resume_level(&mut self) {
        self.phase = Phase::InProgress;
        self.bump();
    }

    pub fn finish(&mut self) {
        self.phase = Phase::GameOver;
        self.bump();
    }

    /// Take one second off the clock. Returns the time left.
    pub fn tick(&mut self) -> u32 {
        self.time_remaining = self.time_remaining.saturating_sub(1);
        self.bump();
        self.time_remaining
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> QuizStateParts {
        QuizStateParts {
            playthrough_id: PlaythroughId::new_random(),
            tier: Tier::Medium,
            question_index: 1,
            score: 30,
            answers: vec![
                (AnswerKey::new(Tier::Easy, 0), AnswerOutcome::answered(true)),
                (AnswerKey::new(Tier::Easy, 1), AnswerOutcome::expired()),
                (AnswerKey::new(Tier::Easy, 2), AnswerOutcome::answered(false)),
                (AnswerKey::new(Tier::Medium, 0), AnswerOutcome::answered(true)),
            ],
            phase: Phase::InProgress,
            time_remaining: 12,
            revision: 9,
        }
    }

    #[test]
    fn rehydrates_consistent_parts() {
        let state = QuizState::from_persisted(parts(), 30).unwrap();
        assert_eq!(state.tier(), Tier::Medium);
        assert_eq!(state.correct_in_current_tier(), 1);
        assert_eq!(state.answer_log().correct_in(Tier::Easy), 1);
        assert_eq!(state.current_outcome(), None);
        assert_eq!(state.revision(), 9);
    }

    #[test]
    fn rejects_score_that_does_not_match_log() {
        let mut bad = parts();
        bad.score = 40;
        let err = QuizState::from_persisted(bad, 30).unwrap_err();
        assert_eq!(
            err,
            QuizStateError::ScoreMismatch {
                score: 40,
                expected: 30
            }
        );
    }

    #[test]
    fn rejects_answers_past_the_cursor() {
        let mut bad = parts();
        bad.answers.push((AnswerKey::new(Tier::Hard, 0), AnswerOutcome::answered(false)));
        assert!(matches!(
            QuizState::from_persisted(bad, 30),
            Err(QuizStateError::AnswerAheadOfPosition(_))
        ));
    }

    #[test]
    fn rejects_correct_timeouts() {
        let mut bad = parts();
        bad.answers[1].1 = AnswerOutcome {
            correct: true,
            timed_out: true,
        };
        bad.score = 40;
        assert_eq!(
            QuizState::from_persisted(bad, 30),
            Err(QuizStateError::CorrectAfterTimeout(AnswerKey::new(Tier::Easy, 1)))
        );
    }

    #[test]
    fn expiry_scores_nothing_and_is_remembered() {
        let mut state = QuizState::not_started(30);
        state.restart(30);
        assert_eq!(state.record_expiry().unwrap(), 0);
        assert_eq!(state.current_outcome(), Some(AnswerOutcome::expired()));
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn rejects_time_above_limit() {
        let mut bad = parts();
        bad.time_remaining = 31;
        assert!(matches!(
            QuizState::from_persisted(bad, 30),
            Err(QuizStateError::TimeOutOfRange { .. })
        ));
    }

    #[test]
    fn answer_log_is_append_only() {
        let mut state = QuizState::not_started(30);
        state.restart(30);
        assert_eq!(state.record_answer(true).unwrap(), 10);
        assert_eq!(
            state.record_answer(false),
            Err(QuizStateError::DuplicateAnswer(AnswerKey::new(Tier::Easy, 0)))
        );
        assert_eq!(state.score(), 10);
    }

    #[test]
    fn tick_saturates_at_zero_and_reset_restores_limit() {
        let mut state = QuizState::not_started(2);
        state.restart(2);
        assert_eq!(state.tick(), 1);
        assert_eq!(state.tick(), 0);
        assert_eq!(state.tick(), 0);
        state.advance_question(2);
        assert_eq!(state.time_remaining(), 2);
        assert_eq!(state.question_index(), 1);
    }

    #[test]
    fn hardest_tier_has_no_successor() {
        let mut state = QuizState::not_started(30);
        state.restart(30);
        assert_eq!(state.advance_tier(30), Some(Tier::Medium));
        assert_eq!(state.phase(), Phase::LevelComplete);
        state.resume_level();
        assert_eq!(state.advance_tier(30), Some(Tier::Hard));
        state.resume_level();
        let before = state.revision();
        assert_eq!(state.advance_tier(30), None);
        assert_eq!(state.revision(), before);
        assert_eq!(state.phase(), Phase::InProgress);
    }
}
