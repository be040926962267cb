use std::fmt;
use std::sync::Arc;

use quiz_core::QuestionBank;
use quiz_core::model::{
    AnswerKey, HighScore, Phase, PlaythroughId, Question, QuizRules, QuizState, Tier,
};

use super::sampler::{QuestionSampler, SampledQuestions};
use super::view::{QuizProgress, QuizSnapshot};
use crate::error::{Operation, RestoreError, TransitionError};

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of answering the current question, shown before the player continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub key: AnswerKey,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub correct_answer: String,
    pub timed_out: bool,
}

/// How a playthrough ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOver {
    /// Tier the player was on when the game ended.
    pub reached: Tier,
    pub final_score: u32,
    pub cleared_all_tiers: bool,
    pub high_score: HighScore,
    pub new_high_score: bool,
}

/// Where `continue` moved the playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextQuestion { key: AnswerKey },
    LevelComplete { cleared: Tier, next: Tier, correct: usize },
    GameOver(GameOver),
}

/// Result of delivering one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ticked { remaining: u32 },
    Expired(AnswerFeedback),
    /// Stale or suspended countdown; nothing changed.
    Ignored,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// The quiz progression state machine.
///
/// All transitions are synchronous. A rejected transition returns
/// `TransitionError` and leaves the engine exactly as it was.
pub struct QuizEngine {
    rules: QuizRules,
    bank: Arc<dyn QuestionBank>,
    sampler: QuestionSampler,
    questions: SampledQuestions,
    state: QuizState,
    feedback: Option<AnswerFeedback>,
    high_score: HighScore,
    unsaved_high_score: Option<HighScore>,
    countdown_epoch: u64,
}

impl QuizEngine {
    /// A `not-started` engine with questions already drawn.
    #[must_use]
    pub fn new(rules: QuizRules, bank: Arc<dyn QuestionBank>, high_score: HighScore) -> Self {
        let sampler = QuestionSampler::new(rules.questions_per_tier());
        let questions = sampler.sample_all(bank.as_ref());
        Self {
            state: QuizState::not_started(rules.time_limit_secs()),
            rules,
            bank,
            sampler,
            questions,
            feedback: None,
            high_score,
            unsaved_high_score: None,
            countdown_epoch: 0,
        }
    }

    /// Resume a persisted session against a fresh sample.
    ///
    /// If the current position already has a logged answer while in progress,
    /// the player was looking at feedback when the session was saved, so the
    /// feedback is pending again.
    ///
    /// # Errors
    ///
    /// Returns `RestoreError::PositionOutOfRange` when the session points past
    /// the questions drawn for its tiers.
    pub fn restore(
        rules: QuizRules,
        bank: Arc<dyn QuestionBank>,
        high_score: HighScore,
        state: QuizState,
    ) -> Result<Self, RestoreError> {
        let mut engine = Self::new(rules, bank, high_score);

        if state.phase() != Phase::NotStarted {
            let logged = state.answer_log().iter().map(|(key, _)| key);
            for key in logged.chain(std::iter::once(state.current_key())) {
                let available = engine.questions.len(key.tier);
                if key.index >= available {
                    return Err(RestoreError::PositionOutOfRange { key, available });
                }
            }
        }

        if state.phase() == Phase::InProgress {
            if let Some(outcome) = state.current_outcome() {
                let key = state.current_key();
                engine.feedback = engine.questions.get(key).map(|q| AnswerFeedback {
                    key,
                    is_correct: outcome.correct,
                    points_awarded: if outcome.correct { key.tier.points() } else { 0 },
                    correct_answer: q.correct_answer().to_owned(),
                    timed_out: outcome.timed_out,
                });
            }
        }

        engine.state = state;
        Ok(engine)
    }

    #[must_use]
    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&AnswerFeedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn high_score(&self) -> HighScore {
        self.high_score
    }

    #[must_use]
    pub fn questions(&self) -> &SampledQuestions {
        &self.questions
    }

    /// The question at the current position, if one was drawn.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.state.current_key())
    }

    /// Identifies the countdown that may currently deliver ticks.
    ///
    /// Changes on every accepted transition, so ticks from an older countdown
    /// are recognised as stale.
    #[must_use]
    pub fn countdown_epoch(&self) -> u64 {
        self.countdown_epoch
    }

    /// True while the player is looking at an unanswered question with time left.
    #[must_use]
    pub fn timer_should_run(&self) -> bool {
        self.is_answering() && self.state.time_remaining() > 0
    }

    /// True when the clock already ran out but the expiry was never applied.
    #[must_use]
    pub fn needs_expiry(&self) -> bool {
        self.is_answering() && self.state.time_remaining() == 0
    }

    /// Game ended after passing the hardest tier.
    #[must_use]
    pub fn cleared_all_tiers(&self) -> bool {
        self.state.phase() == Phase::GameOver
            && self.state.tier().is_hardest()
            && self.state.correct_in_current_tier() >= self.rules.required_correct()
    }

    /// Hand out a high score raised since the last call, for persistence.
    pub fn take_unsaved_high_score(&mut self) -> Option<HighScore> {
        self.unsaved_high_score.take()
    }

    /// Begin a new playthrough from any phase, drawing fresh questions.
    pub fn start(&mut self) -> PlaythroughId {
        self.questions = self.sampler.sample_all(self.bank.as_ref());
        self.feedback = None;
        self.state.restart(self.rules.time_limit_secs());
        self.bump_epoch();
        self.state.playthrough_id()
    }

    /// Grade `raw` against the current question and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` unless the game is in progress with no
    /// feedback pending.
    pub fn submit_answer(&mut self, raw: &str) -> Result<AnswerFeedback, TransitionError> {
        self.answer(Operation::SubmitAnswer, raw, false)
    }

    /// The clock ran out: grade an empty answer.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::TimeRemaining` while time is left, or the same
    /// errors as [`submit_answer`](Self::submit_answer).
    pub fn time_expired(&mut self) -> Result<AnswerFeedback, TransitionError> {
        self.ensure_answering(Operation::TimeExpired)?;
        let remaining = self.state.time_remaining();
        if remaining > 0 {
            return Err(TransitionError::TimeRemaining { remaining });
        }
        self.answer(Operation::TimeExpired, "", true)
    }

    /// Leave the feedback screen: next question, next tier, or game over.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` unless an answer was just recorded.
    pub fn continue_quiz(&mut self) -> Result<Advance, TransitionError> {
        let op = Operation::Continue;
        self.ensure_phase(op, Phase::InProgress)?;
        if self.feedback.is_none() {
            return Err(TransitionError::NoFeedbackPending { op });
        }

        self.feedback = None;
        self.bump_epoch();

        let tier = self.state.tier();
        let limit = self.rules.time_limit_secs();
        if self.state.question_index() + 1 < self.questions.len(tier) {
            self.state.advance_question(limit);
            return Ok(Advance::NextQuestion {
                key: self.state.current_key(),
            });
        }

        let correct = self.state.correct_in_current_tier();
        if correct < self.rules.required_correct() {
            return Ok(Advance::GameOver(self.finish(false)));
        }
        match self.state.advance_tier(limit) {
            Some(next) => Ok(Advance::LevelComplete {
                cleared: tier,
                next,
                correct,
            }),
            None => Ok(Advance::GameOver(self.finish(true))),
        }
    }

    /// Leave the level-complete screen and start the next tier.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::WrongPhase` outside `level-complete`.
    pub fn acknowledge_level_complete(&mut self) -> Result<(), TransitionError> {
        self.ensure_phase(Operation::AcknowledgeLevelComplete, Phase::LevelComplete)?;
        self.state.resume_level();
        self.bump_epoch();
        Ok(())
    }

    /// Deliver one countdown tick from the countdown identified by `epoch`.
    ///
    /// Reaching zero applies [`time_expired`](Self::time_expired) in the same step.
    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        if epoch != self.countdown_epoch || !self.timer_should_run() {
            return TickOutcome::Ignored;
        }
        let remaining = self.state.tick();
        if remaining > 0 {
            return TickOutcome::Ticked { remaining };
        }
        match self.time_expired() {
            Ok(feedback) => TickOutcome::Expired(feedback),
            Err(_) => TickOutcome::Ignored,
        }
    }

    /// Render-ready view of the engine.
    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        let tier = self.state.tier();
        QuizSnapshot {
            state: self.state.clone(),
            question: self.current_question().cloned(),
            progress: QuizProgress::new(tier, self.state.question_index(), self.questions.len(tier)),
            feedback: self.feedback.clone(),
            high_score: self.high_score,
            cleared_all_tiers: self.cleared_all_tiers(),
        }
    }

    fn answer(
        &mut self,
        op: Operation,
        raw: &str,
        timed_out: bool,
    ) -> Result<AnswerFeedback, TransitionError> {
        self.ensure_answering(op)?;
        let key = self.state.current_key();
        let question = self
            .questions
            .get(key)
            .ok_or(TransitionError::MissingQuestion(key))?;
        let is_correct = !timed_out && question.is_correct(raw);
        let correct_answer = question.correct_answer().to_owned();

        let points_awarded = if timed_out {
            self.state.record_expiry()?
        } else {
            self.state.record_answer(is_correct)?
        };
        let feedback = AnswerFeedback {
            key,
            is_correct,
            points_awarded,
            correct_answer,
            timed_out,
        };
        self.feedback = Some(feedback.clone());
        self.bump_epoch();
        Ok(feedback)
    }

    fn finish(&mut self, cleared_all_tiers: bool) -> GameOver {
        let final_score = self.state.score();
        let raised = self.high_score.raised_by(final_score);
        if let Some(raised) = raised {
            self.high_score = raised;
            self.unsaved_high_score = Some(raised);
        }
        self.state.finish();
        GameOver {
            reached: self.state.tier(),
            final_score,
            cleared_all_tiers,
            high_score: self.high_score,
            new_high_score: raised.is_some(),
        }
    }

    fn is_answering(&self) -> bool {
        self.state.phase() == Phase::InProgress && self.feedback.is_none()
    }

    fn ensure_phase(&self, op: Operation, expected: Phase) -> Result<(), TransitionError> {
        let phase = self.state.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(TransitionError::WrongPhase { op, phase })
        }
    }

    fn ensure_answering(&self, op: Operation) -> Result<(), TransitionError> {
        self.ensure_phase(op, Phase::InProgress)?;
        if self.feedback.is_some() {
            return Err(TransitionError::FeedbackPending { op });
        }
        Ok(())
    }

    fn bump_epoch(&mut self) {
        self.countdown_epoch = self.countdown_epoch.wrapping_add(1);
    }
}

impl fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizEngine")
            .field("state", &self.state)
            .field("feedback", &self.feedback)
            .field("high_score", &self.high_score)
            .field("countdown_epoch", &self.countdown_epoch)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
