use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use quiz_core::QuestionBank;
use quiz_core::model::{HighScore, PlaythroughId, QuizRules};

use super::engine::{AnswerFeedback, Advance, QuizEngine, TickOutcome};
use super::persistence::QuizPersistence;
use super::timer::{Countdown, TickControl};
use super::view::QuizSnapshot;
use crate::error::{Operation, TransitionError};

struct Slot {
    engine: QuizEngine,
    countdown: Option<Countdown>,
}

struct Inner {
    slot: Mutex<Slot>,
    persistence: QuizPersistence,
    snapshots: watch::Sender<QuizSnapshot>,
}

/// Orchestrates a single quiz session: transitions, countdown and persistence.
///
/// Every operation runs under one session lock, so a countdown tick and a
/// player action never interleave. Accepted transitions publish a fresh
/// [`QuizSnapshot`] to subscribers and queue a session save.
#[derive(Clone)]
pub struct QuizLoopService {
    inner: Arc<Inner>,
}

impl QuizLoopService {
    /// Restore the saved session, or begin at `not-started` when there is none
    /// or it no longer fits.
    ///
    /// A session saved with the clock already at zero gets its expiry applied
    /// immediately.
    pub async fn resume(
        rules: QuizRules,
        bank: Arc<dyn QuestionBank>,
        persistence: QuizPersistence,
    ) -> Self {
        let high_score = persistence.load_high_score().await;
        let saved = persistence.load(rules.time_limit_secs()).await;

        let mut engine = match saved {
            Some(state) => {
                QuizEngine::restore(rules.clone(), Arc::clone(&bank), high_score, state)
                    .unwrap_or_else(|err| {
                        warn!(error = %err, "saved session does not fit the question bank");
                        QuizEngine::new(rules.clone(), Arc::clone(&bank), high_score)
                    })
            }
            None => QuizEngine::new(rules, bank, high_score),
        };
        debug!(phase = %engine.state().phase(), "session restored");

        if engine.needs_expiry() {
            if let Err(err) = engine.time_expired() {
                warn!(error = %err, "could not apply pending expiry");
            }
        }

        let (snapshots, _) = watch::channel(engine.snapshot());
        let inner = Arc::new(Inner {
            slot: Mutex::new(Slot {
                engine,
                countdown: None,
            }),
            persistence,
            snapshots,
        });
        {
            let mut slot = inner.slot.lock().await;
            inner.persistence.save(slot.engine.state());
            inner.sync_timer(&mut slot);
        }
        Self { inner }
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QuizSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn high_score(&self) -> HighScore {
        self.inner.snapshots.borrow().high_score
    }

    /// Begin a new playthrough, discarding any saved one.
    pub async fn start(&self) -> PlaythroughId {
        let mut slot = self.inner.slot.lock().await;
        self.inner.persistence.clear();
        let id = slot.engine.start();
        info!(op = %Operation::Start, playthrough = %id, "playthrough started");
        self.inner.commit(&mut slot).await;
        id
    }

    /// Grade the player's answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if no question is awaiting an answer.
    pub async fn submit_answer(&self, raw: &str) -> Result<AnswerFeedback, TransitionError> {
        self.apply(Operation::SubmitAnswer, |engine| engine.submit_answer(raw))
            .await
    }

    /// Move on from the answer feedback.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if no answer is pending acknowledgement.
    pub async fn continue_quiz(&self) -> Result<Advance, TransitionError> {
        let advance = self
            .apply(Operation::Continue, QuizEngine::continue_quiz)
            .await?;
        match advance {
            Advance::LevelComplete { cleared, next, correct } => {
                info!(%cleared, %next, correct, "level complete");
            }
            Advance::GameOver(over) => {
                info!(
                    score = over.final_score,
                    reached = %over.reached,
                    cleared_all_tiers = over.cleared_all_tiers,
                    new_high_score = over.new_high_score,
                    "game over"
                );
            }
            Advance::NextQuestion { .. } => {}
        }
        Ok(advance)
    }

    /// Leave the level-complete screen.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` outside `level-complete`.
    pub async fn acknowledge_level_complete(&self) -> Result<(), TransitionError> {
        self.apply(
            Operation::AcknowledgeLevelComplete,
            QuizEngine::acknowledge_level_complete,
        )
        .await
    }

    /// Apply an expiry reported from outside the built-in countdown.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::TimeRemaining` while time is left.
    pub async fn time_expired(&self) -> Result<AnswerFeedback, TransitionError> {
        self.apply(Operation::TimeExpired, QuizEngine::time_expired)
            .await
    }

    /// Stop the countdown and wait for queued saves.
    pub async fn shutdown(&self) {
        if let Some(countdown) = self.inner.slot.lock().await.countdown.take() {
            countdown.stop();
        }
        self.inner.persistence.flush().await;
    }

    async fn apply<T>(
        &self,
        op: Operation,
        transition: impl FnOnce(&mut QuizEngine) -> Result<T, TransitionError>,
    ) -> Result<T, TransitionError> {
        let mut slot = self.inner.slot.lock().await;
        match transition(&mut slot.engine) {
            Ok(value) => {
                self.inner.commit(&mut slot).await;
                Ok(value)
            }
            Err(err) => {
                warn!(%op, error = %err, "transition rejected");
                Err(err)
            }
        }
    }
}

impl Inner {
    /// Persist, publish and re-arm the countdown after an accepted transition.
    async fn commit(self: &Arc<Self>, slot: &mut Slot) {
        if let Some(score) = slot.engine.take_unsaved_high_score() {
            if let Err(err) = self.persistence.record_high_score(score).await {
                warn!(error = %err, %score, "failed to store high score");
            }
        }
        self.persistence.save(slot.engine.state());
        self.snapshots.send_replace(slot.engine.snapshot());
        self.sync_timer(slot);
    }

    fn sync_timer(self: &Arc<Self>, slot: &mut Slot) {
        if !slot.engine.timer_should_run() {
            if let Some(countdown) = slot.countdown.take() {
                countdown.stop();
            }
            return;
        }
        let epoch = slot.engine.countdown_epoch();
        if let Some(countdown) = slot.countdown.take() {
            if countdown.epoch() == epoch && !countdown.is_finished() {
                slot.countdown = Some(countdown);
                return;
            }
            countdown.stop();
        }

        let weak = Arc::downgrade(self);
        slot.countdown = Some(Countdown::spawn(
            epoch,
            slot.engine.rules().tick(),
            move |epoch| {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => inner.on_tick(epoch).await,
                        None => TickControl::Stop,
                    }
                }
            },
        ));
    }

    async fn on_tick(self: &Arc<Self>, epoch: u64) -> TickControl {
        let mut slot = self.slot.lock().await;
        match slot.engine.tick(epoch) {
            TickOutcome::Ignored => TickControl::Stop,
            TickOutcome::Ticked { remaining } => {
                self.persistence.save(slot.engine.state());
                self.snapshots.send_replace(slot.engine.snapshot());
                debug!(remaining, "tick");
                TickControl::Continue
            }
            TickOutcome::Expired(feedback) => {
                info!(question = %feedback.key, "time expired");
                self.commit(&mut slot).await;
                TickControl::Stop
            }
        }
    }
}
