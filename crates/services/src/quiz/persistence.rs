use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use quiz_core::Clock;
use quiz_core::model::{HighScore, Phase, QuizState};
use storage::repository::{
    HighScoreRepository, QuizStateRecord, QuizStateRepository, Storage, StorageError,
};

enum WriteCommand {
    Save(Box<QuizStateRecord>),
    Clear,
    Flush(oneshot::Sender<()>),
}

/// Session and high score persistence for the quiz loop.
///
/// Session writes are fire-and-forget: they are queued to a single writer task
/// and applied in submission order, so a slow write never blocks gameplay and
/// never lands after a newer one. Failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct QuizPersistence {
    clock: Clock,
    states: Arc<dyn QuizStateRepository>,
    high_scores: Arc<dyn HighScoreRepository>,
    writer: mpsc::UnboundedSender<WriteCommand>,
}

impl QuizPersistence {
    /// Must be called from within a tokio runtime; spawns the writer task.
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        let (writer, commands) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&storage.quiz_states), commands));
        Self {
            clock,
            states: Arc::clone(&storage.quiz_states),
            high_scores: Arc::clone(&storage.high_scores),
            writer,
        }
    }

    /// Load the saved session.
    ///
    /// Missing, undecodable or inconsistent sessions all come back as `None`
    /// so the caller starts from `not-started`.
    pub async fn load(&self, time_limit: u32) -> Option<QuizState> {
        let record = match self.states.load_state().await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "discarding unreadable saved session");
                return None;
            }
        };
        match record.into_state(time_limit) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(error = %err, "discarding inconsistent saved session");
                None
            }
        }
    }

    /// Queue a snapshot of `state`. `not-started` is never persisted.
    pub fn save(&self, state: &QuizState) {
        if state.phase() == Phase::NotStarted {
            return;
        }
        let record = QuizStateRecord::from_state(state, self.clock.now());
        self.send(WriteCommand::Save(Box::new(record)));
    }

    /// Queue removal of the saved session.
    pub fn clear(&self) {
        self.send(WriteCommand::Clear);
    }

    /// Wait until every queued write has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(WriteCommand::Flush(done));
        let _ = wait.await;
    }

    /// Stored high score, or zero when absent or unreadable.
    pub async fn load_high_score(&self) -> HighScore {
        match self.high_scores.get_high_score().await {
            Ok(score) => score.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "high score unreadable, starting from 0");
                HighScore::default()
            }
        }
    }

    /// Persist a raised high score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    pub async fn record_high_score(&self, score: HighScore) -> Result<(), StorageError> {
        self.high_scores.raise_high_score(score).await
    }

    fn send(&self, command: WriteCommand) {
        if self.writer.send(command).is_err() {
            warn!("session writer stopped; dropping write");
        }
    }
}

async fn run_writer(
    states: Arc<dyn QuizStateRepository>,
    mut commands: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriteCommand::Save(record) => {
                let revision = record.revision;
                if let Err(err) = states.save_state(&record).await {
                    warn!(error = %err, revision, "failed to save session");
                } else {
                    debug!(revision, "session saved");
                }
            }
            WriteCommand::Clear => {
                if let Err(err) = states.clear_state().await {
                    warn!(error = %err, "failed to clear saved session");
                }
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::repository::{HIGH_SCORE_KEY, InMemoryRepository, QUIZ_STATE_KEY};

    fn persistence() -> (InMemoryRepository, QuizPersistence) {
        let repo = InMemoryRepository::new();
        let storage = Storage::from_in_memory(repo.clone());
        (repo, QuizPersistence::new(fixed_clock(), &storage))
    }

    fn started() -> QuizState {
        let mut state = QuizState::not_started(30);
        state.restart(30);
        state
    }

    #[tokio::test]
    async fn saves_apply_in_order() {
        let (_repo, persistence) = persistence();
        let mut state = started();
        persistence.save(&state);
        state.record_answer(true).unwrap();
        persistence.save(&state);
        persistence.flush().await;

        assert_eq!(persistence.load(30).await, Some(state));
    }

    #[tokio::test]
    async fn not_started_is_never_written() {
        let (repo, persistence) = persistence();
        persistence.save(&QuizState::not_started(30));
        persistence.flush().await;
        assert_eq!(repo.get_raw(QUIZ_STATE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn clear_after_save_leaves_nothing() {
        let (_repo, persistence) = persistence();
        persistence.save(&started());
        persistence.clear();
        persistence.flush().await;
        assert_eq!(persistence.load(30).await, None);
    }

    #[tokio::test]
    async fn corrupt_values_load_as_absent() {
        let (repo, persistence) = persistence();
        repo.put_raw(QUIZ_STATE_KEY, "{not json").unwrap();
        repo.put_raw(HIGH_SCORE_KEY, "lots").unwrap();

        assert_eq!(persistence.load(30).await, None);
        assert_eq!(persistence.load_high_score().await, HighScore::default());
    }

    #[tokio::test]
    async fn shorter_time_limit_invalidates_saved_clock() {
        let (_repo, persistence) = persistence();
        persistence.save(&started());
        persistence.flush().await;
        assert_eq!(persistence.load(10).await, None);
    }

    #[tokio::test]
    async fn high_score_only_rises() {
        let (_repo, persistence) = persistence();
        persistence.record_high_score(HighScore::new(40)).await.unwrap();
        persistence.record_high_score(HighScore::new(20)).await.unwrap();
        assert_eq!(persistence.load_high_score().await, HighScore::new(40));
    }
}
