use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerKey, AnswerOutcome, HighScore, Phase, PlaythroughId, QuizState, QuizStateError, QuizStateParts, Tier,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Storage key of the resumable session.
pub const QUIZ_STATE_KEY: &str = "quizState";
/// Storage key of the high score slot.
pub const HIGH_SCORE_KEY: &str = "highScore";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One answer log entry in persisted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub tier: Tier,
    pub index: usize,
    pub correct: bool,
    /// Absent in records written before expiries were tracked.
    #[serde(default)]
    pub timed_out: bool,
}

/// Persisted shape of a session.
///
/// Sampled question content is not part of the record; it is drawn again on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStateRecord {
    pub playthrough_id: Uuid,
    pub current_tier: Tier,
    pub current_question_index: usize,
    pub score: u32,
    pub answer_log: Vec<AnswerEntry>,
    pub phase: Phase,
    pub time_remaining: u32,
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

impl QuizStateRecord {
    #[must_use]
    pub fn from_state(state: &QuizState, saved_at: DateTime<Utc>) -> Self {
        Self {
            playthrough_id: state.playthrough_id().value(),
            current_tier: state.tier(),
            current_question_index: state.question_index(),
            score: state.score(),
            answer_log: state
                .answer_log()
                .iter()
                .map(|(key, outcome)| AnswerEntry {
                    tier: key.tier,
                    index: key.index,
                    correct: outcome.correct,
                    timed_out: outcome.timed_out,
                })
                .collect(),
            phase: state.phase(),
            time_remaining: state.time_remaining(),
            revision: state.revision(),
            saved_at,
        }
    }

    /// Convert the record back into a domain `QuizState`.
    ///
    /// # Errors
    ///
    /// Returns `QuizStateError` if the record is internally inconsistent.
    pub fn into_state(self, time_limit: u32) -> Result<QuizState, QuizStateError> {
        QuizState::from_persisted(
            QuizStateParts {
                playthrough_id: PlaythroughId::from_uuid(self.playthrough_id),
                tier: self.current_tier,
                question_index: self.current_question_index,
                score: self.score,
                answers: self
                    .answer_log
                    .into_iter()
                    .map(|e| {
                        let outcome = AnswerOutcome {
                            correct: e.correct,
                            timed_out: e.timed_out,
                        };
                        (AnswerKey::new(e.tier, e.index), outcome)
                    })
                    .collect(),
                phase: self.phase,
                time_remaining: self.time_remaining,
                revision: self.revision,
            },
            time_limit,
        )
    }

    /// Encode as the JSON value stored under [`QUIZ_STATE_KEY`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if `raw` is not a valid record.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for the resumable session slot.
#[async_trait]
pub trait QuizStateRepository: Send + Sync {
    /// Fetch the saved session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored value cannot be decoded,
    /// or other storage errors.
    async fn load_state(&self) -> Result<Option<QuizStateRecord>, StorageError>;

    /// Store the session. A record older than the stored one (lower revision) is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_state(&self, record: &QuizStateRecord) -> Result<(), StorageError>;

    /// Remove the saved session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be cleared.
    async fn clear_state(&self) -> Result<(), StorageError>;
}

/// Repository contract for the durable high score.
#[async_trait]
pub trait HighScoreRepository: Send + Sync {
    /// Fetch the stored high score; `None` when never written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn get_high_score(&self) -> Result<Option<HighScore>, StorageError>;

    /// Raise the stored high score to `score`. Lower values leave it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn raise_high_score(&self, score: HighScore) -> Result<(), StorageError>;
}

/// Simple in-memory key-value repository for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw value, bypassing encoding. Useful to simulate corrupt storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.into());
        Ok(())
    }

    /// Read a raw value as stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }
}

#[async_trait]
impl QuizStateRepository for InMemoryRepository {
    async fn load_state(&self) -> Result<Option<QuizStateRecord>, StorageError> {
        self.get_raw(QUIZ_STATE_KEY)?
            .map(|raw| QuizStateRecord::from_json(&raw))
            .transpose()
    }

    async fn save_state(&self, record: &QuizStateRecord) -> Result<(), StorageError> {
        let encoded = record.to_json()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let stale = guard
            .get(QUIZ_STATE_KEY)
            .and_then(|raw| QuizStateRecord::from_json(raw).ok())
            .is_some_and(|stored| stored.revision > record.revision);
        if !stale {
            guard.insert(QUIZ_STATE_KEY.to_owned(), encoded);
        }
        Ok(())
    }

    async fn clear_state(&self) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(QUIZ_STATE_KEY);
        Ok(())
    }
}

#[async_trait]
impl HighScoreRepository for InMemoryRepository {
    async fn get_high_score(&self) -> Result<Option<HighScore>, StorageError> {
        self.get_raw(HIGH_SCORE_KEY)?
            .map(|raw| parse_high_score(&raw))
            .transpose()
    }

    async fn raise_high_score(&self, score: HighScore) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let current = guard
            .get(HIGH_SCORE_KEY)
            .and_then(|raw| parse_high_score(raw).ok())
            .unwrap_or_default();
        if score > current {
            guard.insert(HIGH_SCORE_KEY.to_owned(), score.value().to_string());
        }
        Ok(())
    }
}

pub(crate) fn parse_high_score(raw: &str) -> Result<HighScore, StorageError> {
    raw.trim()
        .parse::<u32>()
        .map(HighScore::new)
        .map_err(|e| StorageError::Serialization(format!("invalid high score {raw:?}: {e}")))
}

/// Aggregates the persistence slots behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quiz_states: Arc<dyn QuizStateRepository>,
    pub high_scores: Arc<dyn HighScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for inspection.
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let quiz_states: Arc<dyn QuizStateRepository> = Arc::new(repo.clone());
        let high_scores: Arc<dyn HighScoreRepository> = Arc::new(repo);
        Self {
            quiz_states,
            high_scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn in_progress_state() -> QuizState {
        let mut state = QuizState::not_started(30);
        state.restart(30);
        state.record_answer(true).unwrap();
        state.advance_question(30);
        state.tick();
        state
    }

    #[tokio::test]
    async fn round_trips_session_through_json() {
        let repo = InMemoryRepository::new();
        let state = in_progress_state();
        repo.save_state(&QuizStateRecord::from_state(&state, fixed_now()))
            .await
            .unwrap();

        let loaded = repo.load_state().await.unwrap().expect("saved");
        assert_eq!(loaded.answer_log.len(), 1);
        assert_eq!(loaded.into_state(30).unwrap(), state);
    }

    #[tokio::test]
    async fn keeps_the_timeout_flag() {
        let repo = InMemoryRepository::new();
        let mut state = QuizState::not_started(30);
        state.restart(30);
        for _ in 0..30 {
            state.tick();
        }
        state.record_expiry().unwrap();
        repo.save_state(&QuizStateRecord::from_state(&state, fixed_now()))
            .await
            .unwrap();

        let loaded = repo.load_state().await.unwrap().expect("saved");
        assert!(loaded.answer_log[0].timed_out);
        let restored = loaded.into_state(30).unwrap();
        assert_eq!(restored.current_outcome(), Some(AnswerOutcome::expired()));
    }

    #[test]
    fn entries_without_a_timeout_flag_read_as_answered() {
        let entry: AnswerEntry =
            serde_json::from_str(r#"{"tier":"easy","index":0,"correct":false}"#).unwrap();
        assert!(!entry.timed_out);
    }

    #[tokio::test]
    async fn ignores_stale_revisions() {
        let repo = InMemoryRepository::new();
        let mut state = in_progress_state();
        let older = QuizStateRecord::from_state(&state, fixed_now());
        state.tick();
        let newer = QuizStateRecord::from_state(&state, fixed_now());

        repo.save_state(&newer).await.unwrap();
        repo.save_state(&older).await.unwrap();

        let loaded = repo.load_state().await.unwrap().unwrap();
        assert_eq!(loaded.revision, newer.revision);
    }

    #[tokio::test]
    async fn corrupt_value_is_a_serialization_error() {
        let repo = InMemoryRepository::new();
        repo.put_raw(QUIZ_STATE_KEY, "{not json").unwrap();
        assert!(matches!(
            repo.load_state().await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn high_score_only_goes_up() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_high_score().await.unwrap(), None);
        repo.raise_high_score(HighScore::new(90)).await.unwrap();
        repo.raise_high_score(HighScore::new(40)).await.unwrap();
        assert_eq!(repo.get_high_score().await.unwrap(), Some(HighScore::new(90)));
    }

    #[tokio::test]
    async fn clear_removes_session_but_not_high_score() {
        let repo = InMemoryRepository::new();
        repo.save_state(&QuizStateRecord::from_state(&in_progress_state(), fixed_now()))
            .await
            .unwrap();
        repo.raise_high_score(HighScore::new(10)).await.unwrap();
        repo.clear_state().await.unwrap();
        assert!(repo.load_state().await.unwrap().is_none());
        assert_eq!(repo.get_high_score().await.unwrap(), Some(HighScore::new(10)));
    }
}
