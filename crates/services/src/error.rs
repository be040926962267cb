//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use quiz_core::bank::BankError;
use quiz_core::model::{AnswerKey, Phase, QuizStateError};
use storage::sqlite::SqliteInitError;

/// Progression engine operations, used to label rejected transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    SubmitAnswer,
    Continue,
    AcknowledgeLevelComplete,
    TimeExpired,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Start => "start",
            Operation::SubmitAnswer => "submit_answer",
            Operation::Continue => "continue",
            Operation::AcknowledgeLevelComplete => "acknowledge_level_complete",
            Operation::TimeExpired => "time_expired",
        })
    }
}

/// A transition the engine refused. State is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("{op} is not allowed while {phase}")]
    WrongPhase { op: Operation, phase: Phase },
    #[error("{op} is not allowed while feedback is pending")]
    FeedbackPending { op: Operation },
    #[error("{op} requires an answer to have been recorded")]
    NoFeedbackPending { op: Operation },
    #[error("time has not run out ({remaining}s left)")]
    TimeRemaining { remaining: u32 },
    #[error("no sampled question at {0}")]
    MissingQuestion(AnswerKey),
    #[error(transparent)]
    State(#[from] QuizStateError),
}

/// Errors when a persisted session does not fit the freshly drawn sample.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RestoreError {
    #[error("position {key} is outside the {available} sampled questions")]
    PositionOutOfRange { key: AnswerKey, available: usize },
}

/// Errors emitted while loading a question catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("cannot read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Bank(#[from] BankError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
