#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, CatalogError, Operation, RestoreError, TransitionError};
pub use quiz::{
    AnswerFeedback, Advance, GameOver, QuizEngine, QuizLoopService, QuizPersistence,
    QuizProgress, QuizSnapshot, TickOutcome,
};
