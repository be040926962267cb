#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    HighScoreRepository, InMemoryRepository, QuizStateRecord, QuizStateRepository, Storage,
    StorageError,
};
