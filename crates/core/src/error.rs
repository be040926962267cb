use thiserror::Error;

use crate::bank::BankError;
use crate::model::{QuestionError, QuizStateError, RulesError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    QuizState(#[from] QuizStateError),
    #[error(transparent)]
    Rules(#[from] RulesError),
}
