mod high_score;
mod ids;
mod question;
mod rules;
mod session;
mod tier;

pub use high_score::HighScore;
pub use ids::PlaythroughId;
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind};
pub use rules::{QuizRules, RulesError};
pub use session::{
    AnswerKey, AnswerLog, AnswerOutcome, Phase, QuizState, QuizStateError, QuizStateParts,
};
pub use tier::Tier;
