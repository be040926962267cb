//! Quiz progression: sampling, the transition engine, the countdown and the
//! session workflow that ties them to persistence.

pub mod engine;
pub mod persistence;
pub mod sampler;
pub mod timer;
pub mod view;
pub mod workflow;

pub use engine::{AnswerFeedback, Advance, GameOver, QuizEngine, TickOutcome};
pub use persistence::QuizPersistence;
pub use sampler::{QuestionSampler, SampledQuestions};
pub use timer::{Countdown, TickControl};
pub use view::{QuizProgress, QuizSnapshot};
pub use workflow::QuizLoopService;
