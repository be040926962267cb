use serde::{Deserialize, Serialize};
use std::fmt;

/// Best final score across playthroughs. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HighScore(u32);

impl HighScore {
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the raised high score if `score` beats it, otherwise `None`.
    #[must_use]
    pub fn raised_by(self, score: u32) -> Option<Self> {
        (score > self.0).then_some(Self(score))
    }
}

impl fmt::Display for HighScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
