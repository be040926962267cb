use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RulesError {
    #[error("questions per tier must be > 0")]
    InvalidQuestionsPerTier,

    #[error("required correct answers must be between 1 and {max}")]
    InvalidRequiredCorrect { max: usize },

    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("tick interval must be > 0")]
    InvalidTick,
}

/// Tunables for a playthrough.
///
/// Points per tier are fixed by [`Tier::points`](crate::model::Tier::points) and are not
/// part of the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRules {
    questions_per_tier: usize,
    required_correct: usize,
    time_limit_secs: u32,
    tick: Duration,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            questions_per_tier: 3,
            required_correct: 2,
            time_limit_secs: 30,
            tick: Duration::from_secs(1),
        }
    }
}

impl QuizRules {
    /// Build a rule set.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if any value is zero or the pass threshold exceeds the
    /// number of questions sampled per tier.
    pub fn new(
        questions_per_tier: usize,
        required_correct: usize,
        time_limit_secs: u32,
        tick: Duration,
    ) -> Result<Self, RulesError> {
        if questions_per_tier == 0 {
            return Err(RulesError::InvalidQuestionsPerTier);
        }
        if required_correct == 0 || required_correct > questions_per_tier {
            return Err(RulesError::InvalidRequiredCorrect {
                max: questions_per_tier,
            });
        }
        if time_limit_secs == 0 {
            return Err(RulesError::InvalidTimeLimit);
        }
        if tick.is_zero() {
            return Err(RulesError::InvalidTick);
        }
        Ok(Self {
            questions_per_tier,
            required_correct,
            time_limit_secs,
            tick,
        })
    }

    /// Same rules with a different per-question time limit.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::InvalidTimeLimit` when `secs` is zero.
    pub fn with_time_limit(self, secs: u32) -> Result<Self, RulesError> {
        Self::new(self.questions_per_tier, self.required_correct, secs, self.tick)
    }

    #[must_use]
    pub fn questions_per_tier(&self) -> usize {
        self.questions_per_tier
    }

    #[must_use]
    pub fn required_correct(&self) -> usize {
        self.required_correct
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn tick(&self) -> Duration {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_game() {
        let rules = QuizRules::default();
        assert_eq!(rules.questions_per_tier(), 3);
        assert_eq!(rules.required_correct(), 2);
        assert_eq!(rules.time_limit_secs(), 30);
        assert_eq!(rules.tick(), Duration::from_secs(1));
    }

    #[test]
    fn threshold_cannot_exceed_sample_size() {
        let err = QuizRules::new(3, 4, 30, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, RulesError::InvalidRequiredCorrect { max: 3 });
    }

    #[test]
    fn zero_time_limit_is_rejected() {
        assert_eq!(
            QuizRules::default().with_time_limit(0),
            Err(RulesError::InvalidTimeLimit)
        );
    }
}
