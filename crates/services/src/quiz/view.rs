use quiz_core::model::{HighScore, Question, QuizState, Tier};

use super::engine::AnswerFeedback;

/// Position within the current tier.
///
/// `percent` is the share of the tier already behind the player, so the first
/// question shows 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub tier: Tier,
    /// Zero-based index of the current question.
    pub answered: usize,
    pub total: usize,
    pub percent: u8,
}

impl QuizProgress {
    #[must_use]
    pub fn new(tier: Tier, index: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            u8::try_from(index.min(total) * 100 / total).unwrap_or(100)
        };
        Self {
            tier,
            answered: index,
            total,
            percent,
        }
    }

    /// One-based position for display, e.g. "Question 2 of 3".
    #[must_use]
    pub fn display_position(&self) -> usize {
        self.answered + 1
    }
}

/// Presentation-agnostic snapshot of the quiz.
///
/// This is **not** a UI view-model:
/// - no pre-formatted strings
/// - no countdown styling decisions
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSnapshot {
    pub state: QuizState,
    /// `None` only outside a playthrough's bounds.
    pub question: Option<Question>,
    pub progress: QuizProgress,
    pub feedback: Option<AnswerFeedback>,
    pub high_score: HighScore,
    pub cleared_all_tiers: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_counts_questions_behind_the_player() {
        assert_eq!(QuizProgress::new(Tier::Easy, 0, 3).percent, 0);
        assert_eq!(QuizProgress::new(Tier::Easy, 1, 3).percent, 33);
        assert_eq!(QuizProgress::new(Tier::Easy, 2, 3).percent, 66);
        assert_eq!(QuizProgress::new(Tier::Easy, 2, 3).display_position(), 3);
    }

    #[test]
    fn empty_tier_reports_zero() {
        assert_eq!(QuizProgress::new(Tier::Hard, 0, 0).percent, 0);
    }
}
