use std::collections::HashMap;

use thiserror::Error;

use crate::model::{Question, QuestionDraft, QuestionError, Tier};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("tier {0} has no questions")]
    EmptyTier(Tier),

    #[error("invalid question #{index} in tier {tier}: {source}")]
    InvalidQuestion {
        tier: Tier,
        index: usize,
        #[source]
        source: QuestionError,
    },
}

/// Read-only catalog of questions grouped by tier.
pub trait QuestionBank: Send + Sync {
    /// Every question of the tier, in catalog order.
    fn questions(&self, tier: Tier) -> &[Question];
}

/// In-memory bank with at least one question per tier.
#[derive(Debug, Clone)]
pub struct StaticQuestionBank {
    tiers: HashMap<Tier, Vec<Question>>,
}

impl StaticQuestionBank {
    /// Build a bank from validated questions.
    ///
    /// # Errors
    ///
    /// Returns `BankError::EmptyTier` if any tier is missing or empty.
    pub fn new(mut tiers: HashMap<Tier, Vec<Question>>) -> Result<Self, BankError> {
        for tier in Tier::ALL {
            if tiers.get(&tier).is_none_or(Vec::is_empty) {
                return Err(BankError::EmptyTier(tier));
            }
        }
        tiers.retain(|tier, _| Tier::ALL.contains(tier));
        Ok(Self { tiers })
    }

    /// Validate catalog drafts and build a bank from them.
    ///
    /// # Errors
    ///
    /// Returns `BankError::InvalidQuestion` for the first draft that fails
    /// validation, or `BankError::EmptyTier` if a tier ends up empty.
    pub fn from_drafts(
        drafts: impl IntoIterator<Item = (Tier, Vec<QuestionDraft>)>,
    ) -> Result<Self, BankError> {
        let mut tiers = HashMap::new();
        for (tier, list) in drafts {
            let questions = list
                .into_iter()
                .enumerate()
                .map(|(index, draft)| {
                    draft
                        .validate()
                        .map_err(|source| BankError::InvalidQuestion { tier, index, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            tiers.insert(tier, questions);
        }
        Self::new(tiers)
    }
}

impl QuestionBank for StaticQuestionBank {
    fn questions(&self, tier: Tier) -> &[Question] {
        self.tiers.get(&tier).map_or(&[], Vec::as_slice)
    }
}
