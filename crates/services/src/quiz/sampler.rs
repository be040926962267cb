use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use quiz_core::QuestionBank;
use quiz_core::model::{AnswerKey, Question, Tier};

/// Per-tier question lists drawn for one playthrough.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledQuestions {
    tiers: BTreeMap<Tier, Vec<Question>>,
}

impl SampledQuestions {
    #[must_use]
    pub fn for_tier(&self, tier: Tier) -> &[Question] {
        self.tiers.get(&tier).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn get(&self, key: AnswerKey) -> Option<&Question> {
        self.for_tier(key.tier).get(key.index)
    }

    /// Number of questions drawn for `tier`.
    #[must_use]
    pub fn len(&self, tier: Tier) -> usize {
        self.for_tier(tier).len()
    }
}

/// Draws a uniformly shuffled, size-bounded subset of a tier's questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSampler {
    sample_size: usize,
}

impl QuestionSampler {
    #[must_use]
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    /// Sample `tier` using the thread-local generator.
    #[must_use]
    pub fn sample(&self, bank: &dyn QuestionBank, tier: Tier) -> Vec<Question> {
        self.sample_with(bank, tier, &mut rand::rng())
    }

    /// Sample `tier` with a caller-provided generator.
    ///
    /// Returns `min(sample_size, bank size)` questions.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        bank: &dyn QuestionBank,
        tier: Tier,
        rng: &mut R,
    ) -> Vec<Question> {
        let mut questions = bank.questions(tier).to_vec();
        // Fisher-Yates over the whole list keeps every ordering equally likely.
        questions.as_mut_slice().shuffle(rng);
        questions.truncate(self.sample_size);
        questions
    }

    /// Draw a fresh sample for every tier.
    #[must_use]
    pub fn sample_all(&self, bank: &dyn QuestionBank) -> SampledQuestions {
        SampledQuestions {
            tiers: Tier::ALL
                .into_iter()
                .map(|tier| (tier, self.sample(bank, tier)))
                .collect(),
        }
    }
}
