use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty tier of the quiz. Ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    /// All tiers in play order.
    pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Medium, Tier::Hard];

    /// The tier every playthrough starts on.
    #[must_use]
    pub fn easiest() -> Self {
        Tier::Easy
    }

    /// Points awarded for a correct answer in this tier.
    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            Tier::Easy => 10,
            Tier::Medium => 20,
            Tier::Hard => 30,
        }
    }

    /// The next harder tier, or `None` on the hardest one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Tier::Easy => Some(Tier::Medium),
            Tier::Medium => Some(Tier::Hard),
            Tier::Hard => None,
        }
    }

    #[must_use]
    pub fn is_hardest(self) -> bool {
        self.next().is_none()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Easy => "easy",
            Tier::Medium => "medium",
            Tier::Hard => "hard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered_and_chain() {
        assert!(Tier::Easy < Tier::Medium && Tier::Medium < Tier::Hard);
        assert_eq!(Tier::easiest().next(), Some(Tier::Medium));
        assert_eq!(Tier::Medium.next(), Some(Tier::Hard));
        assert!(Tier::Hard.is_hardest());
    }

    #[test]
    fn points_scale_with_difficulty() {
        let points: Vec<u32> = Tier::ALL.iter().map(|t| t.points()).collect();
        assert_eq!(points, vec![10, 20, 30]);
    }

    #[test]
    fn displays_lowercase_names() {
        assert_eq!(Tier::Medium.to_string(), "medium");
    }
}
