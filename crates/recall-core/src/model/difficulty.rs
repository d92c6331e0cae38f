use core::fmt;

use serde::{Deserialize, Serialize};

/// Computer player difficulty tier. Every probability table in the engine is
/// keyed by this.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Difficulty {
    Easy = 0,
    #[default]
    Medium = 1,
    Hard = 2,
    Expert = 3,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value per difficulty tier, each optional so data files may cover only
/// the tiers they care about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerDifficulty<T> {
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub easy: Option<T>,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub medium: Option<T>,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub hard: Option<T>,
    #[serde(default = "none", skip_serializing_if = "Option::is_none")]
    pub expert: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> Default for PerDifficulty<T> {
    fn default() -> Self {
        Self {
            easy: None,
            medium: None,
            hard: None,
            expert: None,
        }
    }
}

impl<T> PerDifficulty<T> {
    pub const fn from_values(easy: T, medium: T, hard: T, expert: T) -> Self {
        Self {
            easy: Some(easy),
            medium: Some(medium),
            hard: Some(hard),
            expert: Some(expert),
        }
    }

    pub fn get(&self, difficulty: Difficulty) -> Option<&T> {
        match difficulty {
            Difficulty::Easy => self.easy.as_ref(),
            Difficulty::Medium => self.medium.as_ref(),
            Difficulty::Hard => self.hard.as_ref(),
            Difficulty::Expert => self.expert.as_ref(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (Difficulty, &T)> {
        Difficulty::ALL
            .iter()
            .filter_map(|&difficulty| self.get(difficulty).map(|value| (difficulty, value)))
    }
}

impl<T: Copy> PerDifficulty<T> {
    pub fn get_or(&self, difficulty: Difficulty, fallback: T) -> T {
        self.get(difficulty).copied().unwrap_or(fallback)
    }
}

impl<T: Clone> PerDifficulty<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            easy: Some(value.clone()),
            medium: Some(value.clone()),
            hard: Some(value.clone()),
            expert: Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Difficulty, PerDifficulty};

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(Difficulty::from_name("Expert"), Some(Difficulty::Expert));
        assert_eq!(Difficulty::from_name(" medium "), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_name("nightmare"), None);
    }

    #[test]
    fn default_is_medium() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn serde_round_trips() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
        let back: Difficulty = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Difficulty::Hard);
    }

    #[test]
    fn per_difficulty_falls_back_when_tier_absent() {
        let table: PerDifficulty<f32> = serde_json::from_str(r#"{"easy": 0.5}"#).unwrap();
        assert_eq!(table.get_or(Difficulty::Easy, 1.0), 0.5);
        assert_eq!(table.get_or(Difficulty::Expert, 1.0), 1.0);
    }

    #[test]
    fn per_difficulty_entries_iterate_in_tier_order() {
        let table = PerDifficulty::from_values(1u8, 2, 3, 4);
        let values: Vec<u8> = table.entries().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }
}
