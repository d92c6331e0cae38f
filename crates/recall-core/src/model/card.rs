use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque card identifier. Card metadata (rank, suit, points, power) is not
/// derivable from the id; it lives in the [`CardRegistry`](crate::model::registry::CardRegistry).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Special plays attached to court cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialPower {
    /// Jack: swap any two cards between hands.
    SwapCards,
    /// Queen: peek at a single face-down card.
    PeekCard,
}

/// Full card metadata as resolved through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: CardId,
    pub rank: Rank,
    pub suit: Suit,
    pub points: u8,
    #[serde(default)]
    pub power: Option<SpecialPower>,
}

impl CardSnapshot {
    pub fn new(id: impl Into<CardId>, rank: Rank, suit: Suit) -> Self {
        Self {
            id: id.into(),
            rank,
            suit,
            points: rank.points(),
            power: special_power_of(rank),
        }
    }
}

impl fmt::Display for CardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

pub const fn special_power_of(rank: Rank) -> Option<SpecialPower> {
    match rank {
        Rank::Jack => Some(SpecialPower::SwapCards),
        Rank::Queen => Some(SpecialPower::PeekCard),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{CardId, CardSnapshot, SpecialPower};
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;

    #[test]
    fn jack_carries_swap_power() {
        let card = CardSnapshot::new("JH", Rank::Jack, Suit::Hearts);
        assert_eq!(card.power, Some(SpecialPower::SwapCards));
        assert_eq!(card.points, 11);
        assert_eq!(card.to_string(), "JH");
    }

    #[test]
    fn queen_carries_peek_power() {
        let card = CardSnapshot::new("QS", Rank::Queen, Suit::Spades);
        assert_eq!(card.power, Some(SpecialPower::PeekCard));
    }

    #[test]
    fn number_cards_have_no_power() {
        let card = CardSnapshot::new("4D", Rank::Four, Suit::Diamonds);
        assert_eq!(card.power, None);
        assert_eq!(card.points, 4);
    }

    #[test]
    fn card_id_is_serde_transparent() {
        let id = CardId::new("10H");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"10H\"");
        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
