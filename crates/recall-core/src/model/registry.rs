use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::model::card::{CardId, CardSnapshot};
use crate::model::rank::Rank;
use crate::model::suit::Suit;

/// Authoritative card metadata for one game, keyed by opaque id.
///
/// Decision code never assumes anything about id strings; every rank, suit,
/// point or power lookup goes through here. Unknown ids resolve to `None`
/// and callers degrade (treat the card as worthless and powerless).
#[derive(Debug, Clone)]
pub struct CardRegistry {
    cards: HashMap<CardId, CardSnapshot>,
    order: Vec<CardId>,
}

impl CardRegistry {
    /// Standard 52-card deck with ids like `"10H"` or `"QS"`.
    pub fn standard() -> Self {
        let mut cards = HashMap::with_capacity(52);
        let mut order = Vec::with_capacity(52);
        for suit in Suit::ALL.iter().copied() {
            for rank in Rank::ORDERED.iter().copied() {
                let id = CardId::new(format!("{rank}{suit}"));
                order.push(id.clone());
                cards.insert(id.clone(), CardSnapshot::new(id, rank, suit));
            }
        }
        Self { cards, order }
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = CardSnapshot>) -> Self {
        let mut cards = HashMap::new();
        let mut order = Vec::new();
        for snapshot in snapshots {
            if !cards.contains_key(&snapshot.id) {
                order.push(snapshot.id.clone());
            }
            cards.insert(snapshot.id.clone(), snapshot);
        }
        Self { cards, order }
    }

    pub fn get(&self, id: &CardId) -> Option<&CardSnapshot> {
        self.cards.get(id)
    }

    pub fn rank_of(&self, id: &CardId) -> Option<Rank> {
        self.get(id).map(|card| card.rank)
    }

    pub fn points_of(&self, id: &CardId) -> u8 {
        self.get(id).map(|card| card.points).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// All card snapshots in registry declaration order.
    pub fn snapshots(&self) -> impl Iterator<Item = &CardSnapshot> {
        self.order.iter().filter_map(|id| self.cards.get(id))
    }

    /// Ids in declaration order, for dealing.
    pub fn ids(&self) -> &[CardId] {
        &self.order
    }

    pub fn shuffled_ids<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Vec<CardId> {
        let mut ids = self.order.clone();
        ids.shuffle(rng);
        ids
    }

    pub fn shuffled_ids_with_seed(&self, seed: u64) -> Vec<CardId> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.shuffled_ids(&mut rng)
    }
}
