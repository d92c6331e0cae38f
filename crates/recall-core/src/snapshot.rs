//! Read-only views of the table state as the round engine hands them to the
//! decision engine. The engine never mutates these; it only reads them while
//! building a decision context.

use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::card::{CardId, CardSnapshot};
use crate::model::difficulty::Difficulty;
use crate::model::rank::Rank;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Who sits behind a hand. Human knowledge is UI-driven and never touched by
/// the engine; bots carry the difficulty every probability table keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeatKind {
    Human,
    Bot { difficulty: Difficulty },
}

impl SeatKind {
    pub const fn is_bot(self) -> bool {
        matches!(self, SeatKind::Bot { .. })
    }

    pub const fn difficulty(self) -> Option<Difficulty> {
        match self {
            SeatKind::Human => None,
            SeatKind::Bot { difficulty } => Some(difficulty),
        }
    }
}

/// What one observer believes sits in one owner's hand.
///
/// Entries are id-unique and keep insertion order; staleness is tolerated by
/// design (an entry may outlive the card's presence in the hand).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownBucket {
    cards: Vec<CardSnapshot>,
}

impl KnownBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.cards.iter().any(|card| &card.id == id)
    }

    pub fn get(&self, id: &CardId) -> Option<&CardSnapshot> {
        self.cards.iter().find(|card| &card.id == id)
    }

    /// Insert or refresh an entry, unbounded.
    pub fn insert(&mut self, card: CardSnapshot) {
        if let Some(slot) = self.cards.iter_mut().find(|c| c.id == card.id) {
            *slot = card;
        } else {
            self.cards.push(card);
        }
    }

    /// Insert with a capacity bound: when the bucket is full the newest
    /// entry overwrites the last tracked slot.
    pub fn insert_capped(&mut self, card: CardSnapshot, capacity: usize) {
        if capacity == 0 {
            return;
        }
        if self.contains(&card.id) || self.cards.len() < capacity {
            self.insert(card);
        } else {
            self.cards[capacity - 1] = card;
        }
    }

    pub fn remove(&mut self, id: &CardId) -> Option<CardSnapshot> {
        let index = self.cards.iter().position(|card| &card.id == id)?;
        Some(self.cards.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardSnapshot> {
        self.cards.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CardId> {
        self.cards.iter().map(|card| &card.id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// One observer's full belief: owner id to known bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownCardMap {
    buckets: HashMap<PlayerId, KnownBucket>,
}

impl KnownCardMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, owner: &PlayerId) -> Option<&KnownBucket> {
        self.buckets.get(owner)
    }

    pub fn bucket_mut(&mut self, owner: &PlayerId) -> &mut KnownBucket {
        self.buckets.entry(owner.clone()).or_default()
    }

    pub fn contains(&self, owner: &PlayerId, card: &CardId) -> bool {
        self.buckets
            .get(owner)
            .is_some_and(|bucket| bucket.contains(card))
    }

    pub fn contains_anywhere(&self, card: &CardId) -> bool {
        self.buckets.values().any(|bucket| bucket.contains(card))
    }

    /// Remove a card id from every owner bucket. Returns how many entries
    /// were dropped.
    pub fn remove_everywhere(&mut self, card: &CardId) -> usize {
        let mut removed = 0;
        for bucket in self.buckets.values_mut() {
            if bucket.remove(card).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn owners(&self) -> impl Iterator<Item = (&PlayerId, &KnownBucket)> {
        self.buckets.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(KnownBucket::is_empty)
    }
}

/// Legacy collection entries arrive either as bare ids or as small maps
/// (`{"cardId": ...}` / `{"id": ...}`); both normalize to a `CardId`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardRef {
    Bare(CardId),
    Keyed {
        #[serde(alias = "cardId", alias = "id")]
        card_id: CardId,
    },
}

impl CardRef {
    fn into_id(self) -> CardId {
        match self {
            CardRef::Bare(id) => id,
            CardRef::Keyed { card_id } => card_id,
        }
    }
}

fn card_refs<'de, D>(deserializer: D) -> Result<Vec<CardId>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = Vec::<CardRef>::deserialize(deserializer)?;
    Ok(refs.into_iter().map(CardRef::into_id).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub seat: SeatKind,
    /// Hand in table order. Position is meaningful; never sort it.
    #[serde(default)]
    pub hand: Vec<CardId>,
    /// This player's belief about every hand, its own included.
    #[serde(default)]
    pub known_cards: KnownCardMap,
    #[serde(default, deserialize_with = "card_refs")]
    pub collection_cards: Vec<CardId>,
    #[serde(default)]
    pub collection_rank: Option<Rank>,
}

impl PlayerView {
    pub fn new(id: impl Into<PlayerId>, seat: SeatKind) -> Self {
        Self {
            id: id.into(),
            seat,
            hand: Vec::new(),
            known_cards: KnownCardMap::new(),
            collection_cards: Vec::new(),
            collection_rank: None,
        }
    }

    /// Hand minus collection cards: what this player may actually move.
    pub fn playable_cards(&self) -> Vec<CardId> {
        self.hand
            .iter()
            .filter(|id| !self.collection_cards.contains(id))
            .cloned()
            .collect()
    }

    pub fn own_bucket(&self) -> Option<&KnownBucket> {
        self.known_cards.bucket(&self.id)
    }

    pub const fn is_bot(&self) -> bool {
        self.seat.is_bot()
    }

    pub const fn difficulty(&self) -> Option<Difficulty> {
        self.seat.difficulty()
    }
}

/// Unordered pair of swapped card ids; `{a, b}` equals `{b, a}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawSwapPair")]
pub struct SwapPair {
    a: CardId,
    b: CardId,
}

#[derive(Deserialize)]
struct RawSwapPair {
    a: CardId,
    b: CardId,
}

impl From<RawSwapPair> for SwapPair {
    fn from(raw: RawSwapPair) -> Self {
        SwapPair::new(raw.a, raw.b)
    }
}

impl SwapPair {
    pub fn new(x: CardId, y: CardId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn matches(&self, x: &CardId, y: &CardId) -> bool {
        (&self.a == x && &self.b == y) || (&self.a == y && &self.b == x)
    }
}

/// Per-event decision timers in seconds. Missing keys fall back to the
/// built-in defaults; the engine only ever derives advisory delays from
/// these, it never sleeps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerConfig {
    overrides: HashMap<String, f32>,
}

impl TimerConfig {
    pub const DRAW_CARD: &'static str = "draw_card";
    pub const PLAY_CARD: &'static str = "play_card";
    pub const SAME_RANK_WINDOW: &'static str = "same_rank_window";
    pub const SPECIAL_PLAY: &'static str = "special_play";

    pub fn seconds_for(&self, key: &str) -> f32 {
        self.overrides
            .get(key)
            .copied()
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .unwrap_or_else(|| Self::default_seconds(key))
    }

    pub fn set(&mut self, key: &str, seconds: f32) {
        self.overrides.insert(key.to_owned(), seconds);
    }

    const fn default_seconds(key: &str) -> f32 {
        match key.as_bytes() {
            b"draw_card" => 10.0,
            b"play_card" => 15.0,
            b"same_rank_window" => 5.0,
            b"special_play" => 10.0,
            _ => 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    #[serde(default)]
    pub players: Vec<PlayerView>,
    /// Top of the discard pile is the last element.
    #[serde(default)]
    pub discard_pile: Vec<CardId>,
    #[serde(default)]
    pub draw_pile: Vec<CardId>,
    #[serde(default)]
    pub timers: TimerConfig,
    #[serde(default)]
    pub is_clear_and_collect: bool,
    #[serde(default)]
    pub final_round_active: bool,
    #[serde(default)]
    pub final_round_called_by: Option<PlayerId>,
    #[serde(default)]
    pub jack_swap_history: HashMap<PlayerId, Vec<SwapPair>>,
    #[serde(default)]
    pub turn_seconds_remaining: Option<f32>,
}

impl GameStateView {
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|player| &player.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut PlayerView> {
        self.players.iter_mut().find(|player| &player.id == id)
    }

    pub fn others<'a, 'b>(
        &'a self,
        id: &'b PlayerId,
    ) -> impl Iterator<Item = &'a PlayerView> + use<'a, 'b> {
        self.players.iter().filter(move |player| &player.id != id)
    }

    pub fn discard_top(&self) -> Option<&CardId> {
        self.discard_pile.last()
    }

    pub fn swap_history_for(&self, id: &PlayerId) -> &[SwapPair] {
        self.jack_swap_history
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record_swap(&mut self, actor: &PlayerId, pair: SwapPair) {
        self.jack_swap_history
            .entry(actor.clone())
            .or_default()
            .push(pair);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::{GameStateView, KnownBucket, KnownCardMap, PlayerId, SwapPair, TimerConfig};
    use crate::model::card::{CardId, CardSnapshot};
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;

    fn snap(id: &str, rank: Rank) -> CardSnapshot {
        CardSnapshot::new(id, rank, Suit::Clubs)
    }

    #[test]
    fn collection_entries_accept_legacy_map_forms() {
        let json = r#"{
            "players": [{
                "id": "p1",
                "seat": {"kind": "bot", "difficulty": "hard"},
                "hand": ["2C", "9C", "9D"],
                "collection_cards": ["2C", {"cardId": "9C"}, {"id": "9D"}]
            }]
        }"#;

        let state = GameStateView::from_json(json).unwrap();
        let player = state.player(&PlayerId::new("p1")).unwrap();
        assert_eq!(
            player.collection_cards,
            vec![CardId::new("2C"), CardId::new("9C"), CardId::new("9D")]
        );
        assert!(player.playable_cards().is_empty());
    }

    #[test]
    fn swap_pair_equality_is_unordered() {
        let ab = SwapPair::new(CardId::new("2C"), CardId::new("QS"));
        let ba = SwapPair::new(CardId::new("QS"), CardId::new("2C"));
        assert_eq!(ab, ba);
        assert!(ab.matches(&CardId::new("QS"), &CardId::new("2C")));
        assert!(!ab.matches(&CardId::new("QS"), &CardId::new("3C")));
    }

    #[test]
    fn timers_fall_back_to_defaults() {
        let mut timers = TimerConfig::default();
        assert_eq!(timers.seconds_for(TimerConfig::PLAY_CARD), 15.0);
        timers.set(TimerConfig::PLAY_CARD, 6.0);
        assert_eq!(timers.seconds_for(TimerConfig::PLAY_CARD), 6.0);
        timers.set(TimerConfig::DRAW_CARD, -3.0);
        assert_eq!(timers.seconds_for(TimerConfig::DRAW_CARD), 10.0);
    }

    #[test]
    fn known_bucket_capped_insert_overwrites_second_slot() {
        let mut bucket = KnownBucket::new();
        bucket.insert_capped(snap("2C", Rank::Two), 2);
        bucket.insert_capped(snap("3C", Rank::Three), 2);
        bucket.insert_capped(snap("4C", Rank::Four), 2);
        assert_eq!(bucket.len(), 2);
        assert!(bucket.contains(&CardId::new("2C")));
        assert!(!bucket.contains(&CardId::new("3C")));
        assert!(bucket.contains(&CardId::new("4C")));
    }

    #[test]
    fn known_bucket_capped_refresh_keeps_existing_entry() {
        let mut bucket = KnownBucket::new();
        bucket.insert_capped(snap("2C", Rank::Two), 2);
        bucket.insert_capped(snap("3C", Rank::Three), 2);
        bucket.insert_capped(snap("2C", Rank::Two), 2);
        assert_eq!(bucket.len(), 2);
        assert!(bucket.contains(&CardId::new("3C")));
    }

    #[test]
    fn known_card_map_keeps_one_bucket_per_owner() {
        let mut map = KnownCardMap::new();
        map.bucket_mut(&PlayerId::new("p1")).insert(snap("2C", Rank::Two));
        map.bucket_mut(&PlayerId::new("p2")).insert(snap("2C", Rank::Two));
        map.bucket_mut(&PlayerId::new("p2")).insert(snap("9C", Rank::Nine));

        assert_eq!(map.owners().count(), 2);
        assert_eq!(map.remove_everywhere(&CardId::new("2C")), 2);
        let remaining: Vec<usize> = map.owners().map(|(_, bucket)| bucket.len()).collect();
        assert_eq!(remaining.iter().sum::<usize>(), 1);
    }

    #[test]
    fn empty_document_deserializes_to_empty_state() {
        let state = GameStateView::from_json("{}").unwrap();
        assert!(state.players.is_empty());
        assert_eq!(state.discard_top(), None);
        assert!(state.swap_history_for(&PlayerId::new("p1")).is_empty());
    }
}
