//! Shared belief bookkeeping for every bot at one table.
//!
//! The manager owns one belief map per bot seat and mutates them as the
//! round engine reports plays, swaps and peeks. Each notification rolls a
//! per-bot memory gate first, so lower tiers genuinely forget things. Humans
//! are never tracked here; their knowledge lives in the UI.

use std::collections::HashMap;

use rand::Rng;
use tracing::{Level, event};

use recall_core::model::card::{CardId, CardSnapshot};
use recall_core::snapshot::{GameStateView, KnownCardMap, PlayerId};

use crate::decision::EventKind;
use crate::profile::BotProfile;

/// One card changing hands during a jack swap.
#[derive(Debug, Clone, PartialEq)]
pub struct CardMove {
    pub card: CardId,
    pub from: PlayerId,
    pub to: PlayerId,
}

/// Both halves of a completed jack swap.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapEvent {
    pub first: CardMove,
    pub second: CardMove,
}

/// Cap on how many cards one observer tracks per foreign hand.
const FOREIGN_BUCKET_CAP: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct KnowledgeManager {
    beliefs: HashMap<PlayerId, KnownCardMap>,
}

impl KnowledgeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn knowledge_for(&self, id: &PlayerId) -> Option<&KnownCardMap> {
        self.beliefs.get(id)
    }

    /// A card left someone's hand; remembering bots drop it from every
    /// bucket since it can no longer be anywhere.
    pub fn note_card_played<R: Rng + ?Sized>(
        &mut self,
        snapshot: &GameStateView,
        profile: &BotProfile,
        card: &CardId,
        origin: EventKind,
        rng: &mut R,
    ) {
        for player in &snapshot.players {
            let Some(difficulty) = player.seat.difficulty() else {
                continue;
            };
            let roll: f32 = rng.gen_range(0.0..1.0);
            if roll >= profile.memory_probability(difficulty) {
                event!(
                    target: "recall_bot::knowledge",
                    Level::DEBUG,
                    bot = %player.id.as_str(),
                    card = %card,
                    origin = %origin,
                    "memory gate failed, play not registered"
                );
                continue;
            }
            let removed = self
                .beliefs
                .entry(player.id.clone())
                .or_default()
                .remove_everywhere(card);
            if removed > 0 {
                event!(
                    target: "recall_bot::knowledge",
                    Level::DEBUG,
                    bot = %player.id.as_str(),
                    card = %card,
                    origin = %origin,
                    removed,
                    "played card dropped from beliefs"
                );
            }
        }
    }

    /// Two cards changed owners; remembering bots relocate any they were
    /// tracking. Destination buckets stay capped, newest entry wins.
    pub fn note_jack_swap<R: Rng + ?Sized>(
        &mut self,
        snapshot: &GameStateView,
        profile: &BotProfile,
        swap: &SwapEvent,
        rng: &mut R,
    ) {
        for player in &snapshot.players {
            let Some(difficulty) = player.seat.difficulty() else {
                continue;
            };
            let roll: f32 = rng.gen_range(0.0..1.0);
            if roll >= profile.memory_probability(difficulty) {
                continue;
            }
            let map = self.beliefs.entry(player.id.clone()).or_default();
            for half in [&swap.first, &swap.second] {
                relocate(map, half);
            }
            event!(
                target: "recall_bot::knowledge",
                Level::DEBUG,
                bot = %player.id.as_str(),
                first = %swap.first.card,
                second = %swap.second.card,
                "swap registered"
            );
        }
    }

    /// Direct observation, no memory gate: the observer just saw the card.
    /// Own-hand knowledge is unbounded, foreign hands stay capped.
    pub fn note_card_seen(&mut self, observer: &PlayerId, owner: &PlayerId, card: CardSnapshot) {
        let map = self.beliefs.entry(observer.clone()).or_default();
        let bucket = map.bucket_mut(owner);
        if observer == owner {
            bucket.insert(card);
        } else {
            bucket.insert_capped(card, FOREIGN_BUCKET_CAP);
        }
    }

    /// Copy beliefs into the bot seats of a working snapshot so context
    /// preparation sees what each bot currently believes.
    pub fn stamp(&self, snapshot: &mut GameStateView) {
        for player in &mut snapshot.players {
            if !player.seat.is_bot() {
                continue;
            }
            if let Some(map) = self.beliefs.get(&player.id) {
                player.known_cards = map.clone();
            }
        }
    }
}

fn relocate(map: &mut KnownCardMap, half: &CardMove) {
    let Some(card) = map.bucket_mut(&half.from).remove(&half.card) else {
        return;
    };
    map.bucket_mut(&half.to)
        .insert_capped(card, FOREIGN_BUCKET_CAP);
}
