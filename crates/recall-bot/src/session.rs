//! Per-match facade over the decision engine.
//!
//! A [`BotSession`] owns everything one table of bots needs: the validated
//! profile, the card registry, the belief store and a seeded RNG. The round
//! engine hands in a plain state snapshot per event; the session stamps the
//! bots' beliefs onto a working copy so the caller never has to track them.
//! One session serves one match. Two sessions built from the same seed
//! replay the same match decision for decision.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use recall_core::model::card::{CardId, CardSnapshot};
use recall_core::model::difficulty::Difficulty;
use recall_core::model::registry::CardRegistry;
use recall_core::snapshot::{GameStateView, PlayerId};

use crate::decision::{Decision, EventKind};
use crate::knowledge::{KnowledgeManager, SwapEvent};
use crate::policy::DecisionPolicy;
use crate::profile::{BotProfile, ProfileError};

pub struct BotSession {
    profile: BotProfile,
    registry: CardRegistry,
    knowledge: KnowledgeManager,
    rng: SmallRng,
}

impl BotSession {
    /// Validate the profile and seed the match RNG. A bad profile pack is
    /// rejected here, before any decision runs.
    pub fn for_match(
        profile: BotProfile,
        registry: CardRegistry,
        seed: u64,
    ) -> Result<Self, ProfileError> {
        profile.validate()?;
        Ok(Self {
            profile,
            registry,
            knowledge: KnowledgeManager::new(),
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn profile(&self) -> &BotProfile {
        &self.profile
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    pub fn decide_draw(&mut self, snapshot: &GameStateView, actor: &PlayerId) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_draw(
            &working,
            actor,
            difficulty,
            &mut self.rng,
        )
    }

    pub fn decide_play(&mut self, snapshot: &GameStateView, actor: &PlayerId) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_play(
            &working,
            actor,
            difficulty,
            &mut self.rng,
        )
    }

    pub fn decide_same_rank(&mut self, snapshot: &GameStateView, actor: &PlayerId) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_same_rank(
            &working,
            actor,
            difficulty,
            &mut self.rng,
        )
    }

    pub fn decide_same_rank_by_index(
        &mut self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        hand_slots: &[(usize, CardId)],
    ) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_same_rank_by_index(
            &working,
            actor,
            difficulty,
            hand_slots,
            &mut self.rng,
        )
    }

    pub fn decide_jack_swap(&mut self, snapshot: &GameStateView, actor: &PlayerId) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_jack_swap(
            &working,
            actor,
            difficulty,
            &mut self.rng,
        )
    }

    pub fn decide_queen_peek(&mut self, snapshot: &GameStateView, actor: &PlayerId) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_queen_peek(
            &working,
            actor,
            difficulty,
            &mut self.rng,
        )
    }

    pub fn decide_collect(&mut self, snapshot: &GameStateView, actor: &PlayerId) -> Decision {
        let working = self.stamped(snapshot);
        let difficulty = seat_difficulty(&working, actor);
        DecisionPolicy::new(&self.profile, &self.registry).decide_collect(
            &working,
            actor,
            difficulty,
            &mut self.rng,
        )
    }

    /// A card left a hand for the discard pile.
    pub fn note_card_played(
        &mut self,
        snapshot: &GameStateView,
        card: &CardId,
        origin: EventKind,
    ) {
        self.knowledge
            .note_card_played(snapshot, &self.profile, card, origin, &mut self.rng);
    }

    /// Two cards changed owners through a jack swap.
    pub fn note_jack_swap(&mut self, snapshot: &GameStateView, swap: &SwapEvent) {
        self.knowledge
            .note_jack_swap(snapshot, &self.profile, swap, &mut self.rng);
    }

    /// A bot saw a card face up: its own initial peeks, a queen peek, or the
    /// game revealing a card. Always sticks, no memory roll.
    pub fn note_card_seen(&mut self, observer: &PlayerId, owner: &PlayerId, card: CardSnapshot) {
        self.knowledge.note_card_seen(observer, owner, card);
    }

    /// Copy each bot's tracked beliefs onto its seat in the snapshot.
    pub fn stamp_knowledge(&self, snapshot: &mut GameStateView) {
        self.knowledge.stamp(snapshot);
    }

    fn stamped(&self, snapshot: &GameStateView) -> GameStateView {
        let mut working = snapshot.clone();
        self.knowledge.stamp(&mut working);
        working
    }
}

fn seat_difficulty(snapshot: &GameStateView, actor: &PlayerId) -> Difficulty {
    snapshot
        .player(actor)
        .and_then(|player| player.seat.difficulty())
        .unwrap_or_default()
}
