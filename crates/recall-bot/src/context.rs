//! Per-decision working set.
//!
//! [`prepare`] turns one raw table snapshot into the flat, read-only view the
//! rule interpreter and target strategies work against. It is a pure function
//! of its inputs and never fails: a malformed or empty snapshot yields a
//! context whose card lists are simply empty.

use recall_core::model::card::{CardId, CardSnapshot};
use recall_core::model::difficulty::Difficulty;
use recall_core::model::rank::Rank;
use recall_core::model::registry::CardRegistry;
use recall_core::rules::ContextField;
use recall_core::snapshot::{GameStateView, PlayerId, PlayerView};

use crate::decision::EventKind;

/// Id-only summary of one seat, built for special events. Card metadata for
/// other players is never exposed here; strategies that need points go
/// through the acting player's belief buckets or the public registry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub hand: Vec<CardId>,
    /// Ids the acting player believes this seat holds.
    pub known_card_ids: Vec<CardId>,
    pub collection_cards: Vec<CardId>,
    pub playable_cards: Vec<CardId>,
}

/// Everything one decision call reads. Ephemeral: built per call, dropped
/// with the call, borrowing the snapshot and registry it was prepared from.
pub struct DecisionContext<'a> {
    pub snapshot: &'a GameStateView,
    pub registry: &'a CardRegistry,
    pub event: EventKind,
    pub acting_player_id: PlayerId,
    pub difficulty: Difficulty,
    pub is_clear_and_collect: bool,
    /// The acting player's whole hand.
    pub available_cards: Vec<CardId>,
    /// Hand minus collection cards. Never absent, possibly empty.
    pub playable_cards: Vec<CardId>,
    /// Playable cards present in the acting player's own belief bucket.
    pub known_cards: Vec<CardId>,
    /// Playable cards the acting player has never seen.
    pub unknown_cards: Vec<CardId>,
    pub collection_cards: Vec<CardId>,
    pub collection_rank: Option<Rank>,
    pub discard_top_id: Option<&'a CardId>,
    pub discard_top: Option<&'a CardSnapshot>,
    pub discard_top_matches_collection: bool,
    /// Per-seat summaries, populated for special events only.
    pub all_players: Vec<PlayerSummary>,
    /// Other seats holding exactly one playable card.
    pub others_with_one_card: Vec<PlayerId>,
    /// Other seats holding exactly three collection cards; only populated in
    /// clear-and-collect games.
    pub others_with_three_in_collection: Vec<PlayerId>,
}

/// A context field resolved against one concrete context. Missing behaves
/// like an empty collection everywhere downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Missing,
    Bool(bool),
    Text(String),
    Ids(&'a [CardId]),
    Players(&'a [PlayerId]),
}

impl Resolved<'_> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Resolved::Missing)
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Resolved::Ids(ids) => Some(ids.len()),
            Resolved::Players(players) => Some(players.len()),
            _ => None,
        }
    }
}

pub fn prepare<'a>(
    snapshot: &'a GameStateView,
    registry: &'a CardRegistry,
    acting_player_id: &PlayerId,
    difficulty: Difficulty,
    event: EventKind,
) -> DecisionContext<'a> {
    let actor = snapshot.player(acting_player_id);

    let available_cards: Vec<CardId> = actor.map(|p| p.hand.clone()).unwrap_or_default();
    let collection_cards: Vec<CardId> =
        actor.map(|p| p.collection_cards.clone()).unwrap_or_default();
    let collection_rank = actor.and_then(|p| p.collection_rank);

    let playable_cards: Vec<CardId> = available_cards
        .iter()
        .filter(|id| !collection_cards.contains(id))
        .cloned()
        .collect();

    let own_bucket = actor.and_then(PlayerView::own_bucket);
    let (known_cards, unknown_cards): (Vec<CardId>, Vec<CardId>) = playable_cards
        .iter()
        .cloned()
        .partition(|id| own_bucket.is_some_and(|bucket| bucket.contains(id)));

    let discard_top_id = snapshot.discard_top();
    let discard_top = discard_top_id.and_then(|id| registry.get(id));
    let discard_top_matches_collection = match (discard_top, collection_rank) {
        (Some(top), Some(rank)) => top.rank == rank,
        _ => false,
    };

    let mut all_players = Vec::new();
    let mut others_with_one_card = Vec::new();
    let mut others_with_three_in_collection = Vec::new();
    if event.is_special() {
        for player in &snapshot.players {
            let known_card_ids: Vec<CardId> = actor
                .and_then(|a| a.known_cards.bucket(&player.id))
                .map(|bucket| bucket.ids().cloned().collect())
                .unwrap_or_default();
            let playable = player.playable_cards();
            if player.id != *acting_player_id {
                if playable.len() == 1 {
                    others_with_one_card.push(player.id.clone());
                }
                if snapshot.is_clear_and_collect && player.collection_cards.len() == 3 {
                    others_with_three_in_collection.push(player.id.clone());
                }
            }
            all_players.push(PlayerSummary {
                id: player.id.clone(),
                hand: player.hand.clone(),
                known_card_ids,
                collection_cards: player.collection_cards.clone(),
                playable_cards: playable,
            });
        }
    }

    DecisionContext {
        snapshot,
        registry,
        event,
        acting_player_id: acting_player_id.clone(),
        difficulty,
        is_clear_and_collect: snapshot.is_clear_and_collect,
        available_cards,
        playable_cards,
        known_cards,
        unknown_cards,
        collection_cards,
        collection_rank,
        discard_top_id,
        discard_top,
        discard_top_matches_collection,
        all_players,
        others_with_one_card,
        others_with_three_in_collection,
    }
}

impl<'a> DecisionContext<'a> {
    pub fn acting_player(&self) -> Option<&'a PlayerView> {
        self.snapshot.player(&self.acting_player_id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&'a PlayerView> {
        self.snapshot.player(id)
    }

    pub fn card(&self, id: &CardId) -> Option<&'a CardSnapshot> {
        self.registry.get(id)
    }

    pub fn rank_of(&self, id: &CardId) -> Option<Rank> {
        self.registry.rank_of(id)
    }

    pub fn points_of(&self, id: &CardId) -> u8 {
        self.registry.points_of(id)
    }

    /// Other seats that hold at least one playable card, roster order.
    pub fn others_with_playable(&self) -> Vec<&'a PlayerView> {
        self.snapshot
            .others(&self.acting_player_id)
            .filter(|player| !player.playable_cards().is_empty())
            .collect()
    }

    /// Belief entries for the given owner, from the acting player's map.
    pub fn believed_cards_of(&self, owner: &PlayerId) -> Vec<&'a CardSnapshot> {
        self.acting_player()
            .and_then(|actor| actor.known_cards.bucket(owner))
            .map(|bucket| bucket.iter().collect())
            .unwrap_or_default()
    }

    /// The acting player's believed own cards that are still playable.
    pub fn own_known_playable(&self) -> Vec<&'a CardSnapshot> {
        self.acting_player()
            .and_then(PlayerView::own_bucket)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|card| self.playable_cards.contains(&card.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resolve(&self, field: ContextField) -> Resolved<'_> {
        match field {
            ContextField::AvailableCards | ContextField::ActingHand => {
                Resolved::Ids(&self.available_cards)
            }
            ContextField::PlayableCards => Resolved::Ids(&self.playable_cards),
            ContextField::KnownCards => Resolved::Ids(&self.known_cards),
            ContextField::UnknownCards => Resolved::Ids(&self.unknown_cards),
            ContextField::CollectionCards | ContextField::ActingCollectionCards => {
                Resolved::Ids(&self.collection_cards)
            }
            ContextField::ActingCollectionRank => self
                .collection_rank
                .map(|rank| Resolved::Text(rank.name().to_owned()))
                .unwrap_or(Resolved::Missing),
            ContextField::DiscardTop => self
                .discard_top_id
                .map(|id| Resolved::Text(id.as_str().to_owned()))
                .unwrap_or(Resolved::Missing),
            ContextField::DiscardTopRank => self
                .discard_top
                .map(|card| Resolved::Text(card.rank.name().to_owned()))
                .unwrap_or(Resolved::Missing),
            ContextField::DiscardTopMatchesCollection => {
                Resolved::Bool(self.discard_top_matches_collection)
            }
            ContextField::DiscardPile => Resolved::Ids(&self.snapshot.discard_pile),
            ContextField::DrawPile => Resolved::Ids(&self.snapshot.draw_pile),
            ContextField::IsClearAndCollect => Resolved::Bool(self.is_clear_and_collect),
            ContextField::FinalRoundActive => Resolved::Bool(self.snapshot.final_round_active),
            ContextField::Difficulty => Resolved::Text(self.difficulty.as_str().to_owned()),
            ContextField::OthersWithOneCard => Resolved::Players(&self.others_with_one_card),
            ContextField::OthersWithThreeInCollection => {
                Resolved::Players(&self.others_with_three_in_collection)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DecisionContext, Resolved, prepare};
    use crate::decision::EventKind;
    use recall_core::model::card::CardId;
    use recall_core::model::difficulty::Difficulty;
    use recall_core::model::rank::Rank;
    use recall_core::model::registry::CardRegistry;
    use recall_core::rules::ContextField;
    use recall_core::snapshot::{GameStateView, PlayerId, PlayerView, SeatKind};

    fn bot(id: &str) -> PlayerView {
        PlayerView::new(
            id,
            SeatKind::Bot {
                difficulty: Difficulty::Hard,
            },
        )
    }

    fn ids(raw: &[&str]) -> Vec<CardId> {
        raw.iter().map(|id| CardId::new(*id)).collect()
    }

    fn build_state(registry: &CardRegistry) -> GameStateView {
        let mut actor = bot("p1");
        actor.hand = ids(&["2C", "9D", "QS", "7H"]);
        actor.collection_cards = ids(&["7H"]);
        actor.collection_rank = Some(Rank::Seven);
        let own = actor.known_cards.bucket_mut(&PlayerId::new("p1"));
        own.insert(registry.get(&CardId::new("2C")).cloned().unwrap());
        own.insert(registry.get(&CardId::new("QS")).cloned().unwrap());

        let mut left = bot("p2");
        left.hand = ids(&["3C", "4C"]);

        let mut right = bot("p3");
        right.hand = ids(&["5C"]);

        GameStateView {
            players: vec![actor, left, right],
            discard_pile: ids(&["8S", "7C"]),
            is_clear_and_collect: true,
            ..GameStateView::default()
        }
    }

    fn context_for<'a>(
        event: EventKind,
        state: &'a GameStateView,
        registry: &'a CardRegistry,
    ) -> DecisionContext<'a> {
        prepare(
            state,
            registry,
            &PlayerId::new("p1"),
            Difficulty::Hard,
            event,
        )
    }

    #[test]
    fn playable_excludes_collection_cards() {
        let registry = CardRegistry::standard();
        let state = build_state(&registry);
        let ctx = context_for(EventKind::PlayCard, &state, &registry);
        assert_eq!(ctx.available_cards, ids(&["2C", "9D", "QS", "7H"]));
        assert_eq!(ctx.playable_cards, ids(&["2C", "9D", "QS"]));
        assert_eq!(ctx.collection_cards, ids(&["7H"]));
    }

    #[test]
    fn known_unknown_split_uses_own_bucket() {
        let registry = CardRegistry::standard();
        let state = build_state(&registry);
        let ctx = context_for(EventKind::PlayCard, &state, &registry);
        assert_eq!(ctx.known_cards, ids(&["2C", "QS"]));
        assert_eq!(ctx.unknown_cards, ids(&["9D"]));
    }

    #[test]
    fn discard_top_matches_collection_rank() {
        let registry = CardRegistry::standard();
        let state = build_state(&registry);
        let ctx = context_for(EventKind::CollectFromDiscard, &state, &registry);
        assert_eq!(ctx.discard_top_id, Some(&CardId::new("7C")));
        assert!(ctx.discard_top_matches_collection);
    }

    #[test]
    fn aggregates_built_for_special_events_only() {
        let registry = CardRegistry::standard();
        let state = build_state(&registry);
        let plain = context_for(EventKind::PlayCard, &state, &registry);
        assert!(plain.all_players.is_empty());

        let special = context_for(EventKind::JackSwap, &state, &registry);
        assert_eq!(special.all_players.len(), 3);
        assert_eq!(special.others_with_one_card, vec![PlayerId::new("p3")]);
    }

    #[test]
    fn missing_actor_yields_empty_context() {
        let state = GameStateView::default();
        let registry = CardRegistry::standard();
        let ctx = prepare(
            &state,
            &registry,
            &PlayerId::new("ghost"),
            Difficulty::Easy,
            EventKind::PlayCard,
        );
        assert!(ctx.available_cards.is_empty());
        assert!(ctx.playable_cards.is_empty());
        assert!(ctx.unknown_cards.is_empty());
        assert!(!ctx.discard_top_matches_collection);
    }

    #[test]
    fn resolve_maps_fields_to_context_values() {
        let registry = CardRegistry::standard();
        let state = build_state(&registry);
        let ctx = context_for(EventKind::PlayCard, &state, &registry);
        assert_eq!(
            ctx.resolve(ContextField::Difficulty),
            Resolved::Text("hard".to_owned())
        );
        assert_eq!(
            ctx.resolve(ContextField::DiscardTopRank),
            Resolved::Text("seven".to_owned())
        );
        assert_eq!(
            ctx.resolve(ContextField::IsClearAndCollect),
            Resolved::Bool(true)
        );
        match ctx.resolve(ContextField::PlayableCards) {
            Resolved::Ids(cards) => assert_eq!(cards.len(), 3),
            other => panic!("expected ids, got {other:?}"),
        }
    }
}
