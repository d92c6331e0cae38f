//! Queen peek target selection.
//!
//! Two strategies in fixed order with no trigger rolls: learn one of the
//! bot's own unseen cards first, otherwise look at a random card in a random
//! other player's hand.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use recall_core::snapshot::PlayerView;

use crate::context::DecisionContext;
use crate::decision::PeekTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeekStrategyKind {
    OwnUnknownCards,
    RandomOtherPlayer,
}

impl PeekStrategyKind {
    pub const ORDERED: [PeekStrategyKind; 2] = [
        PeekStrategyKind::OwnUnknownCards,
        PeekStrategyKind::RandomOtherPlayer,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PeekStrategyKind::OwnUnknownCards => "own_unknown_cards",
            PeekStrategyKind::RandomOtherPlayer => "random_other_player",
        }
    }
}

impl fmt::Display for PeekStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn choose_peek_target<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<(PeekTarget, PeekStrategyKind)> {
    if let Some(card) = ctx.unknown_cards.choose(rng) {
        return Some((
            PeekTarget {
                card: card.clone(),
                owner: ctx.acting_player_id.clone(),
            },
            PeekStrategyKind::OwnUnknownCards,
        ));
    }

    // Shuffle the other seats and take the first that still holds a card.
    let mut others: Vec<&PlayerView> = ctx.snapshot.others(&ctx.acting_player_id).collect();
    others.shuffle(rng);
    for player in others {
        if let Some(card) = player.playable_cards().choose(rng) {
            return Some((
                PeekTarget {
                    card: card.clone(),
                    owner: player.id.clone(),
                },
                PeekStrategyKind::RandomOtherPlayer,
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{PeekStrategyKind, choose_peek_target};
    use crate::context::prepare;
    use crate::decision::EventKind;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use recall_core::model::card::CardId;
    use recall_core::model::difficulty::Difficulty;
    use recall_core::model::registry::CardRegistry;
    use recall_core::snapshot::{GameStateView, PlayerId, PlayerView, SeatKind};

    fn bot(id: &str, hand: &[&str]) -> PlayerView {
        let mut player = PlayerView::new(
            id,
            SeatKind::Bot {
                difficulty: Difficulty::Medium,
            },
        );
        player.hand = hand.iter().map(|card| CardId::new(*card)).collect();
        player
    }

    #[test]
    fn prefers_own_unseen_cards() {
        let registry = CardRegistry::standard();
        let mut actor = bot("p1", &["2C", "9D"]);
        let own = actor.known_cards.bucket_mut(&PlayerId::new("p1"));
        own.insert(registry.get(&CardId::new("2C")).cloned().unwrap());
        let state = GameStateView {
            players: vec![actor, bot("p2", &["5H"])],
            ..GameStateView::default()
        };
        let ctx = prepare(
            &state,
            &registry,
            &PlayerId::new("p1"),
            Difficulty::Medium,
            EventKind::QueenPeek,
        );
        let mut rng = SmallRng::seed_from_u64(8);
        let (target, kind) = choose_peek_target(&ctx, &mut rng).unwrap();
        assert_eq!(kind, PeekStrategyKind::OwnUnknownCards);
        assert_eq!(target.card, CardId::new("9D"));
        assert_eq!(target.owner, PlayerId::new("p1"));
    }

    #[test]
    fn falls_back_to_another_player_when_fully_informed() {
        let registry = CardRegistry::standard();
        let mut actor = bot("p1", &["2C"]);
        let own = actor.known_cards.bucket_mut(&PlayerId::new("p1"));
        own.insert(registry.get(&CardId::new("2C")).cloned().unwrap());
        let state = GameStateView {
            players: vec![actor, bot("p2", &[]), bot("p3", &["5H", "6H"])],
            ..GameStateView::default()
        };
        let ctx = prepare(
            &state,
            &registry,
            &PlayerId::new("p1"),
            Difficulty::Medium,
            EventKind::QueenPeek,
        );
        let mut rng = SmallRng::seed_from_u64(8);
        let (target, kind) = choose_peek_target(&ctx, &mut rng).unwrap();
        assert_eq!(kind, PeekStrategyKind::RandomOtherPlayer);
        assert_eq!(target.owner, PlayerId::new("p3"));
        assert!(["5H", "6H"].contains(&target.card.as_str()));
    }

    #[test]
    fn empty_table_yields_no_target() {
        let registry = CardRegistry::standard();
        let mut actor = bot("p1", &["2C"]);
        let own = actor.known_cards.bucket_mut(&PlayerId::new("p1"));
        own.insert(registry.get(&CardId::new("2C")).cloned().unwrap());
        let state = GameStateView {
            players: vec![actor, bot("p2", &[])],
            ..GameStateView::default()
        };
        let ctx = prepare(
            &state,
            &registry,
            &PlayerId::new("p1"),
            Difficulty::Medium,
            EventKind::QueenPeek,
        );
        let mut rng = SmallRng::seed_from_u64(8);
        assert_eq!(choose_peek_target(&ctx, &mut rng), None);
    }
}
