//! Jack swap target selection.
//!
//! Five named strategies run in a fixed order. Each rolls a per-difficulty
//! trigger percentage before its target logic is consulted, and a pair the
//! acting player has already swapped is only accepted again if a second
//! difficulty-scaled roll allows the repeat. `random_except_own` sits last
//! with a 100% trigger so the chain ends in a real pair whenever two other
//! players still hold playable cards.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{Level, event};

use recall_core::model::card::{CardId, CardSnapshot};
use recall_core::snapshot::{PlayerId, PlayerView};

use crate::context::DecisionContext;
use crate::decision::SwapTargets;
use crate::profile::BotProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStrategyKind {
    FinalRoundCallerSwap,
    CollectionThreeSwap,
    OneCardPlayerPriority,
    LowestOpponentHigherOwn,
    RandomExceptOwn,
}

impl SwapStrategyKind {
    /// Evaluation order. `RandomExceptOwn` is always last.
    pub const ORDERED: [SwapStrategyKind; 5] = [
        SwapStrategyKind::FinalRoundCallerSwap,
        SwapStrategyKind::CollectionThreeSwap,
        SwapStrategyKind::OneCardPlayerPriority,
        SwapStrategyKind::LowestOpponentHigherOwn,
        SwapStrategyKind::RandomExceptOwn,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SwapStrategyKind::FinalRoundCallerSwap => "final_round_caller_swap",
            SwapStrategyKind::CollectionThreeSwap => "collection_three_swap",
            SwapStrategyKind::OneCardPlayerPriority => "one_card_player_priority",
            SwapStrategyKind::LowestOpponentHigherOwn => "lowest_opponent_higher_own",
            SwapStrategyKind::RandomExceptOwn => "random_except_own",
        }
    }
}

impl fmt::Display for SwapStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Walk the strategy chain and return the first accepted pair.
pub fn choose_swap_targets<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    profile: &BotProfile,
    rng: &mut R,
) -> Option<(SwapTargets, SwapStrategyKind)> {
    let history = ctx.snapshot.swap_history_for(&ctx.acting_player_id);
    for kind in SwapStrategyKind::ORDERED {
        let trigger = profile.swap_trigger(kind, ctx.difficulty);
        let roll: f32 = rng.gen_range(0.0..1.0) * 100.0;
        if roll >= trigger {
            continue;
        }
        let Some(targets) = propose(kind, ctx, rng) else {
            continue;
        };
        let is_repeat = history
            .iter()
            .any(|pair| pair.matches(&targets.first_card, &targets.second_card));
        if is_repeat {
            let allow = profile.repeat_swap_allowance(ctx.difficulty);
            let repeat_roll: f32 = rng.gen_range(0.0..1.0) * 100.0;
            if repeat_roll >= allow {
                event!(
                    target: "recall_bot::strategy",
                    Level::DEBUG,
                    strategy = %kind,
                    "repeated swap pair rejected"
                );
                continue;
            }
        }
        return Some((targets, kind));
    }
    None
}

fn propose<R: Rng + ?Sized>(
    kind: SwapStrategyKind,
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<SwapTargets> {
    match kind {
        SwapStrategyKind::FinalRoundCallerSwap => final_round_caller_swap(ctx, rng),
        SwapStrategyKind::CollectionThreeSwap => collection_three_swap(ctx, rng),
        SwapStrategyKind::OneCardPlayerPriority => one_card_player_priority(ctx, rng),
        SwapStrategyKind::LowestOpponentHigherOwn => lowest_opponent_higher_own(ctx),
        SwapStrategyKind::RandomExceptOwn => random_except_own(ctx, rng),
    }
}

/// Trade the bot's worst known card into the caller's hand before scoring.
fn final_round_caller_swap<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<SwapTargets> {
    if !ctx.snapshot.final_round_active {
        return None;
    }
    let caller = ctx.snapshot.final_round_called_by.as_ref()?;
    if *caller == ctx.acting_player_id {
        return None;
    }
    let own_cards = ctx.own_known_playable();
    let own = extreme(&own_cards, |a, b| a > b)?;

    let believed = ctx.believed_cards_of(caller);
    if !believed.is_empty() {
        let theirs = extreme(&believed, |a, b| a < b)?;
        if own.points <= theirs.points {
            return None;
        }
        return Some(pair(ctx, own.id.clone(), theirs.id.clone(), caller.clone()));
    }

    let pool = ctx.player(caller)?.playable_cards();
    let pick = pool.choose(rng)?.clone();
    Some(pair(ctx, own.id.clone(), pick, caller.clone()))
}

/// Break up opponents sitting on three collection cards.
fn collection_three_swap<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<SwapTargets> {
    if !ctx.is_clear_and_collect {
        return None;
    }
    let holders = &ctx.others_with_three_in_collection;
    match holders.len() {
        0 => None,
        1 => {
            let holder = &holders[0];
            let holder_card = last_collection_card(ctx, holder)?;
            let donors: Vec<&PlayerView> = ctx
                .others_with_playable()
                .into_iter()
                .filter(|player| player.id != *holder)
                .collect();
            let donor = donors.choose(rng)?;
            let donor_card = donor.playable_cards().choose(rng)?.clone();
            Some(SwapTargets {
                first_card: holder_card,
                first_player: holder.clone(),
                second_card: donor_card,
                second_player: donor.id.clone(),
            })
        }
        _ => {
            let mut shuffled: Vec<&PlayerId> = holders.iter().collect();
            shuffled.shuffle(rng);
            let first = shuffled[0];
            let second = shuffled[1];
            Some(SwapTargets {
                first_card: last_collection_card(ctx, first)?,
                first_player: first.clone(),
                second_card: last_collection_card(ctx, second)?,
                second_player: second.clone(),
            })
        }
    }
}

/// Players down to their last playable card are about to go out; shuffle
/// their hand out from under them.
fn one_card_player_priority<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<SwapTargets> {
    let holders = &ctx.others_with_one_card;
    match holders.len() {
        0 => None,
        1 => {
            let holder = &holders[0];
            let holder_card = single_playable(ctx, holder)?;
            let donors: Vec<&PlayerView> = ctx
                .others_with_playable()
                .into_iter()
                .filter(|player| player.id != *holder)
                .collect();
            let donor = donors.choose(rng)?;
            let donor_card = donor.playable_cards().choose(rng)?.clone();
            Some(SwapTargets {
                first_card: holder_card,
                first_player: holder.clone(),
                second_card: donor_card,
                second_player: donor.id.clone(),
            })
        }
        _ => {
            // Roster order makes the two-holder case deterministic.
            let first = &holders[0];
            let second = &holders[1];
            Some(SwapTargets {
                first_card: single_playable(ctx, first)?,
                first_player: first.clone(),
                second_card: single_playable(ctx, second)?,
                second_player: second.clone(),
            })
        }
    }
}

/// Swap the bot's highest-point known card for the cheapest card it believes
/// an opponent holds, when that trade lowers its own total.
fn lowest_opponent_higher_own(ctx: &DecisionContext<'_>) -> Option<SwapTargets> {
    let own_cards = ctx.own_known_playable();
    let own = extreme(&own_cards, |a, b| a > b)?;

    let actor = ctx.acting_player()?;
    let mut lowest: Option<(&CardSnapshot, &PlayerId)> = None;
    for player in &ctx.snapshot.players {
        if player.id == ctx.acting_player_id {
            continue;
        }
        let Some(bucket) = actor.known_cards.bucket(&player.id) else {
            continue;
        };
        for card in bucket.iter() {
            match lowest {
                None => lowest = Some((card, &player.id)),
                Some((incumbent, _)) if card.points < incumbent.points => {
                    lowest = Some((card, &player.id));
                }
                Some(_) => {}
            }
        }
    }

    let (theirs, owner) = lowest?;
    if own.points <= theirs.points {
        return None;
    }
    Some(pair(ctx, own.id.clone(), theirs.id.clone(), owner.clone()))
}

/// Unconditional fallback: two playable cards from two different other
/// players. Succeeds whenever at least two other seats still hold cards.
fn random_except_own<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<SwapTargets> {
    let others = ctx.others_with_playable();
    if others.len() < 2 {
        return None;
    }
    let picks: Vec<&PlayerView> = others.choose_multiple(rng, 2).copied().collect();
    let first_card = picks[0].playable_cards().choose(rng)?.clone();
    let second_card = picks[1].playable_cards().choose(rng)?.clone();
    Some(SwapTargets {
        first_card,
        first_player: picks[0].id.clone(),
        second_card,
        second_player: picks[1].id.clone(),
    })
}

fn pair(
    ctx: &DecisionContext<'_>,
    own_card: CardId,
    other_card: CardId,
    other_player: PlayerId,
) -> SwapTargets {
    SwapTargets {
        first_card: own_card,
        first_player: ctx.acting_player_id.clone(),
        second_card: other_card,
        second_player: other_player,
    }
}

/// Point ties resolve to the first card seen.
fn extreme<'a>(
    cards: &[&'a CardSnapshot],
    better: impl Fn(u8, u8) -> bool,
) -> Option<&'a CardSnapshot> {
    let mut best: Option<&CardSnapshot> = None;
    for card in cards {
        match best {
            None => best = Some(card),
            Some(incumbent) if better(card.points, incumbent.points) => best = Some(card),
            Some(_) => {}
        }
    }
    best
}

fn last_collection_card(ctx: &DecisionContext<'_>, id: &PlayerId) -> Option<CardId> {
    ctx.player(id)?.collection_cards.last().cloned()
}

fn single_playable(ctx: &DecisionContext<'_>, id: &PlayerId) -> Option<CardId> {
    ctx.player(id)?.playable_cards().first().cloned()
}
