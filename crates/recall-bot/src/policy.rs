//! Decision entry points, one per table event.
//!
//! Every entry point samples an advisory delay, rolls the per-difficulty
//! miss gate, then runs the event-specific pipeline: plain probability rolls
//! for draws, the rule interpreter for card selection and collects, and the
//! target-selection chains for the special plays. Every path returns a fully
//! populated [`Decision`] with a human-readable reasoning string.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{Level, event};

use recall_core::model::card::CardId;
use recall_core::model::difficulty::Difficulty;
use recall_core::model::registry::CardRegistry;
use recall_core::snapshot::{GameStateView, PlayerId};

use crate::context::{DecisionContext, prepare};
use crate::decision::{Decision, DecisionOutcome, EventKind};
use crate::interpreter::{self, RuleOutcome};
use crate::profile::BotProfile;
use crate::strategy;

/// Optimal-play probability multiplier once the turn timer runs low.
const TIME_PRESSURE_FACTOR: f32 = 0.7;
const TIME_PRESSURE_THRESHOLD_SECONDS: f32 = 10.0;

/// Advisory delay bounds, as fractions of the event's timer window.
const DELAY_WINDOW_LOW: f32 = 0.4;
const DELAY_WINDOW_HIGH: f32 = 0.8;

pub struct DecisionPolicy<'a> {
    profile: &'a BotProfile,
    registry: &'a CardRegistry,
}

impl<'a> DecisionPolicy<'a> {
    pub fn new(profile: &'a BotProfile, registry: &'a CardRegistry) -> Self {
        Self { profile, registry }
    }

    pub fn decide_draw<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Decision {
        let delay = self.delay_for(snapshot, EventKind::DrawCard, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::DrawCard,
                DecisionOutcome::Draw { from_discard: None },
                delay,
                difficulty,
                missed_reason(EventKind::DrawCard),
            );
            return self.emit(actor, decision);
        }

        let roll: f32 = rng.gen_range(0.0..1.0);
        let wants_discard = roll < self.profile.draw_from_discard_probability(difficulty);
        let from_discard = wants_discard && !snapshot.discard_pile.is_empty();
        let reasoning = if from_discard {
            "drew from discard pile"
        } else {
            "drew from deck"
        };
        let decision = Decision::new(
            EventKind::DrawCard,
            DecisionOutcome::Draw {
                from_discard: Some(from_discard),
            },
            delay,
            difficulty,
            reasoning,
        );
        self.emit(actor, decision)
    }

    pub fn decide_play<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Decision {
        let ctx = prepare(snapshot, self.registry, actor, difficulty, EventKind::PlayCard);
        let delay = self.delay_for(snapshot, EventKind::PlayCard, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::PlayCard,
                DecisionOutcome::Play { card: None },
                delay,
                difficulty,
                missed_reason(EventKind::PlayCard),
            );
            return self.emit(actor, decision);
        }
        if ctx.available_cards.is_empty() {
            let decision = Decision::new(
                EventKind::PlayCard,
                DecisionOutcome::Play { card: None },
                delay,
                difficulty,
                "no cards available",
            );
            return self.emit(actor, decision);
        }

        let probability = self.effective_optimal_probability(snapshot, difficulty);
        let roll: f32 = rng.gen_range(0.0..1.0);
        let should_play_optimal = roll < probability;
        let outcome = interpreter::run(
            self.profile.event_rules(EventKind::PlayCard),
            &ctx,
            should_play_optimal,
            rng,
        );
        let decision = match outcome {
            RuleOutcome::Card { card, rule_name } => Decision::new(
                EventKind::PlayCard,
                DecisionOutcome::Play { card: Some(card) },
                delay,
                difficulty,
                format!("rule '{rule_name}' matched"),
            ),
            RuleOutcome::FallbackCard { card } => Decision::new(
                EventKind::PlayCard,
                DecisionOutcome::Play { card: Some(card) },
                delay,
                difficulty,
                "random fallback from playable cards",
            ),
            RuleOutcome::Pass { rule_name } => Decision::new(
                EventKind::PlayCard,
                DecisionOutcome::Play { card: None },
                delay,
                difficulty,
                format!("rule '{rule_name}' matched"),
            ),
            _ => Decision::new(
                EventKind::PlayCard,
                DecisionOutcome::Play { card: None },
                delay,
                difficulty,
                "no cards available",
            ),
        };
        self.emit(actor, decision)
    }

    pub fn decide_same_rank<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Decision {
        let ctx = prepare(
            snapshot,
            self.registry,
            actor,
            difficulty,
            EventKind::SameRankPlay,
        );
        let delay = self.delay_for(snapshot, EventKind::SameRankPlay, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::SameRankPlay,
                DecisionOutcome::SameRank {
                    play: false,
                    card: None,
                },
                delay,
                difficulty,
                missed_reason(EventKind::SameRankPlay),
            );
            return self.emit(actor, decision);
        }

        let (play, card, reasoning) = self.same_rank_pick(&ctx, rng);
        let decision = Decision::new(
            EventKind::SameRankPlay,
            DecisionOutcome::SameRank { play, card },
            delay,
            difficulty,
            reasoning,
        );
        self.emit(actor, decision)
    }

    pub fn decide_same_rank_by_index<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        hand_slots: &[(usize, CardId)],
        rng: &mut R,
    ) -> Decision {
        let ctx = prepare(
            snapshot,
            self.registry,
            actor,
            difficulty,
            EventKind::SameRankPlayByIndex,
        );
        let delay = self.delay_for(snapshot, EventKind::SameRankPlayByIndex, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::SameRankPlayByIndex,
                DecisionOutcome::SameRankByIndex {
                    play: false,
                    card: None,
                    hand_index: None,
                },
                delay,
                difficulty,
                missed_reason(EventKind::SameRankPlayByIndex),
            );
            return self.emit(actor, decision);
        }

        let (play, card, reasoning) = self.same_rank_pick(&ctx, rng);
        let hand_index = card.as_ref().map(|id| slot_index(hand_slots, id));
        let decision = Decision::new(
            EventKind::SameRankPlayByIndex,
            DecisionOutcome::SameRankByIndex {
                play,
                card,
                hand_index,
            },
            delay,
            difficulty,
            reasoning,
        );
        self.emit(actor, decision)
    }

    pub fn decide_jack_swap<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Decision {
        let ctx = prepare(snapshot, self.registry, actor, difficulty, EventKind::JackSwap);
        let delay = self.delay_for(snapshot, EventKind::JackSwap, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::JackSwap,
                DecisionOutcome::JackSwap {
                    use_power: false,
                    targets: None,
                },
                delay,
                difficulty,
                missed_reason(EventKind::JackSwap),
            );
            return self.emit(actor, decision);
        }

        let decision = match strategy::choose_swap_targets(&ctx, self.profile, rng) {
            Some((targets, kind)) => Decision::new(
                EventKind::JackSwap,
                DecisionOutcome::JackSwap {
                    use_power: true,
                    targets: Some(targets),
                },
                delay,
                difficulty,
                format!("swap strategy '{kind}'"),
            ),
            None => Decision::new(
                EventKind::JackSwap,
                DecisionOutcome::JackSwap {
                    use_power: false,
                    targets: None,
                },
                delay,
                difficulty,
                "no valid swap targets",
            ),
        };
        self.emit(actor, decision)
    }

    pub fn decide_queen_peek<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Decision {
        let ctx = prepare(snapshot, self.registry, actor, difficulty, EventKind::QueenPeek);
        let delay = self.delay_for(snapshot, EventKind::QueenPeek, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::QueenPeek,
                DecisionOutcome::QueenPeek {
                    use_power: false,
                    target: None,
                },
                delay,
                difficulty,
                missed_reason(EventKind::QueenPeek),
            );
            return self.emit(actor, decision);
        }

        let decision = match strategy::choose_peek_target(&ctx, rng) {
            Some((target, kind)) => Decision::new(
                EventKind::QueenPeek,
                DecisionOutcome::QueenPeek {
                    use_power: true,
                    target: Some(target),
                },
                delay,
                difficulty,
                format!("peek strategy '{kind}'"),
            ),
            None => Decision::new(
                EventKind::QueenPeek,
                DecisionOutcome::QueenPeek {
                    use_power: false,
                    target: None,
                },
                delay,
                difficulty,
                "no valid peek targets",
            ),
        };
        self.emit(actor, decision)
    }

    pub fn decide_collect<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        actor: &PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Decision {
        let ctx = prepare(
            snapshot,
            self.registry,
            actor,
            difficulty,
            EventKind::CollectFromDiscard,
        );
        let delay = self.delay_for(snapshot, EventKind::CollectFromDiscard, rng);
        if self.miss_fires(difficulty, rng) {
            let decision = Decision::missed(
                EventKind::CollectFromDiscard,
                DecisionOutcome::Collect { collect: false },
                delay,
                difficulty,
                missed_reason(EventKind::CollectFromDiscard),
            );
            return self.emit(actor, decision);
        }

        let should_play_optimal = self.sample_optimal(difficulty, rng);
        let outcome = interpreter::run(
            self.profile.event_rules(EventKind::CollectFromDiscard),
            &ctx,
            should_play_optimal,
            rng,
        );
        let decision = match outcome {
            RuleOutcome::Collect { rule_name } => {
                let reasoning = match rule_name.as_str() {
                    "collect_if_completes_set" => "completes the collection set".to_owned(),
                    "collect_if_same_rank" => "matches the collection rank".to_owned(),
                    _ => format!("rule '{rule_name}' matched"),
                };
                Decision::new(
                    EventKind::CollectFromDiscard,
                    DecisionOutcome::Collect { collect: true },
                    delay,
                    difficulty,
                    reasoning,
                )
            }
            RuleOutcome::Pass { rule_name } => Decision::new(
                EventKind::CollectFromDiscard,
                DecisionOutcome::Collect { collect: false },
                delay,
                difficulty,
                format!("rule '{rule_name}' matched"),
            ),
            _ => Decision::new(
                EventKind::CollectFromDiscard,
                DecisionOutcome::Collect { collect: false },
                delay,
                difficulty,
                "discard top does not match",
            ),
        };
        self.emit(actor, decision)
    }

    /// Attempt gate, wrong-card gate, then the rule walk. Shared by both
    /// same-rank variants.
    fn same_rank_pick<R: Rng + ?Sized>(
        &self,
        ctx: &DecisionContext<'_>,
        rng: &mut R,
    ) -> (bool, Option<CardId>, String) {
        let attempt: f32 = rng.gen_range(0.0..1.0);
        if attempt >= self.profile.same_rank_play_probability(ctx.difficulty) {
            return (false, None, "declined same-rank attempt".to_owned());
        }
        if ctx.playable_cards.is_empty() {
            return (false, None, "no cards available".to_owned());
        }

        let wrong: f32 = rng.gen_range(0.0..1.0);
        if wrong < self.profile.wrong_rank_probability(ctx.difficulty) {
            if let Some(card) = wrong_rank_candidate(ctx, rng) {
                return (true, Some(card), "wrong-rank gamble".to_owned());
            }
        }

        let should_play_optimal = self.sample_optimal(ctx.difficulty, rng);
        let outcome = interpreter::run(
            self.profile.event_rules(ctx.event),
            ctx,
            should_play_optimal,
            rng,
        );
        match outcome {
            RuleOutcome::Card { card, rule_name } => {
                (true, Some(card), format!("rule '{rule_name}' matched"))
            }
            RuleOutcome::Pass { rule_name } => (false, None, format!("rule '{rule_name}' matched")),
            _ => (false, None, "no matching card".to_owned()),
        }
    }

    /// Base optimal-play probability, scaled down when the turn timer is
    /// nearly out.
    pub(crate) fn effective_optimal_probability(
        &self,
        snapshot: &GameStateView,
        difficulty: Difficulty,
    ) -> f32 {
        let base = self.profile.optimal_play_probability(difficulty);
        let pressured = snapshot
            .turn_seconds_remaining
            .is_some_and(|seconds| seconds < TIME_PRESSURE_THRESHOLD_SECONDS);
        if pressured {
            base * TIME_PRESSURE_FACTOR
        } else {
            base
        }
    }

    fn sample_optimal<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> bool {
        let roll: f32 = rng.gen_range(0.0..1.0);
        roll < self.profile.optimal_play_probability(difficulty)
    }

    fn miss_fires<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> bool {
        let roll: f32 = rng.gen_range(0.0..1.0);
        roll < self.profile.miss_chance(difficulty)
    }

    fn delay_for<R: Rng + ?Sized>(
        &self,
        snapshot: &GameStateView,
        event: EventKind,
        rng: &mut R,
    ) -> f32 {
        let window = snapshot.timers.seconds_for(event.timer_key());
        rng.gen_range(DELAY_WINDOW_LOW..=DELAY_WINDOW_HIGH) * window
    }

    fn emit(&self, actor: &PlayerId, decision: Decision) -> Decision {
        if tracing::enabled!(Level::INFO) {
            event!(
                target: "recall_bot::policy",
                Level::INFO,
                player = %actor,
                action = %decision.action,
                difficulty = %decision.difficulty,
                missed = decision.missed,
                delay_seconds = decision.delay_seconds,
                card = ?decision.outcome.card().map(CardId::as_str),
                reasoning = %decision.reasoning,
            );
        }
        decision
    }
}

fn missed_reason(event: EventKind) -> &'static str {
    match event {
        EventKind::DrawCard => "missed the draw window",
        EventKind::PlayCard => "missed the play window",
        EventKind::SameRankPlay | EventKind::SameRankPlayByIndex => "missed the same-rank window",
        EventKind::JackSwap | EventKind::QueenPeek => "missed the special play window",
        EventKind::CollectFromDiscard => "missed the collect window",
    }
}

/// A known own card whose rank differs from the discard top, if any.
fn wrong_rank_candidate<R: Rng + ?Sized>(
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<CardId> {
    let top = ctx.discard_top?;
    let candidates: Vec<&CardId> = ctx
        .known_cards
        .iter()
        .filter(|id| ctx.rank_of(id) != Some(top.rank))
        .collect();
    candidates.choose(rng).map(|&id| id.clone())
}

/// Map a chosen card back to the caller's hand slot, falling back to the
/// first listed slot when the id has gone stale.
fn slot_index(hand_slots: &[(usize, CardId)], card: &CardId) -> usize {
    if let Some((index, _)) = hand_slots.iter().find(|(_, slot)| slot == card) {
        return *index;
    }
    event!(
        target: "recall_bot::policy",
        Level::DEBUG,
        card = %card,
        "card id not in caller slots, defaulting to first"
    );
    hand_slots.first().map(|(index, _)| *index).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::DecisionPolicy;
    use crate::decision::DecisionOutcome;
    use crate::profile::BotProfile;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use recall_core::model::card::CardId;
    use recall_core::model::difficulty::{Difficulty, PerDifficulty};
    use recall_core::model::rank::Rank;
    use recall_core::model::registry::CardRegistry;
    use recall_core::snapshot::{GameStateView, PlayerId, PlayerView, SeatKind};

    fn bot(id: &str, hand: &[&str]) -> PlayerView {
        let mut player = PlayerView::new(
            id,
            SeatKind::Bot {
                difficulty: Difficulty::Expert,
            },
        );
        player.hand = hand.iter().map(|card| CardId::new(*card)).collect();
        player
    }

    fn learn(state: &mut GameStateView, registry: &CardRegistry, owner: &str, card: &str) {
        let snapshot = registry.get(&CardId::new(card)).cloned().unwrap();
        let player = state.player_mut(&PlayerId::new("p1")).unwrap();
        player
            .known_cards
            .bucket_mut(&PlayerId::new(owner))
            .insert(snapshot);
    }

    fn actor() -> PlayerId {
        PlayerId::new("p1")
    }

    #[test]
    fn missed_decisions_carry_no_card_fields() {
        let registry = CardRegistry::standard();
        let state = GameStateView {
            players: vec![bot("p1", &["2C", "7S"]), bot("p2", &["3C"]), bot("p3", &["4C"])],
            discard_pile: vec![CardId::new("7C")],
            ..GameStateView::default()
        };
        let mut profile = BotProfile::default();
        profile.miss_chance = PerDifficulty::uniform(1.0);
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(2);
        let slots = [(0usize, CardId::new("2C")), (1, CardId::new("7S"))];

        let decisions = [
            policy.decide_draw(&state, &actor(), Difficulty::Hard, &mut rng),
            policy.decide_play(&state, &actor(), Difficulty::Hard, &mut rng),
            policy.decide_same_rank(&state, &actor(), Difficulty::Hard, &mut rng),
            policy.decide_same_rank_by_index(&state, &actor(), Difficulty::Hard, &slots, &mut rng),
            policy.decide_jack_swap(&state, &actor(), Difficulty::Hard, &mut rng),
            policy.decide_queen_peek(&state, &actor(), Difficulty::Hard, &mut rng),
            policy.decide_collect(&state, &actor(), Difficulty::Hard, &mut rng),
        ];
        for decision in decisions {
            assert!(decision.missed, "{:?} should be missed", decision.action);
            assert!(
                decision.outcome.is_blank(),
                "{:?} populated fields on a miss",
                decision.action
            );
            assert!(!decision.reasoning.is_empty());
        }
    }

    #[test]
    fn expert_plays_one_of_the_unknown_cards() {
        let registry = CardRegistry::standard();
        let state = GameStateView {
            players: vec![bot("p1", &["2C", "9D", "KH"])],
            ..GameStateView::default()
        };
        let profile = BotProfile::default();
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(11);
        let decision = policy.decide_play(&state, &actor(), Difficulty::Expert, &mut rng);

        assert!(!decision.missed);
        let card = decision.outcome.card().cloned().unwrap();
        assert!(["2C", "9D", "KH"].contains(&card.as_str()));
        assert_eq!(decision.reasoning, "rule 'play_unknown_random' matched");
    }

    #[test]
    fn empty_hand_play_is_a_noop() {
        let registry = CardRegistry::standard();
        let state = GameStateView {
            players: vec![bot("p1", &[])],
            ..GameStateView::default()
        };
        let profile = BotProfile::default();
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(4);
        let decision = policy.decide_play(&state, &actor(), Difficulty::Expert, &mut rng);
        assert!(!decision.missed);
        assert_eq!(decision.outcome, DecisionOutcome::Play { card: None });
        assert_eq!(decision.reasoning, "no cards available");
    }

    #[test]
    fn draw_gate_picks_discard_only_when_available() {
        let registry = CardRegistry::standard();
        let mut profile = BotProfile::default();
        profile.draw_from_discard = PerDifficulty::uniform(1.0);
        let policy = DecisionPolicy::new(&profile, &registry);

        let with_discard = GameStateView {
            players: vec![bot("p1", &["2C"])],
            discard_pile: vec![CardId::new("7C")],
            ..GameStateView::default()
        };
        let mut rng = SmallRng::seed_from_u64(6);
        let decision = policy.decide_draw(&with_discard, &actor(), Difficulty::Expert, &mut rng);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::Draw {
                from_discard: Some(true)
            }
        );
        assert_eq!(decision.reasoning, "drew from discard pile");

        let empty_discard = GameStateView {
            players: vec![bot("p1", &["2C"])],
            ..GameStateView::default()
        };
        let decision = policy.decide_draw(&empty_discard, &actor(), Difficulty::Expert, &mut rng);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::Draw {
                from_discard: Some(false)
            }
        );
        assert_eq!(decision.reasoning, "drew from deck");
    }

    #[test]
    fn declined_attempt_is_not_a_miss() {
        let registry = CardRegistry::standard();
        let state = GameStateView {
            players: vec![bot("p1", &["7S"])],
            discard_pile: vec![CardId::new("7C")],
            ..GameStateView::default()
        };
        let mut profile = BotProfile::default();
        profile.same_rank_attempt = PerDifficulty::uniform(0.0);
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(3);
        let decision = policy.decide_same_rank(&state, &actor(), Difficulty::Expert, &mut rng);
        assert!(!decision.missed);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::SameRank {
                play: false,
                card: None
            }
        );
        assert_eq!(decision.reasoning, "declined same-rank attempt");
    }

    #[test]
    fn wrong_rank_gamble_plays_a_known_mismatch() {
        let registry = CardRegistry::standard();
        let mut state = GameStateView {
            players: vec![bot("p1", &["KD", "7S"])],
            discard_pile: vec![CardId::new("7C")],
            ..GameStateView::default()
        };
        learn(&mut state, &registry, "p1", "KD");
        let mut profile = BotProfile::default();
        profile.same_rank_attempt = PerDifficulty::uniform(1.0);
        profile.wrong_rank = PerDifficulty::uniform(1.0);
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(8);
        let decision = policy.decide_same_rank(&state, &actor(), Difficulty::Expert, &mut rng);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::SameRank {
                play: true,
                card: Some(CardId::new("KD"))
            }
        );
        assert_eq!(decision.reasoning, "wrong-rank gamble");
    }

    #[test]
    fn same_rank_match_plays_the_known_card() {
        let registry = CardRegistry::standard();
        let mut state = GameStateView {
            players: vec![bot("p1", &["KD", "7S"])],
            discard_pile: vec![CardId::new("7C")],
            ..GameStateView::default()
        };
        learn(&mut state, &registry, "p1", "7S");
        let mut profile = BotProfile::default();
        profile.same_rank_attempt = PerDifficulty::uniform(1.0);
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(8);
        let decision = policy.decide_same_rank(&state, &actor(), Difficulty::Expert, &mut rng);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::SameRank {
                play: true,
                card: Some(CardId::new("7S"))
            }
        );
        assert_eq!(decision.reasoning, "rule 'same_rank_known_match' matched");
    }

    #[test]
    fn stale_card_id_defaults_to_first_slot() {
        let registry = CardRegistry::standard();
        let mut state = GameStateView {
            players: vec![bot("p1", &["KD", "7S"])],
            discard_pile: vec![CardId::new("7C")],
            ..GameStateView::default()
        };
        learn(&mut state, &registry, "p1", "7S");
        let mut profile = BotProfile::default();
        profile.same_rank_attempt = PerDifficulty::uniform(1.0);
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(8);
        // The caller's slot list does not mention 7S at all.
        let slots = [(4usize, CardId::new("QH"))];
        let decision =
            policy.decide_same_rank_by_index(&state, &actor(), Difficulty::Expert, &slots, &mut rng);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::SameRankByIndex {
                play: true,
                card: Some(CardId::new("7S")),
                hand_index: Some(4)
            }
        );
    }

    #[test]
    fn collect_reports_the_completing_rule() {
        let registry = CardRegistry::standard();
        let mut holder = bot("p1", &["7H", "7D", "7S", "2C"]);
        holder.collection_cards = vec![CardId::new("7H"), CardId::new("7D"), CardId::new("7S")];
        holder.collection_rank = Some(Rank::Seven);
        let state = GameStateView {
            players: vec![holder],
            discard_pile: vec![CardId::new("7C")],
            is_clear_and_collect: true,
            ..GameStateView::default()
        };
        let profile = BotProfile::default();
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(5);
        let decision = policy.decide_collect(&state, &actor(), Difficulty::Expert, &mut rng);
        assert_eq!(decision.outcome, DecisionOutcome::Collect { collect: true });
        assert_eq!(decision.reasoning, "completes the collection set");
    }

    #[test]
    fn collect_declines_a_mismatched_top() {
        let registry = CardRegistry::standard();
        let mut holder = bot("p1", &["7H", "2C"]);
        holder.collection_cards = vec![CardId::new("7H")];
        holder.collection_rank = Some(Rank::Seven);
        let state = GameStateView {
            players: vec![holder],
            discard_pile: vec![CardId::new("4D")],
            is_clear_and_collect: true,
            ..GameStateView::default()
        };
        let profile = BotProfile::default();
        let policy = DecisionPolicy::new(&profile, &registry);
        let mut rng = SmallRng::seed_from_u64(5);
        let decision = policy.decide_collect(&state, &actor(), Difficulty::Expert, &mut rng);
        assert_eq!(decision.outcome, DecisionOutcome::Collect { collect: false });
        assert_eq!(decision.reasoning, "discard top does not match");
    }

    #[test]
    fn delay_stays_inside_the_event_window() {
        let registry = CardRegistry::standard();
        let state = GameStateView {
            players: vec![bot("p1", &["2C"])],
            ..GameStateView::default()
        };
        let profile = BotProfile::default();
        let policy = DecisionPolicy::new(&profile, &registry);
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let decision = policy.decide_draw(&state, &actor(), Difficulty::Expert, &mut rng);
            // draw_card window is 10 seconds by default
            assert!(decision.delay_seconds >= 4.0);
            assert!(decision.delay_seconds <= 8.0);
        }
    }

    #[test]
    fn time_pressure_scales_optimal_probability() {
        let registry = CardRegistry::standard();
        let profile = BotProfile::default();
        let policy = DecisionPolicy::new(&profile, &registry);

        let relaxed = GameStateView {
            players: vec![bot("p1", &["2C"])],
            ..GameStateView::default()
        };
        assert_eq!(
            policy.effective_optimal_probability(&relaxed, Difficulty::Expert),
            1.0
        );

        let pressured = GameStateView {
            players: vec![bot("p1", &["2C"])],
            turn_seconds_remaining: Some(5.0),
            ..GameStateView::default()
        };
        assert!(
            (policy.effective_optimal_probability(&pressured, Difficulty::Expert) - 0.7).abs()
                < f32::EPSILON
        );
    }
}
