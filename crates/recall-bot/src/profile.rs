//! Per-difficulty behaviour profile.
//!
//! A profile is plain data, usually deserialized from the same YAML/JSON pack
//! that carries the rule sets. Every table is sparse: tiers a pack leaves out
//! fall back to the built-in numbers through the getters, so a pack may tune
//! a single probability without restating the rest.

use std::fmt;

use serde::{Deserialize, Serialize};

use recall_core::model::difficulty::{Difficulty, PerDifficulty};
use recall_core::rules::{
    ActionNode, CardFilter, ConditionNode, ContextField, FieldOp, FieldValue, PickStrategy, Rule,
    RuleIssue, validate_rules,
};

use crate::decision::EventKind;
use crate::strategy::SwapStrategyKind;

const MISS_CHANCE: PerDifficulty<f32> = PerDifficulty::from_values(0.30, 0.18, 0.07, 0.0);
const DRAW_FROM_DISCARD: PerDifficulty<f32> = PerDifficulty::from_values(0.20, 0.45, 0.60, 0.75);
const SAME_RANK_ATTEMPT: PerDifficulty<f32> = PerDifficulty::from_values(0.30, 0.55, 0.80, 0.95);
const WRONG_RANK: PerDifficulty<f32> = PerDifficulty::from_values(0.25, 0.12, 0.04, 0.0);
const MEMORY: PerDifficulty<f32> = PerDifficulty::from_values(0.40, 0.70, 0.90, 1.0);
const REPEAT_SWAP_ALLOWANCE: PerDifficulty<f32> = PerDifficulty::from_values(15.0, 8.0, 2.0, 0.0);

const FINAL_ROUND_TRIGGER: PerDifficulty<f32> = PerDifficulty::from_values(20.0, 45.0, 70.0, 90.0);
const COLLECTION_THREE_TRIGGER: PerDifficulty<f32> =
    PerDifficulty::from_values(25.0, 50.0, 75.0, 90.0);
const ONE_CARD_TRIGGER: PerDifficulty<f32> = PerDifficulty::from_values(30.0, 55.0, 80.0, 95.0);
const LOWEST_OPPONENT_TRIGGER: PerDifficulty<f32> =
    PerDifficulty::from_values(30.0, 60.0, 85.0, 95.0);
// The guaranteed fallback fires unconditionally at every tier.
const RANDOM_EXCEPT_OWN_TRIGGER: PerDifficulty<f32> =
    PerDifficulty::from_values(100.0, 100.0, 100.0, 100.0);

/// How deliberately a tier picks cards. The coarse strategy maps to an
/// optimal-play probability; `should_play_optimal` overrides that number
/// without changing the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSelectionKind {
    Random,
    Balanced,
    Optimal,
}

impl CardSelectionKind {
    pub const fn optimal_probability(self) -> f32 {
        match self {
            CardSelectionKind::Random => 0.25,
            CardSelectionKind::Balanced => 0.65,
            CardSelectionKind::Optimal => 1.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            CardSelectionKind::Random => "random",
            CardSelectionKind::Balanced => "balanced",
            CardSelectionKind::Optimal => "optimal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionStyle {
    pub strategy: CardSelectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_play_optimal: Option<f32>,
}

impl SelectionStyle {
    pub const fn of(strategy: CardSelectionKind) -> Self {
        Self {
            strategy,
            should_play_optimal: None,
        }
    }

    pub fn optimal_probability(&self) -> f32 {
        self.should_play_optimal
            .unwrap_or_else(|| self.strategy.optimal_probability())
    }
}

fn default_selection_styles() -> PerDifficulty<SelectionStyle> {
    PerDifficulty::from_values(
        SelectionStyle::of(CardSelectionKind::Random),
        SelectionStyle::of(CardSelectionKind::Balanced),
        SelectionStyle {
            strategy: CardSelectionKind::Optimal,
            should_play_optimal: Some(0.9),
        },
        SelectionStyle::of(CardSelectionKind::Optimal),
    )
}

/// Trigger percentages (0 to 100) for the jack swap strategy chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapTriggerTable {
    #[serde(default = "final_round_trigger")]
    pub final_round_caller_swap: PerDifficulty<f32>,
    #[serde(default = "collection_three_trigger")]
    pub collection_three_swap: PerDifficulty<f32>,
    #[serde(default = "one_card_trigger")]
    pub one_card_player_priority: PerDifficulty<f32>,
    #[serde(default = "lowest_opponent_trigger")]
    pub lowest_opponent_higher_own: PerDifficulty<f32>,
    #[serde(default = "random_except_own_trigger")]
    pub random_except_own: PerDifficulty<f32>,
}

fn final_round_trigger() -> PerDifficulty<f32> {
    FINAL_ROUND_TRIGGER
}

fn collection_three_trigger() -> PerDifficulty<f32> {
    COLLECTION_THREE_TRIGGER
}

fn one_card_trigger() -> PerDifficulty<f32> {
    ONE_CARD_TRIGGER
}

fn lowest_opponent_trigger() -> PerDifficulty<f32> {
    LOWEST_OPPONENT_TRIGGER
}

fn random_except_own_trigger() -> PerDifficulty<f32> {
    RANDOM_EXCEPT_OWN_TRIGGER
}

impl Default for SwapTriggerTable {
    fn default() -> Self {
        Self {
            final_round_caller_swap: FINAL_ROUND_TRIGGER,
            collection_three_swap: COLLECTION_THREE_TRIGGER,
            one_card_player_priority: ONE_CARD_TRIGGER,
            lowest_opponent_higher_own: LOWEST_OPPONENT_TRIGGER,
            random_except_own: RANDOM_EXCEPT_OWN_TRIGGER,
        }
    }
}

impl SwapTriggerTable {
    fn table(&self, kind: SwapStrategyKind) -> &PerDifficulty<f32> {
        match kind {
            SwapStrategyKind::FinalRoundCallerSwap => &self.final_round_caller_swap,
            SwapStrategyKind::CollectionThreeSwap => &self.collection_three_swap,
            SwapStrategyKind::OneCardPlayerPriority => &self.one_card_player_priority,
            SwapStrategyKind::LowestOpponentHigherOwn => &self.lowest_opponent_higher_own,
            SwapStrategyKind::RandomExceptOwn => &self.random_except_own,
        }
    }

    fn builtin(kind: SwapStrategyKind) -> &'static PerDifficulty<f32> {
        match kind {
            SwapStrategyKind::FinalRoundCallerSwap => &FINAL_ROUND_TRIGGER,
            SwapStrategyKind::CollectionThreeSwap => &COLLECTION_THREE_TRIGGER,
            SwapStrategyKind::OneCardPlayerPriority => &ONE_CARD_TRIGGER,
            SwapStrategyKind::LowestOpponentHigherOwn => &LOWEST_OPPONENT_TRIGGER,
            SwapStrategyKind::RandomExceptOwn => &RANDOM_EXCEPT_OWN_TRIGGER,
        }
    }
}

/// Rule packs per rule-driven event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRuleSets {
    #[serde(default = "default_play_card_rules")]
    pub play_card: Vec<Rule>,
    #[serde(default = "default_same_rank_rules")]
    pub same_rank_play: Vec<Rule>,
    #[serde(default = "default_collect_rules")]
    pub collect_from_discard: Vec<Rule>,
}

impl Default for EventRuleSets {
    fn default() -> Self {
        Self {
            play_card: default_play_card_rules(),
            same_rank_play: default_same_rank_rules(),
            collect_from_discard: default_collect_rules(),
        }
    }
}

fn default_play_card_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "play_highest_known",
            1,
            ConditionNode::field(ContextField::KnownCards, FieldOp::NotEmpty, None),
            ActionNode::select(
                ContextField::KnownCards,
                vec![CardFilter::ExcludeSpecial],
                PickStrategy::HighestPoints,
            ),
        )
        .with_execution_probability(PerDifficulty::from_values(0.5, 0.75, 0.9, 1.0)),
        Rule::new(
            "play_unknown_random",
            2,
            ConditionNode::field(ContextField::UnknownCards, FieldOp::NotEmpty, None),
            ActionNode::select(ContextField::UnknownCards, Vec::new(), PickStrategy::Random),
        ),
        Rule::new(
            "play_any_card",
            3,
            ConditionNode::Always,
            ActionNode::select(ContextField::PlayableCards, Vec::new(), PickStrategy::Random),
        ),
    ]
}

fn default_same_rank_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "same_rank_known_match",
            1,
            ConditionNode::field(ContextField::DiscardTop, FieldOp::Exists, None),
            ActionNode::select(
                ContextField::KnownCards,
                vec![CardFilter::SameRankAsDiscard],
                PickStrategy::First,
            ),
        ),
        Rule::new("same_rank_skip", 2, ConditionNode::Always, ActionNode::Skip),
    ]
}

fn default_collect_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "collect_if_completes_set",
            1,
            ConditionNode::all(vec![
                ConditionNode::field(
                    ContextField::DiscardTopMatchesCollection,
                    FieldOp::Equals,
                    Some(FieldValue::from(true)),
                ),
                ConditionNode::field(
                    ContextField::ActingCollectionCards,
                    FieldOp::LengthEquals,
                    Some(FieldValue::from(3i64)),
                ),
            ]),
            ActionNode::CollectFromDiscard,
        ),
        Rule::new(
            "collect_if_same_rank",
            2,
            ConditionNode::field(
                ContextField::DiscardTopMatchesCollection,
                FieldOp::Equals,
                Some(FieldValue::from(true)),
            ),
            ActionNode::CollectFromDiscard,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotProfile {
    #[serde(default)]
    pub miss_chance: PerDifficulty<f32>,
    #[serde(default)]
    pub draw_from_discard: PerDifficulty<f32>,
    #[serde(default)]
    pub same_rank_attempt: PerDifficulty<f32>,
    #[serde(default)]
    pub wrong_rank: PerDifficulty<f32>,
    #[serde(default)]
    pub memory: PerDifficulty<f32>,
    #[serde(default = "default_selection_styles")]
    pub selection_styles: PerDifficulty<SelectionStyle>,
    #[serde(default)]
    pub swap_triggers: SwapTriggerTable,
    #[serde(default)]
    pub repeat_swap_allowance: PerDifficulty<f32>,
    #[serde(default)]
    pub rules: EventRuleSets,
}

impl Default for BotProfile {
    fn default() -> Self {
        Self {
            miss_chance: PerDifficulty::default(),
            draw_from_discard: PerDifficulty::default(),
            same_rank_attempt: PerDifficulty::default(),
            wrong_rank: PerDifficulty::default(),
            memory: PerDifficulty::default(),
            selection_styles: default_selection_styles(),
            swap_triggers: SwapTriggerTable::default(),
            repeat_swap_allowance: PerDifficulty::default(),
            rules: EventRuleSets::default(),
        }
    }
}

impl BotProfile {
    pub fn miss_chance(&self, difficulty: Difficulty) -> f32 {
        self.miss_chance
            .get_or(difficulty, MISS_CHANCE.get_or(difficulty, 0.0))
    }

    pub fn draw_from_discard_probability(&self, difficulty: Difficulty) -> f32 {
        self.draw_from_discard
            .get_or(difficulty, DRAW_FROM_DISCARD.get_or(difficulty, 0.5))
    }

    pub fn same_rank_play_probability(&self, difficulty: Difficulty) -> f32 {
        self.same_rank_attempt
            .get_or(difficulty, SAME_RANK_ATTEMPT.get_or(difficulty, 0.5))
    }

    pub fn wrong_rank_probability(&self, difficulty: Difficulty) -> f32 {
        self.wrong_rank
            .get_or(difficulty, WRONG_RANK.get_or(difficulty, 0.0))
    }

    pub fn memory_probability(&self, difficulty: Difficulty) -> f32 {
        self.memory
            .get_or(difficulty, MEMORY.get_or(difficulty, 1.0))
    }

    pub fn selection_style(&self, difficulty: Difficulty) -> SelectionStyle {
        self.selection_styles.get_or(
            difficulty,
            default_selection_styles().get_or(difficulty, SelectionStyle::of(CardSelectionKind::Balanced)),
        )
    }

    /// Probability that a play-card decision runs the full rule walk rather
    /// than the lazy catch-all.
    pub fn optimal_play_probability(&self, difficulty: Difficulty) -> f32 {
        self.selection_style(difficulty).optimal_probability()
    }

    pub fn swap_trigger(&self, kind: SwapStrategyKind, difficulty: Difficulty) -> f32 {
        self.swap_triggers.table(kind).get_or(
            difficulty,
            SwapTriggerTable::builtin(kind).get_or(difficulty, 100.0),
        )
    }

    pub fn repeat_swap_allowance(&self, difficulty: Difficulty) -> f32 {
        self.repeat_swap_allowance
            .get_or(difficulty, REPEAT_SWAP_ALLOWANCE.get_or(difficulty, 0.0))
    }

    pub fn event_rules(&self, event: EventKind) -> &[Rule] {
        match event {
            EventKind::PlayCard => &self.rules.play_card,
            EventKind::SameRankPlay | EventKind::SameRankPlayByIndex => &self.rules.same_rank_play,
            EventKind::CollectFromDiscard => &self.rules.collect_from_discard,
            _ => &[],
        }
    }

    /// Strict load-time validation. The decision path itself never rejects a
    /// profile; a bad pack should fail before any match starts.
    pub fn validate(&self) -> Result<(), ProfileError> {
        check_unit_table("miss_chance", &self.miss_chance)?;
        check_unit_table("draw_from_discard", &self.draw_from_discard)?;
        check_unit_table("same_rank_attempt", &self.same_rank_attempt)?;
        check_unit_table("wrong_rank", &self.wrong_rank)?;
        check_unit_table("memory", &self.memory)?;

        for (difficulty, style) in self.selection_styles.entries() {
            if let Some(value) = style.should_play_optimal {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ProfileError::ProbabilityOutOfRange {
                        table: "selection_styles.should_play_optimal",
                        difficulty,
                        value,
                    });
                }
            }
        }

        for kind in SwapStrategyKind::ORDERED {
            for (difficulty, value) in self.swap_triggers.table(kind).entries() {
                if !(0.0..=100.0).contains(value) {
                    return Err(ProfileError::TriggerOutOfRange {
                        strategy: kind.as_str(),
                        difficulty,
                        value: *value,
                    });
                }
            }
        }
        for (difficulty, value) in self.repeat_swap_allowance.entries() {
            if !(0.0..=100.0).contains(value) {
                return Err(ProfileError::TriggerOutOfRange {
                    strategy: "repeat_swap_allowance",
                    difficulty,
                    value: *value,
                });
            }
        }

        check_rules("play_card", &self.rules.play_card)?;
        check_rules("same_rank_play", &self.rules.same_rank_play)?;
        check_rules("collect_from_discard", &self.rules.collect_from_discard)?;
        Ok(())
    }
}

fn check_unit_table(table: &'static str, values: &PerDifficulty<f32>) -> Result<(), ProfileError> {
    for (difficulty, value) in values.entries() {
        if !(0.0..=1.0).contains(value) {
            return Err(ProfileError::ProbabilityOutOfRange {
                table,
                difficulty,
                value: *value,
            });
        }
    }
    Ok(())
}

fn check_rules(event: &'static str, rules: &[Rule]) -> Result<(), ProfileError> {
    match validate_rules(rules).into_iter().next() {
        Some(issue) => Err(ProfileError::Rules { event, issue }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    ProbabilityOutOfRange {
        table: &'static str,
        difficulty: Difficulty,
        value: f32,
    },
    TriggerOutOfRange {
        strategy: &'static str,
        difficulty: Difficulty,
        value: f32,
    },
    Rules {
        event: &'static str,
        issue: RuleIssue,
    },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::ProbabilityOutOfRange {
                table,
                difficulty,
                value,
            } => write!(
                f,
                "{table} has probability {value} for {difficulty}, expected [0, 1]"
            ),
            ProfileError::TriggerOutOfRange {
                strategy,
                difficulty,
                value,
            } => write!(
                f,
                "{strategy} has trigger {value} for {difficulty}, expected [0, 100]"
            ),
            ProfileError::Rules { event, issue } => write!(f, "{event}: {issue}"),
        }
    }
}

impl std::error::Error for ProfileError {}

#[cfg(test)]
mod tests {
    use super::{BotProfile, CardSelectionKind, ProfileError};
    use crate::decision::EventKind;
    use crate::strategy::SwapStrategyKind;
    use recall_core::model::difficulty::{Difficulty, PerDifficulty};

    #[test]
    fn built_in_tables_cover_every_tier() {
        let profile = BotProfile::default();
        assert_eq!(profile.miss_chance(Difficulty::Easy), 0.30);
        assert_eq!(profile.miss_chance(Difficulty::Expert), 0.0);
        assert_eq!(profile.memory_probability(Difficulty::Medium), 0.70);
        assert_eq!(profile.draw_from_discard_probability(Difficulty::Hard), 0.60);
        assert_eq!(profile.repeat_swap_allowance(Difficulty::Expert), 0.0);
        assert_eq!(
            profile.swap_trigger(SwapStrategyKind::RandomExceptOwn, Difficulty::Easy),
            100.0
        );
    }

    #[test]
    fn hard_tier_overrides_optimal_probability() {
        let profile = BotProfile::default();
        assert_eq!(profile.optimal_play_probability(Difficulty::Hard), 0.9);
        assert_eq!(profile.optimal_play_probability(Difficulty::Expert), 1.0);
        assert_eq!(profile.optimal_play_probability(Difficulty::Easy), 0.25);
        assert_eq!(
            profile.selection_style(Difficulty::Medium).strategy,
            CardSelectionKind::Balanced
        );
    }

    #[test]
    fn partial_tables_merge_over_builtins() {
        let json = r#"{
            "miss_chance": {"easy": 0.5},
            "swap_triggers": {"one_card_player_priority": {"easy": 10.0}}
        }"#;
        let profile: BotProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.miss_chance(Difficulty::Easy), 0.5);
        assert_eq!(profile.miss_chance(Difficulty::Medium), 0.18);
        assert_eq!(
            profile.swap_trigger(SwapStrategyKind::OneCardPlayerPriority, Difficulty::Easy),
            10.0
        );
        assert_eq!(
            profile.swap_trigger(SwapStrategyKind::OneCardPlayerPriority, Difficulty::Hard),
            80.0
        );
        assert_eq!(
            profile.swap_trigger(SwapStrategyKind::CollectionThreeSwap, Difficulty::Easy),
            25.0
        );
    }

    #[test]
    fn default_rule_packs_pass_validation() {
        let profile = BotProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.event_rules(EventKind::PlayCard).len(), 3);
        assert_eq!(profile.event_rules(EventKind::SameRankPlay).len(), 2);
        assert_eq!(profile.event_rules(EventKind::DrawCard).len(), 0);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let mut profile = BotProfile::default();
        profile.miss_chance = PerDifficulty {
            easy: Some(1.4),
            ..PerDifficulty::default()
        };
        match profile.validate() {
            Err(ProfileError::ProbabilityOutOfRange { table, .. }) => {
                assert_eq!(table, "miss_chance");
            }
            other => panic!("expected range error, got {other:?}"),
        }
    }

    #[test]
    fn empty_rule_set_is_rejected() {
        let mut profile = BotProfile::default();
        profile.rules.play_card.clear();
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::Rules {
                event: "play_card",
                ..
            })
        ));
    }

    #[test]
    fn unknown_action_type_fails_deserialization() {
        let json = r#"{
            "rules": {
                "play_card": [{
                    "name": "odd",
                    "priority": 1,
                    "condition": {"type": "always"},
                    "action": {"type": "summon_dragon"}
                }]
            }
        }"#;
        assert!(serde_json::from_str::<BotProfile>(json).is_err());
    }
}
