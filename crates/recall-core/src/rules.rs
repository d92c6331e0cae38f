//! Data-driven strategy rules.
//!
//! Rule packs arrive as YAML/JSON documents and deserialize into the typed
//! tree below. Parsing is tolerant where the evaluator must be (unknown
//! operators and context paths survive as inert values so a decision never
//! fails at runtime); [`validate_rules`] reports everything a strict loader
//! should reject.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::model::difficulty::{Difficulty, PerDifficulty};
use crate::model::rank::Rank;
use crate::model::suit::Suit;

/// Context fields a rule may reference, closed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    AvailableCards,
    PlayableCards,
    KnownCards,
    UnknownCards,
    CollectionCards,
    ActingHand,
    ActingCollectionCards,
    ActingCollectionRank,
    DiscardTop,
    DiscardTopRank,
    DiscardTopMatchesCollection,
    DiscardPile,
    DrawPile,
    IsClearAndCollect,
    FinalRoundActive,
    Difficulty,
    OthersWithOneCard,
    OthersWithThreeInCollection,
}

impl ContextField {
    pub const fn as_str(self) -> &'static str {
        match self {
            ContextField::AvailableCards => "available_cards",
            ContextField::PlayableCards => "playable_cards",
            ContextField::KnownCards => "known_cards",
            ContextField::UnknownCards => "unknown_cards",
            ContextField::CollectionCards => "collection_cards",
            ContextField::ActingHand => "acting_player.hand",
            ContextField::ActingCollectionCards => "acting_player.collection_cards",
            ContextField::ActingCollectionRank => "acting_player.collection_rank",
            ContextField::DiscardTop => "discard_top",
            ContextField::DiscardTopRank => "discard_top.rank",
            ContextField::DiscardTopMatchesCollection => "discard_top_matches_collection",
            ContextField::DiscardPile => "discard_pile",
            ContextField::DrawPile => "draw_pile",
            ContextField::IsClearAndCollect => "is_clear_and_collect",
            ContextField::FinalRoundActive => "final_round_active",
            ContextField::Difficulty => "difficulty",
            ContextField::OthersWithOneCard => "other_players_with_one_card",
            ContextField::OthersWithThreeInCollection => "other_players_with_three_in_collection",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let field = match raw.trim() {
            "available_cards" => ContextField::AvailableCards,
            "playable_cards" => ContextField::PlayableCards,
            "known_cards" => ContextField::KnownCards,
            "unknown_cards" => ContextField::UnknownCards,
            "collection_cards" => ContextField::CollectionCards,
            "acting_player.hand" => ContextField::ActingHand,
            "acting_player.collection_cards" => ContextField::ActingCollectionCards,
            "acting_player.collection_rank" => ContextField::ActingCollectionRank,
            "discard_top" => ContextField::DiscardTop,
            "discard_top.rank" => ContextField::DiscardTopRank,
            "discard_top_matches_collection" => ContextField::DiscardTopMatchesCollection,
            "discard_pile" => ContextField::DiscardPile,
            "draw_pile" => ContextField::DrawPile,
            "is_clear_and_collect" => ContextField::IsClearAndCollect,
            "final_round_active" => ContextField::FinalRoundActive,
            "difficulty" => ContextField::Difficulty,
            "other_players_with_one_card" => ContextField::OthersWithOneCard,
            "other_players_with_three_in_collection" => ContextField::OthersWithThreeInCollection,
            _ => return None,
        };
        Some(field)
    }
}

/// A dotted context path as written in rule data. Unknown paths keep their
/// raw spelling, resolve to "missing" at evaluation time, and are reported
/// by [`validate_rules`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    field: Option<ContextField>,
}

impl FieldPath {
    pub fn known(field: ContextField) -> Self {
        Self {
            raw: field.as_str().to_owned(),
            field: Some(field),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub const fn field(&self) -> Option<ContextField> {
        self.field
    }
}

impl From<String> for FieldPath {
    fn from(raw: String) -> Self {
        let field = ContextField::parse(&raw);
        Self { raw, field }
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Leaf comparison operators. An operator string the engine does not know
/// parses to `Unknown`, which always evaluates to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum FieldOp {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    Empty,
    NotEmpty,
    LengthEquals,
    Exists,
    Unknown,
}

impl From<String> for FieldOp {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "equals" => FieldOp::Equals,
            "not_equals" => FieldOp::NotEquals,
            "greater_than" => FieldOp::GreaterThan,
            "less_than" => FieldOp::LessThan,
            "contains" => FieldOp::Contains,
            "empty" => FieldOp::Empty,
            "not_empty" => FieldOp::NotEmpty,
            "length_equals" => FieldOp::LengthEquals,
            "exists" => FieldOp::Exists,
            _ => FieldOp::Unknown,
        }
    }
}

/// Scalar literal on the right-hand side of a leaf comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    Always,
    And { conditions: Vec<ConditionNode> },
    Or { conditions: Vec<ConditionNode> },
    Not { condition: Box<ConditionNode> },
    Field {
        path: FieldPath,
        operator: FieldOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<FieldValue>,
    },
}

impl ConditionNode {
    pub fn field(field: ContextField, operator: FieldOp, value: Option<FieldValue>) -> Self {
        ConditionNode::Field {
            path: FieldPath::known(field),
            operator,
            value,
        }
    }

    pub fn all(conditions: Vec<ConditionNode>) -> Self {
        ConditionNode::And { conditions }
    }

    pub fn any(conditions: Vec<ConditionNode>) -> Self {
        ConditionNode::Or { conditions }
    }

    pub fn negate(self) -> Self {
        ConditionNode::Not {
            condition: Box::new(self),
        }
    }
}

/// Id-list filters applied before a pick strategy. Rank and suit filters
/// resolve ids through the card registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardFilter {
    ExcludeRank { rank: Rank },
    ExcludeSuit { suit: Suit },
    OnlyRank { rank: Rank },
    /// Legacy named filter: drop Jacks so a special card is not wasted on a
    /// plain play.
    ExcludeSpecial,
    /// Keep only cards whose rank matches the discard top.
    SameRankAsDiscard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStrategy {
    #[default]
    Random,
    First,
    Last,
    HighestPoints,
    LowestPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionNode {
    SelectFromSource {
        source: FieldPath,
        #[serde(default)]
        filters: Vec<CardFilter>,
        #[serde(default)]
        pick: PickStrategy,
    },
    UseSpecialPlay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_strategy: Option<String>,
    },
    CollectFromDiscard,
    Skip,
}

impl ActionNode {
    pub fn select(source: ContextField, filters: Vec<CardFilter>, pick: PickStrategy) -> Self {
        ActionNode::SelectFromSource {
            source: FieldPath::known(source),
            filters,
            pick,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// Ascending priority; lower numbers are evaluated first, ties keep
    /// declaration order.
    pub priority: i32,
    pub condition: ConditionNode,
    pub action: ActionNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_probability: Option<PerDifficulty<f32>>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        condition: ConditionNode,
        action: ActionNode,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            condition,
            action,
            execution_probability: None,
        }
    }

    pub fn with_execution_probability(mut self, table: PerDifficulty<f32>) -> Self {
        self.execution_probability = Some(table);
        self
    }
}

/// One problem found in a rule pack by structural validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleIssue {
    EmptyRuleSet,
    DuplicateName { name: String },
    UnknownPath { rule: String, path: String },
    UnknownOperator { rule: String, path: String },
    ProbabilityOutOfRange {
        rule: String,
        difficulty: Difficulty,
        value: f32,
    },
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleIssue::EmptyRuleSet => f.write_str("rule set is empty"),
            RuleIssue::DuplicateName { name } => {
                write!(f, "rule name '{name}' appears more than once")
            }
            RuleIssue::UnknownPath { rule, path } => {
                write!(f, "rule '{rule}' references unknown context path '{path}'")
            }
            RuleIssue::UnknownOperator { rule, path } => {
                write!(f, "rule '{rule}' uses an unknown operator on '{path}'")
            }
            RuleIssue::ProbabilityOutOfRange {
                rule,
                difficulty,
                value,
            } => write!(
                f,
                "rule '{rule}' has execution probability {value} for {difficulty}, expected [0, 1]"
            ),
        }
    }
}

/// Structural validation a strict loader runs after deserializing a pack.
/// The evaluator itself tolerates everything reported here.
pub fn validate_rules(rules: &[Rule]) -> Vec<RuleIssue> {
    let mut issues = Vec::new();
    if rules.is_empty() {
        issues.push(RuleIssue::EmptyRuleSet);
        return issues;
    }

    for (index, rule) in rules.iter().enumerate() {
        if rules[..index].iter().any(|earlier| earlier.name == rule.name) {
            issues.push(RuleIssue::DuplicateName {
                name: rule.name.clone(),
            });
        }

        check_condition(&rule.name, &rule.condition, &mut issues);

        if let ActionNode::SelectFromSource { source, .. } = &rule.action {
            if source.field().is_none() {
                issues.push(RuleIssue::UnknownPath {
                    rule: rule.name.clone(),
                    path: source.raw().to_owned(),
                });
            }
        }

        if let Some(table) = &rule.execution_probability {
            for (difficulty, value) in table.entries() {
                if !(0.0..=1.0).contains(value) {
                    issues.push(RuleIssue::ProbabilityOutOfRange {
                        rule: rule.name.clone(),
                        difficulty,
                        value: *value,
                    });
                }
            }
        }
    }

    issues
}

fn check_condition(rule: &str, condition: &ConditionNode, issues: &mut Vec<RuleIssue>) {
    match condition {
        ConditionNode::Always => {}
        ConditionNode::And { conditions } | ConditionNode::Or { conditions } => {
            for child in conditions {
                check_condition(rule, child, issues);
            }
        }
        ConditionNode::Not { condition } => check_condition(rule, condition, issues),
        ConditionNode::Field {
            path, operator, ..
        } => {
            if path.field().is_none() {
                issues.push(RuleIssue::UnknownPath {
                    rule: rule.to_owned(),
                    path: path.raw().to_owned(),
                });
            }
            if *operator == FieldOp::Unknown {
                issues.push(RuleIssue::UnknownOperator {
                    rule: rule.to_owned(),
                    path: path.raw().to_owned(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ActionNode, CardFilter, ConditionNode, ContextField, FieldOp, FieldValue, PickStrategy,
        Rule, RuleIssue, validate_rules,
    };
    use crate::model::difficulty::PerDifficulty;
    use crate::model::rank::Rank;

    fn sample_rule() -> Rule {
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
    }

    #[test]
    fn rule_round_trips_through_json() {
        let rule = sample_rule()
            .with_execution_probability(PerDifficulty::from_values(0.5, 0.75, 0.9, 1.0));
        let json = serde_json::to_string(&rule).unwrap();
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn condition_deserializes_from_tagged_form() {
        let json = r#"{
            "type": "and",
            "conditions": [
                {"type": "field", "path": "playable_cards", "operator": "not_empty"},
                {"type": "not", "condition": {"type": "field", "path": "is_clear_and_collect", "operator": "equals", "value": true}}
            ]
        }"#;
        let node: ConditionNode = serde_json::from_str(json).unwrap();
        match node {
            ConditionNode::And { conditions } => assert_eq!(conditions.len(), 2),
            other => panic!("expected and-node, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operator_parses_to_unknown() {
        let json = r#"{"type": "field", "path": "playable_cards", "operator": "fuzzy_match"}"#;
        let node: ConditionNode = serde_json::from_str(json).unwrap();
        match node {
            ConditionNode::Field { operator, .. } => assert_eq!(operator, FieldOp::Unknown),
            other => panic!("expected field node, got {other:?}"),
        }
    }

    #[test]
    fn unknown_path_survives_parse_and_fails_validation() {
        let json = r#"{
            "name": "odd_rule",
            "priority": 3,
            "condition": {"type": "field", "path": "players.north.mood", "operator": "exists"},
            "action": {"type": "skip"}
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        let issues = validate_rules(std::slice::from_ref(&rule));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            RuleIssue::UnknownPath { path, .. } if path == "players.north.mood"
        )));
    }

    #[test]
    fn filter_value_literals_parse_as_scalars() {
        let value: FieldValue = serde_json::from_str("3").unwrap();
        assert_eq!(value, FieldValue::Int(3));
        let value: FieldValue = serde_json::from_str("\"jack\"").unwrap();
        assert_eq!(value.as_text(), Some("jack"));
    }

    #[test]
    fn validation_flags_duplicates_and_bad_probabilities() {
        let mut first = sample_rule();
        first.execution_probability = Some(PerDifficulty {
            easy: Some(1.4),
            ..PerDifficulty::default()
        });
        let second = sample_rule();
        let issues = validate_rules(&[first, second]);
        assert!(issues
            .iter()
            .any(|issue| matches!(issue, RuleIssue::DuplicateName { .. })));
        assert!(issues
            .iter()
            .any(|issue| matches!(issue, RuleIssue::ProbabilityOutOfRange { .. })));
    }

    #[test]
    fn empty_rule_set_is_an_issue() {
        assert_eq!(validate_rules(&[]), vec![RuleIssue::EmptyRuleSet]);
    }

    #[test]
    fn exclude_rank_filter_serializes_with_rank_payload() {
        let filter = CardFilter::ExcludeRank { rank: Rank::Jack };
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"type":"exclude_rank","rank":"jack"}"#);
    }
}
