//! Ordered rule evaluation.
//!
//! Rules run in ascending priority with early return; a bot that is not
//! playing optimally executes only the last rule, which by convention is the
//! cheap catch-all. Nothing in here errors at decision time: unknown paths
//! resolve to missing, unknown operators evaluate false, and an empty
//! candidate list walks the source, playable, available fallback chain
//! before the event's designated no-op.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{Level, event};

use recall_core::model::card::CardId;
use recall_core::model::rank::Rank;
use recall_core::rules::{
    ActionNode, CardFilter, ConditionNode, FieldOp, FieldValue, PickStrategy, Rule,
};

use crate::context::{DecisionContext, Resolved};
use crate::decision::EventKind;

/// What one interpreter run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// A rule selected this card.
    Card { card: CardId, rule_name: String },
    /// No rule produced a valid result; uniform random pick so selection
    /// events never come back empty-handed.
    FallbackCard { card: CardId },
    Collect { rule_name: String },
    SpecialPlay {
        strategy: Option<String>,
        rule_name: String,
    },
    /// A rule deliberately passed.
    Pass { rule_name: String },
    /// The event's designated no-op.
    NoAction,
}

impl RuleOutcome {
    pub fn rule_name(&self) -> Option<&str> {
        match self {
            RuleOutcome::Card { rule_name, .. }
            | RuleOutcome::Collect { rule_name }
            | RuleOutcome::SpecialPlay { rule_name, .. }
            | RuleOutcome::Pass { rule_name } => Some(rule_name),
            _ => None,
        }
    }
}

pub fn run<R: Rng + ?Sized>(
    rules: &[Rule],
    ctx: &DecisionContext<'_>,
    should_play_optimal: bool,
    rng: &mut R,
) -> RuleOutcome {
    let mut ordered: Vec<&Rule> = rules.iter().collect();
    // Stable sort: priority ties keep declaration order.
    ordered.sort_by_key(|rule| rule.priority);

    if ordered.is_empty() {
        return designated_no_op(ctx, rng);
    }

    if !should_play_optimal {
        // Lazy mode: only the catch-all runs, earlier rules are never seen.
        let last = ordered[ordered.len() - 1];
        event!(
            target: "recall_bot::rules",
            Level::DEBUG,
            rule = %last.name,
            "lazy mode, executing last rule"
        );
        if let Some(outcome) = execute_action(last, ctx, rng) {
            if outcome_is_valid(&outcome, ctx) {
                return outcome;
            }
        }
        return designated_no_op(ctx, rng);
    }

    for rule in ordered {
        if !eval_condition(&rule.condition, ctx) {
            continue;
        }
        if let Some(table) = &rule.execution_probability {
            let threshold = table.get_or(ctx.difficulty, 1.0);
            let roll: f32 = rng.gen_range(0.0..1.0);
            if roll >= threshold {
                event!(
                    target: "recall_bot::rules",
                    Level::DEBUG,
                    rule = %rule.name,
                    threshold,
                    "execution probability gate failed"
                );
                continue;
            }
        }
        let Some(outcome) = execute_action(rule, ctx, rng) else {
            continue;
        };
        if outcome_is_valid(&outcome, ctx) {
            event!(
                target: "recall_bot::rules",
                Level::DEBUG,
                rule = %rule.name,
                "rule matched"
            );
            return outcome;
        }
    }

    designated_no_op(ctx, rng)
}

/// Evaluate a condition tree. Never errors; anything unresolvable is false.
pub fn eval_condition(condition: &ConditionNode, ctx: &DecisionContext<'_>) -> bool {
    match condition {
        ConditionNode::Always => true,
        ConditionNode::And { conditions } => conditions.iter().all(|c| eval_condition(c, ctx)),
        ConditionNode::Or { conditions } => conditions.iter().any(|c| eval_condition(c, ctx)),
        ConditionNode::Not { condition } => !eval_condition(condition, ctx),
        ConditionNode::Field {
            path,
            operator,
            value,
        } => {
            let resolved = path
                .field()
                .map(|field| ctx.resolve(field))
                .unwrap_or(Resolved::Missing);
            eval_field(&resolved, *operator, value.as_ref())
        }
    }
}

fn eval_field(resolved: &Resolved<'_>, operator: FieldOp, value: Option<&FieldValue>) -> bool {
    match operator {
        FieldOp::Exists => !resolved.is_missing(),
        FieldOp::Empty => is_empty(resolved),
        FieldOp::NotEmpty => !is_empty(resolved),
        FieldOp::Equals => equals(resolved, value),
        FieldOp::NotEquals => !equals(resolved, value),
        FieldOp::GreaterThan => compare(resolved, value).is_some_and(|ord| ord > 0.0),
        FieldOp::LessThan => compare(resolved, value).is_some_and(|ord| ord < 0.0),
        FieldOp::Contains => contains(resolved, value),
        FieldOp::LengthEquals => {
            let wanted = value.and_then(FieldValue::as_f64);
            let actual = match resolved {
                Resolved::Missing => Some(0),
                other => other.len(),
            };
            match (actual, wanted) {
                (Some(len), Some(wanted)) => len as f64 == wanted,
                _ => false,
            }
        }
        FieldOp::Unknown => false,
    }
}

fn is_empty(resolved: &Resolved<'_>) -> bool {
    match resolved {
        Resolved::Missing => true,
        Resolved::Text(text) => text.is_empty(),
        other => other.len() == Some(0),
    }
}

fn equals(resolved: &Resolved<'_>, value: Option<&FieldValue>) -> bool {
    let Some(value) = value else {
        return false;
    };
    match resolved {
        Resolved::Bool(actual) => value.as_bool() == Some(*actual),
        Resolved::Text(actual) => value
            .as_text()
            .is_some_and(|wanted| wanted.eq_ignore_ascii_case(actual)),
        _ => false,
    }
}

/// Numeric comparison: list fields compare by length, text by parsed value.
fn compare(resolved: &Resolved<'_>, value: Option<&FieldValue>) -> Option<f64> {
    let wanted = value.and_then(FieldValue::as_f64)?;
    let actual = match resolved {
        Resolved::Ids(_) | Resolved::Players(_) => resolved.len().map(|len| len as f64),
        Resolved::Text(text) => text.parse::<f64>().ok(),
        _ => None,
    }?;
    Some(actual - wanted)
}

fn contains(resolved: &Resolved<'_>, value: Option<&FieldValue>) -> bool {
    let Some(wanted) = value.and_then(FieldValue::as_text) else {
        return false;
    };
    match resolved {
        Resolved::Ids(ids) => ids.iter().any(|id| id.as_str() == wanted),
        Resolved::Players(players) => players.iter().any(|id| id.as_str() == wanted),
        Resolved::Text(text) => text.contains(wanted),
        _ => false,
    }
}

fn execute_action<R: Rng + ?Sized>(
    rule: &Rule,
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<RuleOutcome> {
    match &rule.action {
        ActionNode::SelectFromSource {
            source,
            filters,
            pick,
        } => {
            let primary = source
                .field()
                .map(|field| ctx.resolve(field))
                .unwrap_or(Resolved::Missing);
            let primary_ids: &[CardId] = match &primary {
                Resolved::Ids(ids) => ids,
                _ => &[],
            };

            // Fallback chain: source, then playable, then available, each
            // with the rule's own filters applied.
            let mut candidates = apply_filters(primary_ids, filters, ctx);
            if candidates.is_empty() {
                candidates = apply_filters(&ctx.playable_cards, filters, ctx);
            }
            if candidates.is_empty() {
                candidates = apply_filters(&ctx.available_cards, filters, ctx);
            }
            let card = pick_card(&candidates, *pick, ctx, rng)?;
            Some(RuleOutcome::Card {
                card,
                rule_name: rule.name.clone(),
            })
        }
        ActionNode::UseSpecialPlay { target_strategy } => Some(RuleOutcome::SpecialPlay {
            strategy: target_strategy.clone(),
            rule_name: rule.name.clone(),
        }),
        ActionNode::CollectFromDiscard => Some(RuleOutcome::Collect {
            rule_name: rule.name.clone(),
        }),
        ActionNode::Skip => Some(RuleOutcome::Pass {
            rule_name: rule.name.clone(),
        }),
    }
}

fn apply_filters(ids: &[CardId], filters: &[CardFilter], ctx: &DecisionContext<'_>) -> Vec<CardId> {
    let mut kept: Vec<CardId> = ids.to_vec();
    for filter in filters {
        kept.retain(|id| filter_keeps(filter, id, ctx));
    }
    kept
}

fn filter_keeps(filter: &CardFilter, id: &CardId, ctx: &DecisionContext<'_>) -> bool {
    match filter {
        CardFilter::ExcludeRank { rank } => ctx.rank_of(id) != Some(*rank),
        CardFilter::ExcludeSuit { suit } => ctx.card(id).map(|card| card.suit) != Some(*suit),
        CardFilter::OnlyRank { rank } => ctx.rank_of(id) == Some(*rank),
        CardFilter::ExcludeSpecial => ctx.rank_of(id) != Some(Rank::Jack),
        CardFilter::SameRankAsDiscard => match ctx.discard_top {
            Some(top) => ctx.rank_of(id) == Some(top.rank),
            None => false,
        },
    }
}

fn pick_card<R: Rng + ?Sized>(
    candidates: &[CardId],
    pick: PickStrategy,
    ctx: &DecisionContext<'_>,
    rng: &mut R,
) -> Option<CardId> {
    match pick {
        PickStrategy::Random => candidates.choose(rng).cloned(),
        PickStrategy::First => candidates.first().cloned(),
        PickStrategy::Last => candidates.last().cloned(),
        PickStrategy::HighestPoints => extreme_by_points(candidates, ctx, |a, b| a > b),
        PickStrategy::LowestPoints => extreme_by_points(candidates, ctx, |a, b| a < b),
    }
}

/// Point ties resolve to the first candidate seen.
fn extreme_by_points(
    candidates: &[CardId],
    ctx: &DecisionContext<'_>,
    better: impl Fn(u8, u8) -> bool,
) -> Option<CardId> {
    let mut best: Option<(&CardId, u8)> = None;
    for id in candidates {
        let points = ctx.points_of(id);
        match best {
            None => best = Some((id, points)),
            Some((_, incumbent)) if better(points, incumbent) => best = Some((id, points)),
            Some(_) => {}
        }
    }
    best.map(|(id, _)| id.clone())
}

fn outcome_is_valid(outcome: &RuleOutcome, ctx: &DecisionContext<'_>) -> bool {
    match outcome {
        RuleOutcome::Card { card, .. } => match ctx.event {
            EventKind::PlayCard => {
                ctx.playable_cards.contains(card)
                    || (ctx.playable_cards.is_empty() && ctx.available_cards.contains(card))
            }
            EventKind::SameRankPlay | EventKind::SameRankPlayByIndex => {
                match (ctx.rank_of(card), ctx.discard_top) {
                    (Some(rank), Some(top)) => rank == top.rank,
                    _ => false,
                }
            }
            _ => false,
        },
        RuleOutcome::Collect { .. } => {
            ctx.event == EventKind::CollectFromDiscard && ctx.discard_top_matches_collection
        }
        RuleOutcome::SpecialPlay { .. } => {
            matches!(ctx.event, EventKind::JackSwap | EventKind::QueenPeek)
        }
        RuleOutcome::Pass { .. } => true,
        RuleOutcome::FallbackCard { .. } | RuleOutcome::NoAction => true,
    }
}

/// The per-event no-op when no rule produced a valid result. Plain card
/// selection must never return "no card" while cards exist.
fn designated_no_op<R: Rng + ?Sized>(ctx: &DecisionContext<'_>, rng: &mut R) -> RuleOutcome {
    match ctx.event {
        EventKind::PlayCard => {
            let pool: &[CardId] = if ctx.playable_cards.is_empty() {
                &ctx.available_cards
            } else {
                &ctx.playable_cards
            };
            match pool.choose(rng) {
                Some(card) => RuleOutcome::FallbackCard { card: card.clone() },
                None => RuleOutcome::NoAction,
            }
        }
        _ => RuleOutcome::NoAction,
    }
}
