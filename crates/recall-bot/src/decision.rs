use core::fmt;

use serde::Serialize;

use recall_core::model::card::CardId;
use recall_core::model::difficulty::Difficulty;
use recall_core::snapshot::{PlayerId, TimerConfig};

/// The decision events the engine answers, one entry point each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DrawCard,
    PlayCard,
    SameRankPlay,
    SameRankPlayByIndex,
    JackSwap,
    QueenPeek,
    CollectFromDiscard,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::DrawCard => "draw_card",
            EventKind::PlayCard => "play_card",
            EventKind::SameRankPlay => "same_rank_play",
            EventKind::SameRankPlayByIndex => "same_rank_play_by_index",
            EventKind::JackSwap => "jack_swap",
            EventKind::QueenPeek => "queen_peek",
            EventKind::CollectFromDiscard => "collect_from_discard",
        }
    }

    /// Timer key feeding the advisory delay. The same-rank window also
    /// covers collect-from-discard; both special plays share one window.
    pub const fn timer_key(self) -> &'static str {
        match self {
            EventKind::DrawCard => TimerConfig::DRAW_CARD,
            EventKind::PlayCard => TimerConfig::PLAY_CARD,
            EventKind::SameRankPlay
            | EventKind::SameRankPlayByIndex
            | EventKind::CollectFromDiscard => TimerConfig::SAME_RANK_WINDOW,
            EventKind::JackSwap | EventKind::QueenPeek => TimerConfig::SPECIAL_PLAY,
        }
    }

    /// Whether the context preparer must build the per-player aggregates.
    pub const fn is_special(self) -> bool {
        matches!(
            self,
            EventKind::JackSwap | EventKind::QueenPeek | EventKind::CollectFromDiscard
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both halves of a proposed jack swap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapTargets {
    pub first_card: CardId,
    pub first_player: PlayerId,
    pub second_card: CardId,
    pub second_player: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeekTarget {
    pub card: CardId,
    pub owner: PlayerId,
}

/// Event-specific outcome fields. A missed decision carries the `None` /
/// `false` shape of its event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Draw {
        from_discard: Option<bool>,
    },
    Play {
        card: Option<CardId>,
    },
    SameRank {
        play: bool,
        card: Option<CardId>,
    },
    SameRankByIndex {
        play: bool,
        card: Option<CardId>,
        hand_index: Option<usize>,
    },
    JackSwap {
        use_power: bool,
        targets: Option<SwapTargets>,
    },
    QueenPeek {
        use_power: bool,
        target: Option<PeekTarget>,
    },
    Collect {
        collect: bool,
    },
}

impl DecisionOutcome {
    /// The single card id this outcome names, when it names one.
    pub fn card(&self) -> Option<&CardId> {
        match self {
            DecisionOutcome::Play { card }
            | DecisionOutcome::SameRank { card, .. }
            | DecisionOutcome::SameRankByIndex { card, .. } => card.as_ref(),
            DecisionOutcome::QueenPeek { target, .. } => target.as_ref().map(|t| &t.card),
            _ => None,
        }
    }

    /// True when no card or target id is populated anywhere.
    pub fn is_blank(&self) -> bool {
        match self {
            DecisionOutcome::Draw { from_discard } => from_discard.is_none(),
            DecisionOutcome::Play { card } => card.is_none(),
            DecisionOutcome::SameRank { card, .. } => card.is_none(),
            DecisionOutcome::SameRankByIndex {
                card, hand_index, ..
            } => card.is_none() && hand_index.is_none(),
            DecisionOutcome::JackSwap { targets, .. } => targets.is_none(),
            DecisionOutcome::QueenPeek { target, .. } => target.is_none(),
            DecisionOutcome::Collect { collect } => !collect,
        }
    }
}

/// What the engine tells the round engine to do. The caller applies it (or
/// ignores it); `delay_seconds` is advisory pacing, the engine never sleeps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: EventKind,
    pub outcome: DecisionOutcome,
    pub delay_seconds: f32,
    pub difficulty: Difficulty,
    pub missed: bool,
    pub reasoning: String,
}

impl Decision {
    pub(crate) fn new(
        action: EventKind,
        outcome: DecisionOutcome,
        delay_seconds: f32,
        difficulty: Difficulty,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            action,
            outcome,
            delay_seconds,
            difficulty,
            missed: false,
            reasoning: reasoning.into(),
        }
    }

    pub(crate) fn missed(
        action: EventKind,
        outcome: DecisionOutcome,
        delay_seconds: f32,
        difficulty: Difficulty,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            missed: true,
            ..Self::new(action, outcome, delay_seconds, difficulty, reasoning)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Decision, DecisionOutcome, EventKind, PeekTarget};
    use recall_core::model::card::CardId;
    use recall_core::model::difficulty::Difficulty;
    use recall_core::snapshot::PlayerId;

    #[test]
    fn timer_keys_share_windows() {
        assert_eq!(EventKind::SameRankPlay.timer_key(), "same_rank_window");
        assert_eq!(
            EventKind::CollectFromDiscard.timer_key(),
            "same_rank_window"
        );
        assert_eq!(EventKind::JackSwap.timer_key(), "special_play");
        assert_eq!(EventKind::QueenPeek.timer_key(), "special_play");
    }

    #[test]
    fn blank_outcomes_have_no_ids() {
        assert!(DecisionOutcome::Play { card: None }.is_blank());
        assert!(
            DecisionOutcome::JackSwap {
                use_power: false,
                targets: None
            }
            .is_blank()
        );
        let peek = DecisionOutcome::QueenPeek {
            use_power: true,
            target: Some(PeekTarget {
                card: CardId::new("2C"),
                owner: PlayerId::new("p2"),
            }),
        };
        assert!(!peek.is_blank());
        assert_eq!(peek.card(), Some(&CardId::new("2C")));
    }

    #[test]
    fn decision_serializes_with_event_name() {
        let decision = Decision::new(
            EventKind::PlayCard,
            DecisionOutcome::Play {
                card: Some(CardId::new("9D")),
            },
            4.2,
            Difficulty::Hard,
            "rule 'play_highest_known' matched",
        );
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"action\":\"play_card\""));
        assert!(json.contains("\"card\":\"9D\""));
        assert!(json.contains("\"missed\":false"));
    }
}
