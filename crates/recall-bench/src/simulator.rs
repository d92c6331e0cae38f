//! Deterministic synthetic match driver.
//!
//! This is not a rules-complete game: decisions are applied naively (cards
//! move wherever the decision says), which is enough to keep the table state
//! evolving realistically while the engine's output is recorded.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use recall_bot::decision::{Decision, DecisionOutcome, EventKind};
use recall_bot::knowledge::{CardMove, SwapEvent};
use recall_bot::profile::ProfileError;
use recall_bot::session::BotSession;
use recall_core::model::card::CardId;
use recall_core::model::rank::Rank;
use recall_core::model::registry::CardRegistry;
use recall_core::snapshot::{GameStateView, PlayerId, PlayerView, SwapPair};

use crate::analytics::{AnalyticsCollector, AnalyticsError, AnalyticsSummary};
use crate::config::{ResolvedOutputs, ScenarioConfig};

const HAND_SIZE: usize = 4;
/// Cards each bot looks at before its first turn, as the table rules allow.
const INITIAL_PEEKS: usize = 2;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("scenario defines no bot seats")]
    NoBots,
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("writing decision row: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

/// One line of the decision stream.
#[derive(Debug, Serialize)]
pub struct DecisionRow {
    pub run_id: String,
    pub match_index: usize,
    pub event_index: usize,
    pub match_seed: u64,
    pub player: PlayerId,
    #[serde(flatten)]
    pub decision: Decision,
}

pub struct RunSummary {
    pub master_seed: u64,
    pub matches_played: usize,
    pub decisions_recorded: usize,
    pub analytics: AnalyticsSummary,
    pub decisions_jsonl: PathBuf,
    pub summary_txt: PathBuf,
    pub summary_json: PathBuf,
}

pub struct SimulationRunner {
    config: ScenarioConfig,
    outputs: ResolvedOutputs,
}

impl SimulationRunner {
    pub fn new(config: ScenarioConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        if !config.players.iter().any(|player| player.seat.is_bot()) {
            return Err(RunnerError::NoBots);
        }
        Ok(Self { config, outputs })
    }

    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        for path in [
            &self.outputs.decisions_jsonl,
            &self.outputs.summary_txt,
            &self.outputs.summary_json,
        ] {
            ensure_parent(path)?;
        }

        let master_seed = self.config.matches.seed.unwrap_or_else(rand::random);
        let mut seed_rng = StdRng::seed_from_u64(master_seed);
        let mut writer = BufWriter::new(File::create(&self.outputs.decisions_jsonl)?);
        let mut analytics = AnalyticsCollector::new(&self.config.profile);
        let mut recorded = 0usize;

        for match_index in 0..self.config.matches.count {
            let match_seed = seed_rng.next_u64();
            let rows = self.play_match(match_index, match_seed)?;
            if tracing::enabled!(Level::INFO) {
                event!(
                    target: "recall_bench::simulator",
                    Level::INFO,
                    match_index,
                    match_seed,
                    decisions = rows.len(),
                );
            }
            for row in &rows {
                analytics.record(&row.decision);
                serde_json::to_writer(&mut writer, row)?;
                writer.write_all(b"\n")?;
            }
            recorded += rows.len();
        }
        writer.flush()?;

        let summary = analytics.finalize();
        summary.write_text(&self.outputs.summary_txt)?;
        summary.write_json(&self.outputs.summary_json)?;

        Ok(RunSummary {
            master_seed,
            matches_played: self.config.matches.count,
            decisions_recorded: recorded,
            analytics: summary,
            decisions_jsonl: self.outputs.decisions_jsonl.clone(),
            summary_txt: self.outputs.summary_txt.clone(),
            summary_json: self.outputs.summary_json.clone(),
        })
    }

    fn play_match(
        &self,
        match_index: usize,
        match_seed: u64,
    ) -> Result<Vec<DecisionRow>, RunnerError> {
        let registry = CardRegistry::standard();
        let mut deck = registry.shuffled_ids_with_seed(match_seed);

        let mut state = GameStateView {
            is_clear_and_collect: self.config.matches.clear_and_collect,
            ..GameStateView::default()
        };
        for player in &self.config.players {
            let mut view = PlayerView::new(player.name.as_str(), player.seat);
            for _ in 0..HAND_SIZE {
                if let Some(card) = deck.pop() {
                    view.hand.push(card);
                }
            }
            if state.is_clear_and_collect {
                view.collection_rank = view.hand.first().and_then(|id| registry.rank_of(id));
            }
            state.players.push(view);
        }
        if let Some(card) = deck.pop() {
            state.discard_pile.push(card);
        }
        state.draw_pile = deck;

        let mut session = BotSession::for_match(
            self.config.profile.clone(),
            registry.clone(),
            match_seed,
        )?;
        for player in &state.players {
            if !player.is_bot() {
                continue;
            }
            for card in player.hand.iter().take(INITIAL_PEEKS) {
                if let Some(snapshot) = registry.get(card) {
                    session.note_card_seen(&player.id, &player.id, snapshot.clone());
                }
            }
        }

        let mut driver = MatchDriver {
            registry: &registry,
            session,
            state,
            rows: Vec::new(),
            run_id: &self.config.run_id,
            match_index,
            match_seed,
            budget: self.config.matches.events_per_match,
            log_decisions: self.config.logging.decision_details,
        };

        let bots = driver.bot_seats();
        let mut lap = 0usize;
        while !driver.spent() {
            for actor in &bots {
                driver.turn(actor, lap % 2 == 1);
            }
            if driver.state.draw_pile.is_empty() {
                break;
            }
            lap += 1;
        }

        Ok(driver.rows)
    }
}

/// Walks one match: every bot takes draw/play turns, the other bots answer
/// each play in the same-rank window, jack and queen plays trigger their
/// special decisions, and collect runs when the variant is on.
struct MatchDriver<'a> {
    registry: &'a CardRegistry,
    session: BotSession,
    state: GameStateView,
    rows: Vec<DecisionRow>,
    run_id: &'a str,
    match_index: usize,
    match_seed: u64,
    budget: usize,
    log_decisions: bool,
}

impl MatchDriver<'_> {
    fn bot_seats(&self) -> Vec<PlayerId> {
        self.state
            .players
            .iter()
            .filter(|player| player.is_bot())
            .map(|player| player.id.clone())
            .collect()
    }

    fn spent(&self) -> bool {
        self.rows.len() >= self.budget
    }

    fn push(&mut self, player: &PlayerId, decision: Decision) {
        if self.log_decisions && tracing::enabled!(Level::DEBUG) {
            event!(
                target: "recall_bench::simulator",
                Level::DEBUG,
                match_index = self.match_index,
                event_index = self.rows.len(),
                player = %player,
                action = %decision.action,
                missed = decision.missed,
            );
        }
        let row = DecisionRow {
            run_id: self.run_id.to_owned(),
            match_index: self.match_index,
            event_index: self.rows.len(),
            match_seed: self.match_seed,
            player: player.clone(),
            decision,
        };
        self.rows.push(row);
    }

    fn turn(&mut self, actor: &PlayerId, by_index_window: bool) {
        if self.spent() {
            return;
        }
        self.draw(actor);
        if self.spent() {
            return;
        }
        let played = self.play(actor);
        match played.and_then(|card| self.registry.rank_of(&card)) {
            Some(Rank::Jack) if !self.spent() => self.jack_swap(actor),
            Some(Rank::Queen) if !self.spent() => self.queen_peek(actor),
            _ => {}
        }
        self.same_rank_window(actor, by_index_window);
        if self.state.is_clear_and_collect && !self.spent() {
            self.collect(actor);
        }
    }

    fn draw(&mut self, actor: &PlayerId) {
        let decision = self.session.decide_draw(&self.state, actor);
        if let DecisionOutcome::Draw {
            from_discard: Some(from_discard),
        } = &decision.outcome
        {
            let drawn = if *from_discard {
                self.state.discard_pile.pop()
            } else {
                self.state.draw_pile.pop()
            };
            if let Some(card) = drawn {
                if let Some(snapshot) = self.registry.get(&card) {
                    if *from_discard {
                        // The discard top is public; every bot sees where it went.
                        for observer in self.bot_seats() {
                            self.session.note_card_seen(&observer, actor, snapshot.clone());
                        }
                    } else {
                        self.session.note_card_seen(actor, actor, snapshot.clone());
                    }
                }
                if let Some(player) = self.state.player_mut(actor) {
                    player.hand.push(card);
                }
            }
        }
        self.push(actor, decision);
    }

    fn play(&mut self, actor: &PlayerId) -> Option<CardId> {
        let decision = self.session.decide_play(&self.state, actor);
        let mut played = None;
        if let DecisionOutcome::Play { card: Some(card) } = &decision.outcome {
            if self.take_from_hand(actor, card) {
                self.state.discard_pile.push(card.clone());
                self.session
                    .note_card_played(&self.state, card, EventKind::PlayCard);
                played = Some(card.clone());
            }
        }
        self.push(actor, decision);
        played
    }

    fn same_rank_window(&mut self, actor: &PlayerId, by_index: bool) {
        let others: Vec<PlayerId> = self
            .bot_seats()
            .into_iter()
            .filter(|id| id != actor)
            .collect();
        for other in &others {
            if self.spent() {
                return;
            }
            let decision = if by_index {
                let slots: Vec<(usize, CardId)> = self
                    .state
                    .player(other)
                    .map(|player| player.hand.iter().cloned().enumerate().collect())
                    .unwrap_or_default();
                self.session
                    .decide_same_rank_by_index(&self.state, other, &slots)
            } else {
                self.session.decide_same_rank(&self.state, other)
            };
            let played = match &decision.outcome {
                DecisionOutcome::SameRank {
                    play: true,
                    card: Some(card),
                } => Some(card.clone()),
                DecisionOutcome::SameRankByIndex {
                    play: true,
                    card: Some(card),
                    ..
                } => Some(card.clone()),
                _ => None,
            };
            if let Some(card) = played {
                if self.take_from_hand(other, &card) {
                    self.state.discard_pile.push(card.clone());
                    self.session
                        .note_card_played(&self.state, &card, EventKind::SameRankPlay);
                }
            }
            self.push(other, decision);
        }
    }

    fn jack_swap(&mut self, actor: &PlayerId) {
        let decision = self.session.decide_jack_swap(&self.state, actor);
        if let DecisionOutcome::JackSwap {
            use_power: true,
            targets: Some(targets),
        } = &decision.outcome
        {
            // Stale targets (already played away) void the swap.
            if self.hand_holds(&targets.first_player, &targets.first_card)
                && self.hand_holds(&targets.second_player, &targets.second_card)
            {
                self.take_from_hand(&targets.first_player, &targets.first_card);
                self.take_from_hand(&targets.second_player, &targets.second_card);
                if let Some(player) = self.state.player_mut(&targets.second_player) {
                    player.hand.push(targets.first_card.clone());
                }
                if let Some(player) = self.state.player_mut(&targets.first_player) {
                    player.hand.push(targets.second_card.clone());
                }
                self.state.record_swap(
                    actor,
                    SwapPair::new(targets.first_card.clone(), targets.second_card.clone()),
                );
                let swap = SwapEvent {
                    first: CardMove {
                        card: targets.first_card.clone(),
                        from: targets.first_player.clone(),
                        to: targets.second_player.clone(),
                    },
                    second: CardMove {
                        card: targets.second_card.clone(),
                        from: targets.second_player.clone(),
                        to: targets.first_player.clone(),
                    },
                };
                self.session.note_jack_swap(&self.state, &swap);
            }
        }
        self.push(actor, decision);
    }

    fn queen_peek(&mut self, actor: &PlayerId) {
        let decision = self.session.decide_queen_peek(&self.state, actor);
        if let DecisionOutcome::QueenPeek {
            use_power: true,
            target: Some(target),
        } = &decision.outcome
        {
            if let Some(snapshot) = self.registry.get(&target.card) {
                self.session
                    .note_card_seen(actor, &target.owner, snapshot.clone());
            }
        }
        self.push(actor, decision);
    }

    fn collect(&mut self, actor: &PlayerId) {
        let decision = self.session.decide_collect(&self.state, actor);
        if matches!(decision.outcome, DecisionOutcome::Collect { collect: true }) {
            if let Some(card) = self.state.discard_pile.pop() {
                if let Some(player) = self.state.player_mut(actor) {
                    player.collection_cards.push(card);
                }
            }
        }
        self.push(actor, decision);
    }

    fn take_from_hand(&mut self, owner: &PlayerId, card: &CardId) -> bool {
        let Some(player) = self.state.player_mut(owner) else {
            return false;
        };
        let Some(index) = player.hand.iter().position(|id| id == card) else {
            return false;
        };
        player.hand.remove(index);
        true
    }

    fn hand_holds(&self, owner: &PlayerId, card: &CardId) -> bool {
        self.state
            .player(owner)
            .is_some_and(|player| player.hand.contains(card))
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
