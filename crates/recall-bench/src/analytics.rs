use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use recall_bot::decision::Decision;
use recall_bot::profile::BotProfile;
use recall_core::model::difficulty::Difficulty;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Aggregates the decision stream per difficulty tier.
pub struct AnalyticsCollector {
    profile: BotProfile,
    tiers: HashMap<Difficulty, TierAccumulator>,
}

impl AnalyticsCollector {
    /// The profile supplies the configured miss chances the observed rates
    /// are calibrated against.
    pub fn new(profile: &BotProfile) -> Self {
        Self {
            profile: profile.clone(),
            tiers: HashMap::new(),
        }
    }

    pub fn record(&mut self, decision: &Decision) {
        let acc = self.tiers.entry(decision.difficulty).or_default();
        acc.decisions += 1;
        if decision.missed {
            acc.missed += 1;
        }
        acc.delays.push(f64::from(decision.delay_seconds));
        if let Some(rule) = matched_rule(&decision.reasoning) {
            *acc.rule_hits.entry(rule.to_owned()).or_insert(0) += 1;
        }
    }

    pub fn finalize(mut self) -> AnalyticsSummary {
        let mut tiers = Vec::new();
        for difficulty in Difficulty::ALL {
            if let Some(acc) = self.tiers.remove(&difficulty) {
                let expected = f64::from(self.profile.miss_chance(difficulty));
                tiers.push(acc.into_report(difficulty, expected));
            }
        }

        AnalyticsSummary {
            total_decisions: tiers.iter().map(|tier| tier.decisions).sum(),
            tiers,
        }
    }
}

#[derive(Default)]
struct TierAccumulator {
    decisions: u64,
    missed: u64,
    delays: Vec<f64>,
    rule_hits: HashMap<String, u64>,
}

impl TierAccumulator {
    fn into_report(self, difficulty: Difficulty, expected_miss_rate: f64) -> TierReport {
        let miss_rate = if self.decisions == 0 {
            0.0
        } else {
            self.missed as f64 / self.decisions as f64
        };

        let mean_delay_seconds = if self.delays.is_empty() {
            0.0
        } else {
            self.delays.iter().sum::<f64>() / self.delays.len() as f64
        };

        let delay_ci95 = confidence_interval(&self.delays);
        let miss_calibration_p = miss_calibration(self.missed, self.decisions, expected_miss_rate);

        let mut rule_hits: Vec<RuleHits> = self
            .rule_hits
            .into_iter()
            .map(|(rule, hits)| RuleHits { rule, hits })
            .collect();
        rule_hits.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.rule.cmp(&b.rule)));

        TierReport {
            difficulty,
            decisions: self.decisions,
            missed: self.missed,
            miss_rate,
            expected_miss_rate,
            miss_calibration_p,
            mean_delay_seconds,
            delay_ci95,
            rule_hits,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub total_decisions: u64,
    pub tiers: Vec<TierReport>,
}

impl AnalyticsSummary {
    pub fn render_table(&self) -> String {
        let mut rows = String::new();
        rows.push_str(&format!("Decisions recorded: {}\n\n", self.total_decisions));
        rows.push_str(
            "| Difficulty | Decisions | Missed | Miss % | Expected % | p-value | Mean delay (s) | 95% CI |\n",
        );
        rows.push_str(
            "|------------|-----------|--------|--------|------------|---------|----------------|--------|\n",
        );

        for tier in &self.tiers {
            rows.push_str(&format!(
                "| {difficulty} | {decisions} | {missed} | {miss:.1}% | {expected:.1}% | {pval:.3} | {delay:.3} | [{ci_low:.3}, {ci_high:.3}] |\n",
                difficulty = tier.difficulty,
                decisions = tier.decisions,
                missed = tier.missed,
                miss = tier.miss_rate * 100.0,
                expected = tier.expected_miss_rate * 100.0,
                pval = tier.miss_calibration_p,
                delay = tier.mean_delay_seconds,
                ci_low = tier.delay_ci95.0,
                ci_high = tier.delay_ci95.1,
            ));
        }

        for tier in &self.tiers {
            if tier.rule_hits.is_empty() {
                continue;
            }
            let hits: Vec<String> = tier
                .rule_hits
                .iter()
                .map(|entry| format!("{} x{}", entry.rule, entry.hits))
                .collect();
            rows.push_str(&format!("\nRules ({}): {}\n", tier.difficulty, hits.join(", ")));
        }

        rows
    }

    pub fn write_text(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.render_table()).map_err(|e| AnalyticsError::Io {
            context: "writing summary table",
            source: e,
        })
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), body).map_err(|e| AnalyticsError::Io {
            context: "writing summary json",
            source: e,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierReport {
    pub difficulty: Difficulty,
    pub decisions: u64,
    pub missed: u64,
    pub miss_rate: f64,
    pub expected_miss_rate: f64,
    /// Two-sided p-value that the observed miss count is consistent with the
    /// configured chance (normal approximation).
    pub miss_calibration_p: f64,
    pub mean_delay_seconds: f64,
    pub delay_ci95: (f64, f64),
    pub rule_hits: Vec<RuleHits>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleHits {
    pub rule: String,
    pub hits: u64,
}

/// Rule names are recovered from the reasoning strings the policy emits;
/// misses and fallbacks report prose and are left out by construction.
fn matched_rule(reasoning: &str) -> Option<&str> {
    reasoning.strip_prefix("rule '")?.strip_suffix("' matched")
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

fn miss_calibration(missed: u64, decisions: u64, expected: f64) -> f64 {
    if decisions == 0 {
        return 1.0;
    }
    let n = decisions as f64;
    let observed = missed as f64 / n;
    let variance = expected * (1.0 - expected) / n;
    if variance <= 0.0 {
        // Degenerate chance (0 or 1): any deviation is impossible by config.
        return if (observed - expected).abs() < f64::EPSILON {
            1.0
        } else {
            0.0
        };
    }
    let z = (observed - expected) / variance.sqrt();
    Normal::new(0.0, 1.0)
        .map(|normal| (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0))
        .unwrap_or(1.0)
}
