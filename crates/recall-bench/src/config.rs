use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

use recall_bot::profile::BotProfile;
use recall_core::snapshot::SeatKind;

const DEFAULT_EVENTS_PER_MATCH: usize = 48;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root scenario configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub run_id: String,
    pub matches: MatchConfig,
    pub players: Vec<PlayerConfig>,
    pub outputs: OutputsConfig,
    /// Inline profile override; omitted sections fall back to the built-ins.
    #[serde(default)]
    pub profile: BotProfile,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScenarioConfig {
    /// Load a scenario from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: ScenarioConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the scenario without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.matches.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        validate_players(&self.players)?;
        self.profile
            .validate()
            .map_err(|err| ValidationError::InvalidField {
                field: "profile".to_string(),
                message: err.to_string(),
            })?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            decisions_jsonl: resolve_template(&self.run_id, &self.outputs.decisions_jsonl),
            summary_txt: resolve_template(&self.run_id, &self.outputs.summary_txt),
            summary_json: resolve_template(&self.run_id, &self.outputs.summary_json),
        }
    }
}

/// Match sampling configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MatchConfig {
    pub seed: Option<u64>,
    pub count: usize,
    /// Hard cap on recorded decisions per match; the driver stops early when
    /// the draw pile runs out.
    #[serde(default = "default_events_per_match")]
    pub events_per_match: usize,
    #[serde(default)]
    pub clear_and_collect: bool,
}

impl MatchConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "matches.count".to_string(),
                message: "number of matches must be greater than zero".to_string(),
            });
        }

        if self.events_per_match == 0 {
            return Err(ValidationError::InvalidField {
                field: "matches.events_per_match".to_string(),
                message: "events per match must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn default_events_per_match() -> usize {
    DEFAULT_EVENTS_PER_MATCH
}

/// One seat at the simulated table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerConfig {
    pub name: String,
    pub seat: SeatKind,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub decisions_jsonl: String,
    pub summary_txt: String,
    pub summary_json: String,
}

impl OutputsConfig {
    /// Standard artifact names rooted at one directory, for CLI overrides.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            decisions_jsonl: dir.join("decisions.jsonl").to_string_lossy().into_owned(),
            summary_txt: dir.join("summary.txt").to_string_lossy().into_owned(),
            summary_json: dir.join("summary.json").to_string_lossy().into_owned(),
        }
    }

    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.decisions_jsonl", &self.decisions_jsonl),
            ("outputs.summary_txt", &self.summary_txt),
            ("outputs.summary_json", &self.summary_json),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// Emit one debug event per recorded decision.
    #[serde(default)]
    pub decision_details: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            decision_details: false,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_players(players: &[PlayerConfig]) -> Result<(), ValidationError> {
    if players.len() < 2 {
        return Err(ValidationError::InvalidField {
            field: "players".to_string(),
            message: "at least two seats must be specified".to_string(),
        });
    }

    if !players.iter().any(|player| player.seat.is_bot()) {
        return Err(ValidationError::InvalidField {
            field: "players".to_string(),
            message: "at least one bot seat is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for player in players {
        if player.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "players.name".to_string(),
                message: "player name must not be empty".to_string(),
            });
        }

        if !player.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("players[{}].name", player.name),
                message: "player name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(player.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "players".to_string(),
                message: format!("player name '{}' defined more than once", player.name),
            });
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub decisions_jsonl: PathBuf,
    pub summary_txt: PathBuf,
    pub summary_json: PathBuf,
}

/// Errors surfaced when loading scenario files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse scenario {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid scenario in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::model::difficulty::Difficulty;

    const BASIC_YAML: &str = r#"
run_id: "table_mix"
matches:
  seed: 123
  count: 8
players:
  - name: "north"
    seat:
      kind: bot
      difficulty: easy
  - name: "east"
    seat:
      kind: bot
      difficulty: expert
  - name: "south"
    seat:
      kind: human
outputs:
  decisions_jsonl: "bench/out/{run_id}/decisions.jsonl"
  summary_txt: "bench/out/{run_id}/summary.txt"
  summary_json: "bench/out/{run_id}/summary.json"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: ScenarioConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.matches.events_per_match, DEFAULT_EVENTS_PER_MATCH);
        assert!(!cfg.matches.clear_and_collect);
        assert!(cfg.logging.enable_structured);
        assert_eq!(
            cfg.players[1].seat,
            SeatKind::Bot {
                difficulty: Difficulty::Expert
            }
        );
        assert_eq!(cfg.players[2].seat, SeatKind::Human);

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.decisions_jsonl,
            PathBuf::from("bench/out/table_mix/decisions.jsonl")
        );
    }

    #[test]
    fn rejects_zero_matches() {
        let yaml = BASIC_YAML.replace("count: 8", "count: 0");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "matches.count"
        ));
    }

    #[test]
    fn rejects_duplicate_players() {
        let yaml = BASIC_YAML.replace("- name: \"east\"", "- name: \"north\"");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate players should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "players"
        ));
    }

    #[test]
    fn rejects_all_human_table() {
        let yaml = BASIC_YAML
            .replace("kind: bot\n      difficulty: easy", "kind: human")
            .replace("kind: bot\n      difficulty: expert", "kind: human");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("bot-free table should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "players"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("table_mix", "table mix");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn inline_profile_override_merges_over_builtins() {
        let yaml = format!("{BASIC_YAML}\nprofile:\n  miss_chance:\n    easy: 0.5\n");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("validate");
        assert_eq!(cfg.profile.miss_chance(Difficulty::Easy), 0.5);
        assert_eq!(cfg.profile.miss_chance(Difficulty::Medium), 0.18);
    }

    #[test]
    fn out_of_range_profile_override_is_rejected() {
        let yaml = format!("{BASIC_YAML}\nprofile:\n  miss_chance:\n    easy: 1.5\n");
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("bad profile should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "profile"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/summary.json",
            "bench/out/{run_id}/{run_id}/summary.json",
        );
        let mut cfg: ScenarioConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_json,
            PathBuf::from("bench/out/table_mix/table_mix/summary.json")
        );
    }
}
