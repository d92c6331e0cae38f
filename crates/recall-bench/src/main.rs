use std::path::PathBuf;

use clap::Parser;

use recall_bench::config::{OutputsConfig, ResolvedOutputs, ScenarioConfig};
use recall_bench::logging::init_logging;
use recall_bench::simulator::SimulationRunner;

/// Scenario harness for the card-memory bot decision engine.
#[derive(Debug, Parser)]
#[command(
    name = "recall-bench",
    author,
    version,
    about = "Deterministic bot decision harness"
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/scenario.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of matches to simulate.
    #[arg(long, value_name = "COUNT")]
    matches: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Redirect every output artifact into this directory.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Exit after validating the scenario (no simulation is run).
    #[arg(long)]
    validate_only: bool,

    /// Emit one debug event per recorded decision regardless of config.
    #[arg(long)]
    log_decision_details: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ScenarioConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(matches) = cli.matches {
        config.matches.count = matches;
    }

    if let Some(seed) = cli.seed {
        config.matches.seed = Some(seed);
    }

    if let Some(dir) = cli.output.as_deref() {
        config.outputs = OutputsConfig::in_dir(dir);
    }

    if cli.log_decision_details {
        config.logging.decision_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let seat_count = config.players.len();
    let bot_count = config
        .players
        .iter()
        .filter(|player| player.seat.is_bot())
        .count();
    let matches = config.matches.count;

    println!(
        "Loaded scenario '{run_id}' with {seat_count} seat{} ({bot_count} bot{}, {matches} match{})",
        if seat_count == 1 { "" } else { "s" },
        if bot_count == 1 { "" } else { "s" },
        if matches == 1 { "" } else { "es" }
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Simulation complete for '{run_id}': {} match{} (seed {}) → {} decisions at {}",
        summary.matches_played,
        if summary.matches_played == 1 { "" } else { "es" },
        summary.master_seed,
        summary.decisions_recorded,
        summary.decisions_jsonl.display()
    );
    println!("Summary table: {}", summary.summary_txt.display());
    println!("Summary JSON: {}", summary.summary_json.display());
    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.telemetry_path.display());
    }
    for tier in &summary.analytics.tiers {
        println!(
            "  {}: {} decisions, {:.1}% missed (p={:.3}), mean delay {:.2}s",
            tier.difficulty,
            tier.decisions,
            tier.miss_rate * 100.0,
            tier.miss_calibration_p,
            tier.mean_delay_seconds
        );
    }

    Ok(())
}
