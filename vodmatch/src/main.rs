//! vodmatch - match structure deduction CLI
//!
//! Reads a per-frame OCR export of a fighting-game VOD and writes the
//! reconstructed match/set/round structure as JSON, with an optional
//! plain text summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vodmatch_common::Error;

use vodmatch::config::DeductionConfig;
use vodmatch::report::{build_report, render_summary};
use vodmatch::roster::Roster;
use vodmatch::types::InputDocument;
use vodmatch::workflow::DeductionPipeline;

/// Command-line arguments for vodmatch
#[derive(Parser, Debug)]
#[command(name = "vodmatch")]
#[command(about = "Deduce match/set/round structure from a VOD analysis export")]
#[command(version)]
struct Args {
    /// Analysis export (JSON) produced by the OCR extraction stage
    input: PathBuf,

    /// Output path for the JSON report (default: <input>.matches.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a plain text one-line-per-set summary here
    #[arg(long)]
    summary: Option<PathBuf>,

    /// TOML file with deduction thresholds
    #[arg(long, env = "VODMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file with the character roster (default: built-in SF6 cast)
    #[arg(long)]
    characters: Option<PathBuf>,

    /// JSON file with known player names
    #[arg(long)]
    players: Option<PathBuf>,

    /// Override the fuzzy match similarity cutoff
    #[arg(long)]
    similarity_cutoff: Option<f64>,

    /// Override the timer value that opens a round
    #[arg(long)]
    round_open_timer: Option<u8>,

    /// Override the upward timer jump that ends a round
    #[arg(long)]
    timer_jump: Option<u8>,

    /// Override the minimum spacing between round starts (seconds)
    #[arg(long)]
    round_min_duration: Option<u32>,

    /// Override the minimum timer coverage fraction
    #[arg(long)]
    min_timer_coverage: Option<f64>,

    /// Override the minimum rounds per set
    #[arg(long)]
    set_min_rounds: Option<usize>,

    /// Override the maximum gap between sets of one match (seconds)
    #[arg(long)]
    match_max_set_gap: Option<u32>,

    /// Override the detection silence marking a match break (seconds)
    #[arg(long)]
    detection_timeout: Option<u32>,

    /// Override the sampling dropout tolerated inside a round (seconds)
    #[arg(long)]
    gap_tolerance: Option<u32>,

    /// Verbose engine logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug {
        "vodmatch=debug"
    } else {
        "vodmatch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = resolve_config(&args)?;
    let characters = match &args.characters {
        Some(path) => Roster::load(path)
            .with_context(|| format!("Failed to load character roster {}", path.display()))?,
        None => Roster::sf6_characters(),
    };
    let players = match &args.players {
        Some(path) => Roster::load(path)
            .with_context(|| format!("Failed to load player roster {}", path.display()))?,
        None => Roster::empty(),
    };

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let document: InputDocument = serde_json::from_str(&text)
        .map_err(|e| Error::MalformedInput(format!("{}: {}", args.input.display(), e)))?;
    let frames = document.into_frames();
    info!(frames = frames.len(), input = %args.input.display(), "Loaded analysis export");

    let pipeline = DeductionPipeline::new(config, characters, players)?;
    let result = pipeline.analyze(&frames)?;

    let report = build_report(&result);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    let mut json = serde_json::to_string_pretty(&report).map_err(Error::Json)?;
    json.push('\n');
    std::fs::write(&output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(output = %output.display(), "Wrote match report");

    if let Some(summary_path) = &args.summary {
        std::fs::write(summary_path, render_summary(&result))
            .with_context(|| format!("Failed to write {}", summary_path.display()))?;
        info!(output = %summary_path.display(), "Wrote summary");
    }

    info!(
        matches = result.stats.total_matches_detected,
        sets = result.stats.total_sets_detected,
        rounds = result.stats.total_rounds_detected,
        timer_detection_rate = result.stats.timer_detection_rate,
        "Analysis complete"
    );
    Ok(())
}

/// Base configuration (file or defaults) with CLI overrides applied.
fn resolve_config(args: &Args) -> Result<DeductionConfig> {
    let mut config = match &args.config {
        Some(path) => DeductionConfig::load_toml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DeductionConfig::default(),
    };

    if let Some(value) = args.similarity_cutoff {
        config.similarity_cutoff = value;
    }
    if let Some(value) = args.round_open_timer {
        config.round_open_timer = value;
    }
    if let Some(value) = args.timer_jump {
        config.timer_jump_threshold = value;
    }
    if let Some(value) = args.round_min_duration {
        config.round_min_duration_secs = value;
    }
    if let Some(value) = args.min_timer_coverage {
        config.min_timer_coverage = value;
    }
    if let Some(value) = args.set_min_rounds {
        config.set_min_rounds = value;
    }
    if let Some(value) = args.match_max_set_gap {
        config.match_max_set_gap_secs = value;
    }
    if let Some(value) = args.detection_timeout {
        config.detection_timeout_secs = value;
    }
    if let Some(value) = args.gap_tolerance {
        config.round_gap_tolerance_secs = value;
    }
    config.validate()?;
    Ok(config)
}

/// Default report path next to the input, with any `.export` suffix of
/// the stem stripped: `vod.export.json` becomes `vod.matches.json`.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("analysis");
    let stem = stem.strip_suffix(".export").unwrap_or(stem);
    input.with_file_name(format!("{}.matches.json", stem))
}
