//! hfwatch CLI - offline runner for the check-in classification engine

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hfwatch_core::config::{self, ResolvedConfig};
use hfwatch_core::scenarios::{self, Checkin, PackReport};
use hfwatch_core::{
    render_json, render_result_text, render_text, sort_reports, Engine, Preset, SymptomSet,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hfwatch")]
#[command(about = "Classify daily heart-failure symptom check-ins (Green/Yellow/Orange/Red)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one check-in against a baseline and history
    Classify {
        /// JSON file holding { input, baseline, history? }
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Replay a patient's check-ins in order
    Replay {
        /// JSON file holding { baseline, checkins: [...] }
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Evaluate a scenario pack
    Scenarios {
        /// JSON file holding an array of scenarios
        file: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Validate or inspect configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset version tag (overrides config file)
    #[arg(long)]
    preset: Option<String>,

    /// Emit per-stage diagnostics to stderr
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without classifying anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (preset + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Preset version tag (overrides config file)
        #[arg(long)]
        preset: Option<String>,
    },
    /// List the built-in presets
    Presets,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Deserialize)]
struct ClassifyFile {
    input: serde_json::Value,
    baseline: serde_json::Value,
    #[serde(default, alias = "hist")]
    history: serde_json::Value,
}

#[derive(Deserialize)]
struct ReplayFile {
    baseline: serde_json::Value,
    checkins: Vec<serde_json::Value>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Classify { engine, .. }
        | Commands::Replay { engine, .. }
        | Commands::Scenarios { engine, .. } => engine.verbose,
        Commands::Config { .. } => false,
    };
    init_logging(verbose);

    match cli.command {
        Commands::Classify { file, engine: args } => {
            let engine = build_engine(&args)?;
            let record: ClassifyFile = read_json(&file)?;
            let result = engine
                .classify_value(&record.input, &record.baseline, &record.history, args.verbose)
                .with_context(|| format!("failed to classify {}", file.display()))?;

            match args.format {
                OutputFormat::Text => print!("{}", render_result_text(&result)),
                OutputFormat::Json => println!("{}", render_json(&result)),
            }
        }
        Commands::Replay { file, engine: args } => {
            let engine = build_engine(&args)?;
            let record: ReplayFile = read_json(&file)?;
            let baseline = SymptomSet::baseline_from_value(&record.baseline)
                .with_context(|| format!("invalid baseline in {}", file.display()))?;
            let checkins = record
                .checkins
                .iter()
                .enumerate()
                .map(|(i, value)| {
                    Checkin::from_value(value)
                        .with_context(|| format!("invalid check-in #{} in {}", i + 1, file.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let replay = scenarios::replay(&engine, &baseline, &checkins, args.verbose)
                .with_context(|| format!("failed to replay {}", file.display()))?;
            let days = sort_reports(replay.days);

            match args.format {
                OutputFormat::Text => print!("{}", render_text(&days)),
                OutputFormat::Json => println!("{}", render_json(&days)),
            }
        }
        Commands::Scenarios { file, engine: args } => {
            let engine = build_engine(&args)?;
            let pack = scenarios::load_pack(&file)?;

            let bar = ProgressBar::new(pack.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                    .context("invalid progress template")?
                    .progress_chars("#>-"),
            );
            bar.set_message("classifying");
            let report = scenarios::run_pack_with_progress(&engine, &pack, || bar.inc(1));
            bar.finish_and_clear();
            let report = report?;

            match args.format {
                OutputFormat::Text => print_pack_text(&report),
                OutputFormat::Json => println!("{}", render_json(&report)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let working_dir = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&working_dir, path.as_deref(), None);

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path, preset } => {
                let working_dir = std::env::current_dir()?;
                let resolved =
                    config::load_and_resolve(&working_dir, path.as_deref(), preset.as_deref())
                        .context("failed to load configuration")?;
                print_config(&resolved);
            }
            ConfigAction::Presets => {
                for preset in Preset::ALL {
                    let marker = if preset == Preset::default() {
                        " (default)"
                    } else {
                        ""
                    };
                    println!("{:<14} {}{}", preset.tag(), preset.description(), marker);
                }
            }
        },
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

/// Resolve configuration and report where it came from
fn build_engine(args: &EngineArgs) -> anyhow::Result<Engine> {
    let working_dir = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&working_dir, args.config.as_deref(), args.preset.as_deref())
            .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    log::debug!("engine preset {}", resolved.engine.version);

    Ok(Engine::new(resolved.engine))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_pack_text(report: &PackReport) {
    let s = &report.summary;
    println!("Scenarios:   {}", s.total);
    println!("Alerts:      {}", s.alerts);
    println!("Incomplete:  {}", s.incomplete);
    println!(
        "Confusion:   TP {}  FP {}  TN {}  FN {}",
        s.true_positives, s.false_positives, s.true_negatives, s.false_negatives
    );
    println!("Sensitivity: {}", percent(s.sensitivity));
    println!("Specificity: {}", percent(s.specificity));
    println!();
    println!("By category:");
    for (category, count) in &s.by_category {
        println!("  {:<8} {}", category, count);
    }

    let misses: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| !o.incomplete && o.expected_alert.is_some_and(|e| e != o.alert))
        .collect();
    if !misses.is_empty() {
        println!();
        println!("Mismatches:");
        for o in misses {
            println!(
                "  {:<20} {:<8} {:.2} (expected {})",
                o.id,
                o.category.as_str(),
                o.normalized_score,
                if o.expected_alert == Some(true) {
                    "alert"
                } else {
                    "no alert"
                }
            );
        }
    }
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_config(resolved: &ResolvedConfig) {
    let e = &resolved.engine;
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!("  Preset: {}", resolved.preset);
    println!();
    println!("Noise gate:");
    println!("  tolerance: {} (early {})", e.noise_gate.tolerance_base, e.noise_gate.tolerance_early);
    println!(
        "  gains: worsening {}, improving {}",
        e.noise_gate.worsening_gain, e.noise_gate.improving_gain
    );
    println!("  mild_weight: {}", e.noise_gate.mild_weight);
    println!("  noise_cap: {}", e.noise_cap);
    println!(
        "  single_symptom_cap: {}",
        e.single_symptom_cap
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!();
    println!("Smoothing:");
    println!(
        "  ema_days: {} (extended {} above variance {})",
        e.smoothing.ema_days, e.smoothing.extended_ema_days, e.smoothing.jitter_threshold
    );
    println!();
    println!("Thresholds:");
    println!("  green_max: {}", e.thresholds.green_max);
    println!("  yellow_max: {}", e.thresholds.yellow_max);
    println!("  orange_max: {}", e.thresholds.orange_max);
    println!();
    println!("Acute escalation:");
    println!("  ws_jump: {}", e.acute.ws_jump);
    println!("  core_step: {}", e.acute.core_step);
    println!(
        "  min_score: {}",
        e.acute
            .min_score
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!();
    println!("Hysteresis:");
    println!("  cool_down_days: {}", e.hysteresis.cool_down_days);
    println!("  stickiness_days: {}", e.hysteresis.stickiness_days);
}
