//! hfwatch core library - daily symptom check-in classification for heart failure monitoring

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Classification is a pure function of (input, baseline, history, config)
// - No global mutable state
// - No randomness or clocks; parallelism only across independent scenarios
// - Scores are always finite and within [0, 10]
// - The verbose flag changes logging only, never results
// - Identical input yields byte-for-byte identical output

pub mod bias;
pub mod category;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod history;
pub mod hysteresis;
pub mod preset;
pub mod report;
pub mod scenarios;
pub mod smoothing;
pub mod summary;
pub mod symptoms;
pub mod thresholds;

pub use category::{map_category, map_category_with_thresholds, Category, CategoryThresholds};
pub use config::ResolvedConfig;
pub use engine::{ClassificationResult, Engine, ResultFlags};
pub use error::ClassifyError;
pub use history::History;
pub use preset::{EngineConfig, Preset};
pub use report::{render_json, render_result_text, render_text, sort_reports, DayReport};
pub use symptoms::{normalize_level, Baseline, RawLevel, Symptom, SymptomLevels, SymptomSet};

/// Classify raw JSON records with the default preset
pub fn classify(
    input: &serde_json::Value,
    baseline: &serde_json::Value,
    history: &serde_json::Value,
) -> error::Result<ClassificationResult> {
    classify_with_config(input, baseline, history, None, false)
}

/// Classify raw JSON records with an optional resolved configuration
pub fn classify_with_config(
    input: &serde_json::Value,
    baseline: &serde_json::Value,
    history: &serde_json::Value,
    resolved_config: Option<&ResolvedConfig>,
    verbose: bool,
) -> error::Result<ClassificationResult> {
    let engine = match resolved_config {
        Some(resolved) => Engine::new(resolved.engine.clone()),
        None => Engine::default(),
    };
    engine.classify_value(input, baseline, history, verbose)
}
