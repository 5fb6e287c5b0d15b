//! Classification pipeline
//!
//! normalizer → delta/noise gate → smoother → bias → adaptive cut points →
//! category map → bias promotion → acute escalation → hysteresis
//!
//! Global invariants enforced:
//! - Pure function of (input, baseline, history, config); verbose only logs
//! - Normalized score is clamped to [0, 10] before any guard cap
//! - Noise-guard capped scores never exceed the configured noise cap
//! - Incomplete check-ins short-circuit to Neutral, never Green

use crate::bias::{estimate_bias, BiasEstimate};
use crate::category::{map_category_with_thresholds, Category, CategoryThresholds};
use crate::delta::{compute_deltas, DeltaOutcome};
use crate::error::Result;
use crate::escalation::check_escalation;
use crate::history::History;
use crate::hysteresis::{apply_hysteresis, ClampReason};
use crate::preset::{EngineConfig, Preset};
use crate::smoothing::{smooth, summarize_trend, TrendDirection, TrendSummary};
use crate::summary::{sentence_case, summarize};
use crate::symptoms::{Baseline, LevelIssue, Symptom, SymptomLevels, SymptomSet};
use crate::thresholds::adaptive_thresholds;
use serde::{Deserialize, Serialize};

/// Upper bound of the normalized score
pub const MAX_SCORE: f64 = 10.0;

macro_rules! trace {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            log::debug!($($arg)+);
        }
    };
}

/// Boolean facts about how a result was reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFlags {
    pub noise_guard_active: bool,
    pub escalation_applied: bool,
    /// Orthopnea reported today but not at baseline
    pub orthopnea_flag: bool,
    pub incomplete: bool,
    /// Elevated baseline holding steady; informational only
    pub chronic_stable: bool,
    pub bias_promoted: bool,
    pub hysteresis_clamp: Option<ClampReason>,
}

/// One day's classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    /// Category before hysteresis
    pub proposed_category: Category,
    pub normalized_score: f64,
    pub weighted_symptom_pressure: f64,
    pub trend_score: f64,
    pub bias: f64,
    pub bias_confidence: f64,
    pub ema_days: usize,
    pub thresholds: CategoryThresholds,
    pub flags: ResultFlags,
    pub levels: SymptomLevels,
    pub trend: TrendSummary,
    pub reasons: Vec<String>,
    pub summary: String,
    pub engine_version: String,
}

/// Stateless classification engine
///
/// Holds only its immutable configuration; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine { config }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Engine::new(preset.config())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify raw JSON records
    ///
    /// `history` may be `null` for a patient without prior days.
    pub fn classify_value(
        &self,
        input: &serde_json::Value,
        baseline: &serde_json::Value,
        history: &serde_json::Value,
        verbose: bool,
    ) -> Result<ClassificationResult> {
        let input = SymptomSet::from_value(input)?;
        let baseline = SymptomSet::baseline_from_value(baseline)?;
        let history = History::from_value(history)?;
        self.classify(&input, &baseline, &history, verbose)
    }

    /// Classify one check-in against a baseline and the patient's history
    pub fn classify(
        &self,
        input: &SymptomSet,
        baseline: &Baseline,
        history: &History,
        verbose: bool,
    ) -> Result<ClassificationResult> {
        history.validate()?;
        let cfg = &self.config;

        if !Symptom::SCORED.iter().any(|s| input.is_present(*s)) {
            trace!(verbose, "incomplete check-in: no scored symptom present");
            return Ok(self.incomplete(input));
        }

        let mut reasons = Vec::new();
        data_quality_reasons(input, "", &mut reasons, verbose);
        data_quality_reasons(baseline, "Baseline ", &mut reasons, verbose);
        for symptom in Symptom::SCORED {
            if !input.is_present(symptom) {
                reasons.push(format!(
                    "{} was not reported; treated as none.",
                    sentence_case(symptom.label())
                ));
            }
        }

        let levels = input.levels();
        let baseline_levels = baseline.levels();

        // 1. deltas and noise gate
        let deltas = compute_deltas(&levels, &baseline_levels, history.len(), &cfg.noise_gate);
        trace!(
            verbose,
            "deltas: tolerance={} small_changes={} merged_noise_guard={} ws={:.3} {:?}",
            deltas.tolerance,
            deltas.small_changes,
            deltas.merged_noise_guard,
            deltas.weighted_pressure,
            deltas.deltas
        );
        delta_reasons(&deltas, &mut reasons);

        let new_orthopnea = levels.orthopnea > 0 && baseline_levels.orthopnea == 0;
        if new_orthopnea {
            reasons.push("New shortness of breath when lying flat.".to_string());
        }

        // 2. trend smoothing
        let trend = smooth(
            &history.weighted_symptom_pressures,
            deltas.weighted_pressure,
            &history.normalized_scores,
            &cfg.smoothing,
        );
        trace!(
            verbose,
            "smoothing: ema_days={} extended={} jitter={:.3} trend_score={:.3}",
            trend.ema_days,
            trend.extended,
            trend.jitter,
            trend.trend_score
        );
        if trend.extended {
            reasons.push(format!(
                "Recent scores vary a lot; smoothing window widened to {} days.",
                trend.ema_days
            ));
        }

        // 3. contextual bias
        let bias = estimate_bias(&levels, &baseline_levels, history, &cfg.bias);
        trace!(
            verbose,
            "bias: mild_up={:?} rising={} bias={:.2} confidence={:.2}",
            bias.mild_up,
            bias.rising,
            bias.bias,
            bias.confidence
        );
        reasons.extend(bias.reasons.iter().cloned());

        // 4. composite score and guards
        let mut score = composite_score(deltas.weighted_pressure, trend.trend_score, &bias, cfg);
        if deltas.merged_noise_guard && score > cfg.noise_cap {
            score = cfg.noise_cap;
            reasons.push(format!(
                "Most symptoms are within the usual day-to-day range; score capped at {:.2}.",
                cfg.noise_cap
            ));
        }
        if let Some(cap) = cfg.single_symptom_cap {
            if deltas
                .single_small_driver(cfg.noise_gate.single_driver_ceiling)
                .is_some()
                && score > cap
            {
                score = cap;
                reasons.push(format!(
                    "Only one small change was reported; score capped at {:.2}.",
                    cap
                ));
            }
        }
        trace!(verbose, "score: normalized={:.2}", score);

        // 5. adaptive cut points and mapping
        let adaptive = adaptive_thresholds(&cfg.thresholds, &history.normalized_scores, &cfg.adaptive);
        trace!(
            verbose,
            "thresholds: shift={:.3} std_dev={:?} {:?}",
            adaptive.shift,
            adaptive.std_dev,
            adaptive.thresholds
        );
        if adaptive.shift > 0.0 {
            reasons.push(format!(
                "Category cut points lowered by {:.2} for this patient's score variability.",
                adaptive.shift
            ));
        }
        let mapped = map_category_with_thresholds(score, &adaptive.thresholds);

        let bias_promoted = mapped == Category::Green && bias.promotes(&cfg.bias);
        let mut proposed = if bias_promoted {
            reasons.push("Several symptoms are above their usual level; raised to Yellow.".to_string());
            Category::Yellow
        } else {
            mapped
        };

        // 6. acute escalation
        let escalation = check_escalation(
            &deltas,
            &history.weighted_symptom_pressures,
            new_orthopnea,
            score,
            &cfg.acute,
        );
        trace!(
            verbose,
            "escalation: delta_ws={:.3} core_count={} new_orthopnea={} fired={}",
            escalation.delta_ws,
            escalation.core_count,
            escalation.new_orthopnea,
            escalation.fired
        );
        if escalation.fired {
            let trigger = if escalation.core_count >= 2 {
                "shortness of breath and swelling both worse"
            } else {
                "new orthopnea"
            };
            proposed = escalation.apply(proposed);
            reasons.push(format!(
                "Sharp rise in symptom pressure (+{:.2} over the recent median) with {}; escalated to at least {}.",
                escalation.delta_ws,
                trigger,
                Category::from_rank(escalation.target_rank)
            ));
        }

        // 7. hysteresis
        let held = apply_hysteresis(
            proposed,
            &history.categories,
            &history.normalized_scores,
            &cfg.hysteresis,
        );
        trace!(
            verbose,
            "hysteresis: proposed={} final={} clamp={:?}",
            proposed,
            held.category,
            held.clamp
        );
        match held.clamp {
            Some(ClampReason::CoolDown) => reasons.push(format!(
                "Orange or Red within the last {} days; held at Yellow during cool-down.",
                cfg.hysteresis.cool_down_days
            )),
            Some(ClampReason::Stickiness) => reasons.push(
                "Still easing off after consecutive Yellow days; held at Yellow.".to_string(),
            ),
            None => {}
        }

        let chronic_stable = matches!(held.category, Category::Green | Category::Yellow)
            && !new_orthopnea
            && !escalation.fired
            && deltas.deltas.iter().all(|d| !d.is_worse())
            && Symptom::SCORED
                .iter()
                .any(|s| baseline_levels.get(*s) >= cfg.chronic_baseline_level);
        if chronic_stable {
            reasons.push("Chronic symptoms are holding at their baseline level.".to_string());
        }

        let trend_summary = summarize_trend(&history.normalized_scores, score);

        Ok(ClassificationResult {
            category: held.category,
            proposed_category: proposed,
            normalized_score: score,
            weighted_symptom_pressure: deltas.weighted_pressure,
            trend_score: trend.trend_score,
            bias: bias.bias,
            bias_confidence: bias.confidence,
            ema_days: trend.ema_days,
            thresholds: adaptive.thresholds,
            flags: ResultFlags {
                noise_guard_active: deltas.merged_noise_guard,
                escalation_applied: escalation.fired,
                orthopnea_flag: new_orthopnea,
                incomplete: false,
                chronic_stable,
                bias_promoted,
                hysteresis_clamp: held.clamp,
            },
            summary: summarize(&levels, &baseline_levels, held.category),
            levels,
            trend: trend_summary,
            reasons,
            engine_version: cfg.version.clone(),
        })
    }

    fn incomplete(&self, input: &SymptomSet) -> ClassificationResult {
        ClassificationResult {
            category: Category::Neutral,
            proposed_category: Category::Neutral,
            normalized_score: 0.0,
            weighted_symptom_pressure: 0.0,
            trend_score: 0.0,
            bias: 0.0,
            bias_confidence: 0.0,
            ema_days: self.config.smoothing.ema_days,
            thresholds: self.config.thresholds,
            flags: ResultFlags {
                incomplete: true,
                ..ResultFlags::default()
            },
            levels: input.levels(),
            trend: TrendSummary {
                direction: TrendDirection::Stable,
                slope: 0.0,
                points: 0,
            },
            reasons: vec![
                "Shortness of breath, swelling and fatigue were all missing; not enough information to classify.".to_string(),
            ],
            summary: "Not enough information was reported today to assess your symptoms.".to_string(),
            engine_version: self.config.version.clone(),
        }
    }
}

/// WS + trend − offset + bias, rounded to two decimals and clamped to [0, 10]
fn composite_score(ws: f64, trend: f64, bias: &BiasEstimate, cfg: &EngineConfig) -> f64 {
    let raw = ws + trend - cfg.score_offset + bias.bias;
    let rounded = (raw * 100.0).round() / 100.0;
    if rounded.is_finite() {
        rounded.clamp(0.0, MAX_SCORE)
    } else {
        0.0
    }
}

fn delta_reasons(deltas: &DeltaOutcome, reasons: &mut Vec<String>) {
    for d in &deltas.deltas {
        let steps = d.gated.abs();
        let unit = if (steps - 1.0).abs() < f64::EPSILON {
            "level"
        } else {
            "levels"
        };
        if d.is_worse() {
            reasons.push(format!(
                "{} is {} {} above baseline.",
                sentence_case(d.symptom.label()),
                steps,
                unit
            ));
        } else if d.is_better() {
            reasons.push(format!(
                "{} is {} {} below baseline.",
                sentence_case(d.symptom.label()),
                steps,
                unit
            ));
        }
    }
}

fn data_quality_reasons(set: &SymptomSet, prefix: &str, reasons: &mut Vec<String>, verbose: bool) {
    for (symptom, issue) in set.issues() {
        let detail = match issue {
            LevelIssue::NonFinite => "is not a finite number".to_string(),
            LevelIssue::UnrecognizedLabel(label) => format!("\"{}\" was not recognized", label),
            LevelIssue::Unsupported(kind) => format!("is an {}", kind),
        };
        if verbose {
            log::warn!("{}{} value {}; treated as none", prefix, symptom.as_str(), detail);
        }
        let subject = if prefix.is_empty() {
            sentence_case(symptom.label())
        } else {
            format!("{}{}", prefix, symptom.label())
        };
        reasons.push(format!("{} value {}; treated as none.", subject, detail));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> Engine {
        Engine::default()
    }

    fn set(value: serde_json::Value) -> SymptomSet {
        SymptomSet::from_value(&value).unwrap()
    }

    fn zero() -> SymptomSet {
        set(json!({"sob": 0, "edema": 0, "fatigue": 0}))
    }

    #[test]
    fn test_stable_day_is_green() {
        let r = engine().classify(&zero(), &zero(), &History::new(), false).unwrap();
        assert_eq!(r.category, Category::Green);
        assert_eq!(r.normalized_score, 0.0);
        assert!(r.flags.noise_guard_active);
        assert!(!r.flags.escalation_applied);
        assert_eq!(r.engine_version, "3.9e-FINAL-CL");
    }

    #[test]
    fn test_acute_day_escalates() {
        let input = set(json!({"sob": 3, "edema": 2, "fatigue": 1, "orthopnea": true}));
        let r = engine().classify(&input, &zero(), &History::new(), false).unwrap();
        assert!((r.weighted_symptom_pressure - 6.6).abs() < 1e-9);
        assert_eq!(r.normalized_score, 10.0);
        assert_eq!(r.category, Category::Red);
        assert!(r.flags.escalation_applied);
        assert!(r.flags.orthopnea_flag);
        assert!(!r.flags.noise_guard_active);
    }

    #[test]
    fn test_incomplete_is_neutral() {
        let input = set(json!({"orthopnea": true}));
        let r = engine().classify(&input, &zero(), &History::new(), false).unwrap();
        assert_eq!(r.category, Category::Neutral);
        assert!(r.flags.incomplete);
        assert!(!r.flags.escalation_applied);
        assert_eq!(r.normalized_score, 0.0);
    }

    #[test]
    fn test_partial_input_recorded_in_reasons() {
        let input = set(json!({"sob": 0}));
        let r = engine().classify(&input, &zero(), &History::new(), false).unwrap();
        assert!(!r.flags.incomplete);
        assert!(r.reasons.iter().any(|s| s.starts_with("Swelling was not reported")));
        assert!(r.reasons.iter().any(|s| s.starts_with("Fatigue was not reported")));
    }

    #[test]
    fn test_malformed_value_fails_open_with_reason() {
        let input = set(json!({"sob": "terrible", "edema": 0, "fatigue": 0}));
        let r = engine().classify(&input, &zero(), &History::new(), false).unwrap();
        assert_eq!(r.levels.shortness_of_breath, 0);
        assert_eq!(r.category, Category::Green);
        assert!(r.reasons.iter().any(|s| s.contains("\"terrible\" was not recognized")));
    }

    #[test]
    fn test_noise_cap_bounds_score() {
        // fatigue alone worsens by 3: two small changes keep the guard on
        let input = set(json!({"sob": 0, "edema": 0, "fatigue": 3}));
        let r = engine().classify(&input, &zero(), &History::new(), false).unwrap();
        assert!(r.flags.noise_guard_active);
        assert!(r.normalized_score <= 1.95);
    }

    #[test]
    fn test_cool_down_after_orange() {
        let history = History {
            categories: vec![Category::Green, Category::Orange],
            normalized_scores: vec![0.5, 5.0],
            weighted_symptom_pressures: vec![0.0, 2.2],
            symptom_levels: None,
        };
        let r = engine().classify(&zero(), &zero(), &history, false).unwrap();
        assert_eq!(r.proposed_category, Category::Green);
        assert_eq!(r.category, Category::Yellow);
        assert_eq!(r.flags.hysteresis_clamp, Some(ClampReason::CoolDown));
    }

    #[test]
    fn test_structural_error_propagates() {
        let history = History {
            categories: vec![Category::Green],
            normalized_scores: vec![],
            weighted_symptom_pressures: vec![],
            symptom_levels: None,
        };
        assert!(engine().classify(&zero(), &zero(), &history, false).is_err());
    }

    #[test]
    fn test_classify_value_rejects_non_object() {
        let err = engine()
            .classify_value(&json!("sob"), &json!({}), &serde_json::Value::Null, false)
            .unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn test_verbose_does_not_change_result() {
        let input = set(json!({"sob": 2, "edema": 1, "fatigue": 0}));
        let quiet = engine().classify(&input, &zero(), &History::new(), false).unwrap();
        let loud = engine().classify(&input, &zero(), &History::new(), true).unwrap();
        assert_eq!(quiet, loud);
    }

    #[test]
    fn test_chronic_stable_tag() {
        let baseline = set(json!({"sob": 2, "edema": 1, "fatigue": 1}));
        let r = engine().classify(&baseline, &baseline, &History::new(), false).unwrap();
        assert!(r.flags.chronic_stable);
        assert_eq!(r.category, Category::Green);
    }

    #[test]
    fn test_bias_counts_against_history_levels() {
        let history: History = serde_json::from_value(json!({
            "categories": ["Green", "Green", "Green"],
            "normalizedScores": [0.0, 0.0, 0.0],
            "weightedSymptomPressures": [0.0, 0.0, 0.0],
            "symptomLevels": {"orthopnea": [0, 0, 0]}
        }))
        .unwrap();
        let baseline = set(json!({"sob": 1, "edema": 1, "fatigue": 1, "orthopnea": true}));
        let r = engine().classify(&baseline, &baseline, &history, false).unwrap();
        // only orthopnea is above its recent average
        assert_eq!(r.bias, 0.15);
        assert!(!r.flags.bias_promoted);
    }

    #[test]
    fn test_bias_promotes_green_to_yellow() {
        let history: History = serde_json::from_value(json!({
            "categories": ["Green", "Green", "Green"],
            "normalizedScores": [0.0, 0.0, 0.0],
            "weightedSymptomPressures": [0.0, 0.0, 0.0],
            "symptomLevels": {"sob": [0, 0, 0], "edema": [0, 0, 0], "fatigue": [0, 0, 0]}
        }))
        .unwrap();
        let baseline = set(json!({"sob": 1, "edema": 1, "fatigue": 1}));
        let r = engine().classify(&baseline, &baseline, &history, false).unwrap();
        assert_eq!(r.bias, 0.6);
        assert!((r.normalized_score - 0.55).abs() < 1e-9);
        assert!(r.flags.bias_promoted);
        assert_eq!(r.category, Category::Yellow);
    }
}
