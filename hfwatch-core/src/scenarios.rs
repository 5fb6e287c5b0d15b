//! Scenario packs and patient series replay
//!
//! A scenario pack is a JSON array of independent check-ins, each with its
//! own baseline and history and an optional expected alert. Scenarios are
//! classified in parallel; outcomes are reported sorted by id.
//!
//! Global invariants enforced:
//! - Scenarios never share history
//! - Output order is independent of scheduling
//! - Replay appends each complete day strictly after classifying it

use crate::category::Category;
use crate::engine::Engine;
use crate::error::ClassifyError;
use crate::history::History;
use crate::report::DayReport;
use crate::symptoms::{Baseline, SymptomSet};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One validation scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort: Option<String>,
    pub input: serde_json::Value,
    pub baseline: serde_json::Value,
    #[serde(default, alias = "history")]
    pub hist: serde_json::Value,
    #[serde(default, alias = "expectedAlert", skip_serializing_if = "Option::is_none")]
    pub expected_alert: Option<bool>,
}

/// Classification of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort: Option<String>,
    pub category: Category,
    pub normalized_score: f64,
    pub alert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_alert: Option<bool>,
    pub incomplete: bool,
    pub escalation_applied: bool,
}

/// Aggregate statistics over a pack
///
/// Incomplete scenarios are counted separately and excluded from the
/// confusion matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackSummary {
    pub total: usize,
    pub alerts: usize,
    pub incomplete: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    /// TP / (TP + FN); absent without labelled positives
    pub sensitivity: Option<f64>,
    /// TN / (TN + FP); absent without labelled negatives
    pub specificity: Option<f64>,
    pub by_category: BTreeMap<String, usize>,
}

/// Summary plus per-scenario outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackReport {
    pub summary: PackSummary,
    pub outcomes: Vec<ScenarioOutcome>,
}

/// Load a scenario pack: a JSON array, or an object with a `scenarios` array
pub fn load_pack(path: &Path) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario pack: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse scenario pack: {}", path.display()))?;
    let list = match value {
        serde_json::Value::Object(mut obj) => obj
            .remove("scenarios")
            .with_context(|| format!("no \"scenarios\" array in {}", path.display()))?,
        other => other,
    };
    serde_json::from_value(list)
        .with_context(|| format!("invalid scenario list in {}", path.display()))
}

/// Classify every scenario of a pack
pub fn run_pack(engine: &Engine, scenarios: &[Scenario]) -> Result<PackReport> {
    run_pack_with_progress(engine, scenarios, || {})
}

/// Classify every scenario, calling `on_done` once per finished scenario
///
/// The first structural error aborts the run and names the scenario.
pub fn run_pack_with_progress<F>(
    engine: &Engine,
    scenarios: &[Scenario],
    on_done: F,
) -> Result<PackReport>
where
    F: Fn() + Sync,
{
    let mut outcomes = scenarios
        .par_iter()
        .map(|scenario| {
            let outcome = classify_scenario(engine, scenario)
                .with_context(|| format!("scenario {}", scenario.id));
            on_done();
            outcome
        })
        .collect::<Result<Vec<_>>>()?;

    outcomes.sort_by(|a, b| a.id.cmp(&b.id));
    let summary = summarize_outcomes(&outcomes);
    log::info!(
        "scenario pack: {} scenarios, {} alerts, {} incomplete",
        summary.total,
        summary.alerts,
        summary.incomplete
    );

    Ok(PackReport { summary, outcomes })
}

fn classify_scenario(
    engine: &Engine,
    scenario: &Scenario,
) -> std::result::Result<ScenarioOutcome, ClassifyError> {
    let result = engine.classify_value(&scenario.input, &scenario.baseline, &scenario.hist, false)?;
    Ok(ScenarioOutcome {
        id: scenario.id.clone(),
        cohort: scenario.cohort.clone(),
        category: result.category,
        normalized_score: result.normalized_score,
        alert: result.category.is_alert(),
        expected_alert: scenario.expected_alert,
        incomplete: result.flags.incomplete,
        escalation_applied: result.flags.escalation_applied,
    })
}

/// Confusion matrix and category counts
pub fn summarize_outcomes(outcomes: &[ScenarioOutcome]) -> PackSummary {
    let mut summary = PackSummary {
        total: outcomes.len(),
        ..PackSummary::default()
    };

    for outcome in outcomes {
        *summary
            .by_category
            .entry(outcome.category.as_str().to_string())
            .or_insert(0) += 1;
        if outcome.alert {
            summary.alerts += 1;
        }
        if outcome.incomplete {
            summary.incomplete += 1;
            continue;
        }
        match (outcome.expected_alert, outcome.alert) {
            (Some(true), true) => summary.true_positives += 1,
            (Some(true), false) => summary.false_negatives += 1,
            (Some(false), true) => summary.false_positives += 1,
            (Some(false), false) => summary.true_negatives += 1,
            (None, _) => {}
        }
    }

    summary.sensitivity = ratio(
        summary.true_positives,
        summary.true_positives + summary.false_negatives,
    );
    summary.specificity = ratio(
        summary.true_negatives,
        summary.true_negatives + summary.false_positives,
    );
    summary
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// One day of a patient series
#[derive(Debug, Clone, PartialEq)]
pub struct Checkin {
    pub label: Option<String>,
    pub symptoms: SymptomSet,
}

impl Checkin {
    /// Adapt a JSON check-in; `date` or `label` becomes the day label
    pub fn from_value(value: &serde_json::Value) -> crate::error::Result<Self> {
        let symptoms = SymptomSet::from_value(value)?;
        let label = ["date", "label"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(|v| v.as_str().map(str::to_string));
        Ok(Checkin { label, symptoms })
    }
}

/// Result of replaying a series
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub days: Vec<DayReport>,
    /// History after the last recorded day
    pub history: History,
}

/// Run a patient's check-ins in order against a fresh history
///
/// Incomplete days are reported but not recorded.
pub fn replay(
    engine: &Engine,
    baseline: &Baseline,
    checkins: &[Checkin],
    verbose: bool,
) -> crate::error::Result<Replay> {
    let mut history = History::new();
    let mut days = Vec::with_capacity(checkins.len());

    for (i, checkin) in checkins.iter().enumerate() {
        let result = engine.classify(&checkin.symptoms, baseline, &history, verbose)?;
        let recorded = !result.flags.incomplete;
        if recorded {
            history.push(&result);
        }
        days.push(DayReport {
            day: i + 1,
            label: checkin.label.clone(),
            result,
            recorded,
        });
    }

    Ok(Replay { days, history })
}
