//! Text and JSON rendering of classification results
//!
//! Global invariants enforced:
//! - Deterministic output ordering (by day)
//! - Byte-for-byte identical output across runs

use crate::engine::{ClassificationResult, ResultFlags};
use serde::{Deserialize, Serialize};

/// One classified day of a patient series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    /// 1-based position in the series
    pub day: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
    pub result: ClassificationResult,
    /// Whether the day was appended to the running history
    pub recorded: bool,
}

/// Sort reports deterministically
pub fn sort_reports(mut reports: Vec<DayReport>) -> Vec<DayReport> {
    reports.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.label.cmp(&b.label)));
    reports
}

/// Compact flag codes: N noise guard, E escalated, O new orthopnea,
/// I incomplete, C chronic-stable, B bias promoted, H held by hysteresis
pub fn flag_codes(flags: &ResultFlags) -> String {
    let codes: String = [
        (flags.noise_guard_active, 'N'),
        (flags.escalation_applied, 'E'),
        (flags.orthopnea_flag, 'O'),
        (flags.incomplete, 'I'),
        (flags.chronic_stable, 'C'),
        (flags.bias_promoted, 'B'),
        (flags.hysteresis_clamp.is_some(), 'H'),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, code)| *code)
    .collect();
    if codes.is_empty() {
        "-".to_string()
    } else {
        codes
    }
}

/// Render a series as a fixed-width table
pub fn render_text(reports: &[DayReport]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<5} {:<12} {:<8} {:<7} {:<7} {:<8} {}\n",
        "DAY", "LABEL", "CATEGORY", "SCORE", "WS", "FLAGS", "REASON"
    ));

    for report in reports {
        let r = &report.result;
        let label = report.label.as_deref().unwrap_or("-");
        let reason = r.reasons.first().map(String::as_str).unwrap_or("-");
        let score_str = format!("{:.2}", r.normalized_score);
        let ws_str = format!("{:.2}", r.weighted_symptom_pressure);
        output.push_str(&format!(
            "{:<5} {} {:<8} {:<7} {:<7} {:<8} {}\n",
            report.day,
            truncate_or_pad(label, 12),
            r.category.as_str(),
            score_str,
            ws_str,
            flag_codes(&r.flags),
            reason,
        ));
    }

    output
}

/// Render one result with every reason
pub fn render_result_text(result: &ClassificationResult) -> String {
    let mut output = String::new();
    output.push_str(&format!("Category:   {}\n", result.category));
    if result.proposed_category != result.category {
        output.push_str(&format!("Proposed:   {}\n", result.proposed_category));
    }
    output.push_str(&format!("Score:      {:.2}\n", result.normalized_score));
    output.push_str(&format!(
        "Pressure:   {:.2} (trend {:.2}, EMA {} days)\n",
        result.weighted_symptom_pressure, result.trend_score, result.ema_days
    ));
    if result.bias > 0.0 {
        output.push_str(&format!(
            "Bias:       {:.2} (confidence {:.2})\n",
            result.bias, result.bias_confidence
        ));
    }
    output.push_str(&format!(
        "Cut points: {:.2} / {:.2} / {:.2}\n",
        result.thresholds.green_max, result.thresholds.yellow_max, result.thresholds.orange_max
    ));
    output.push_str(&format!(
        "Trend:      {} ({:+.2} over {} points)\n",
        result.trend.direction.as_str(),
        result.trend.slope,
        result.trend.points
    ));
    output.push_str(&format!("Flags:      {}\n", flag_codes(&result.flags)));
    output.push_str(&format!("Version:    {}\n", result.engine_version));

    if !result.reasons.is_empty() {
        output.push_str("\nReasons:\n");
        for reason in &result.reasons {
            output.push_str(&format!("  - {}\n", reason));
        }
    }
    output.push_str(&format!("\n{}\n", result.summary));
    output
}

/// Render reports as JSON output
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
