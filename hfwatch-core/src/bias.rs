//! Contextual bias from symptoms running above the patient's own average
//!
//! A symptom is "mild-up" when today's level is strictly above its recent
//! average. The recent average comes from the history level series when the
//! caller tracks them, otherwise from the baseline level.

use crate::history::History;
use crate::smoothing::{mean, tail};
use crate::summary::sentence_case;
use crate::symptoms::{Symptom, SymptomLevels};
use serde::{Deserialize, Serialize};

/// Number of recent scores inspected for a rising trend
const RISING_WINDOW: usize = 3;

/// Bias tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasConfig {
    /// Bias for one, two, and three or more mild-up symptoms
    pub steps: [f64; 3],
    /// Added when the recent score trend is rising
    pub trend_bonus: f64,
    pub cap: f64,
    /// Bias above which a Green proposal is promoted to Yellow
    pub promotion: f64,
    /// Days of per-symptom history in the recent average
    pub rolling_window: usize,
    /// First-to-last rise over the last three scores that counts as rising
    pub trend_rise: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        BiasConfig {
            steps: [0.15, 0.35, 0.6],
            trend_bonus: 0.15,
            cap: 0.8,
            promotion: 0.5,
            rolling_window: 7,
            trend_rise: 0.3,
        }
    }
}

/// Output of the bias estimator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasEstimate {
    pub mild_up: Vec<Symptom>,
    pub rising: bool,
    pub bias: f64,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl BiasEstimate {
    pub fn none() -> Self {
        BiasEstimate {
            mild_up: Vec::new(),
            rising: false,
            bias: 0.0,
            confidence: 0.0,
            reasons: Vec::new(),
        }
    }

    /// Whether this bias is strong enough to lift Green to Yellow
    pub fn promotes(&self, config: &BiasConfig) -> bool {
        self.bias > config.promotion
    }
}

/// Recent average level of one symptom
pub fn recent_average(
    symptom: Symptom,
    history: &History,
    baseline: &SymptomLevels,
    window: usize,
) -> f64 {
    match history.levels_of(symptom) {
        Some(series) => {
            let recent: Vec<f64> = tail(series, window).iter().map(|l| f64::from(*l)).collect();
            mean(&recent)
        }
        None => f64::from(baseline.get(symptom)),
    }
}

/// Whether the last few normalized scores rose by at least `rise`
pub fn is_rising(scores: &[f64], rise: f64) -> bool {
    let recent = tail(scores, RISING_WINDOW);
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if recent.len() >= 2 => last - first >= rise,
        _ => false,
    }
}

/// Estimate the contextual bias for today's levels
pub fn estimate_bias(
    levels: &SymptomLevels,
    baseline: &SymptomLevels,
    history: &History,
    config: &BiasConfig,
) -> BiasEstimate {
    let mut mild_up = Vec::new();
    let mut reasons = Vec::new();
    for symptom in Symptom::CONTEXTUAL {
        let average = recent_average(symptom, history, baseline, config.rolling_window);
        if f64::from(levels.get(symptom)) > average {
            mild_up.push(symptom);
            reasons.push(format!("{} is higher than usual.", sentence_case(symptom.label())));
        }
    }

    if mild_up.is_empty() {
        return BiasEstimate::none();
    }

    let rising = is_rising(&history.normalized_scores, config.trend_rise);
    let step = config.steps[mild_up.len().min(config.steps.len()) - 1];
    let mut bias = step;
    if rising {
        bias += config.trend_bonus;
        reasons.push("Recent scores are trending up.".to_string());
    }
    let bias = bias.min(config.cap);
    let confidence = (0.3 * mild_up.len() as f64 + if rising { 0.2 } else { 0.0 }).min(1.0);

    BiasEstimate {
        mild_up,
        rising,
        bias,
        confidence,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    fn levels(sob: u8, edema: u8, fatigue: u8, orthopnea: u8) -> SymptomLevels {
        SymptomLevels {
            shortness_of_breath: sob,
            edema,
            fatigue,
            orthopnea,
            palpitations: 0,
        }
    }

    #[test]
    fn test_no_mild_up_no_bias() {
        let est = estimate_bias(
            &levels(1, 1, 1, 0),
            &levels(1, 1, 1, 0),
            &History::new(),
            &BiasConfig::default(),
        );
        assert_eq!(est, BiasEstimate::none());
    }

    #[test]
    fn test_steps_by_count() {
        let cfg = BiasConfig::default();
        let base = levels(0, 0, 0, 0);
        let h = History::new();
        assert_eq!(estimate_bias(&levels(1, 0, 0, 0), &base, &h, &cfg).bias, 0.15);
        assert_eq!(estimate_bias(&levels(1, 1, 0, 0), &base, &h, &cfg).bias, 0.35);
        assert_eq!(estimate_bias(&levels(1, 1, 1, 0), &base, &h, &cfg).bias, 0.6);
        assert_eq!(estimate_bias(&levels(1, 1, 1, 2), &base, &h, &cfg).bias, 0.6);
    }

    #[test]
    fn test_rising_trend_adds_bonus_and_caps() {
        let h = History {
            categories: vec![Category::Green; 3],
            normalized_scores: vec![0.5, 1.0, 1.5],
            weighted_symptom_pressures: vec![0.0; 3],
            symptom_levels: None,
        };
        let est = estimate_bias(
            &levels(1, 1, 1, 2),
            &levels(0, 0, 0, 0),
            &h,
            &BiasConfig::default(),
        );
        assert!(est.rising);
        assert!((est.bias - 0.75).abs() < 1e-12);
        assert!((est.confidence - 1.0).abs() < 1e-12);

        let capped = BiasConfig {
            cap: 0.7,
            ..BiasConfig::default()
        };
        let est = estimate_bias(&levels(1, 1, 1, 0), &levels(0, 0, 0, 0), &h, &capped);
        assert_eq!(est.bias, 0.7);
    }

    #[test]
    fn test_recent_average_prefers_history_levels() {
        let h: History = serde_json::from_value(serde_json::json!({
            "categories": ["Green", "Green"],
            "normalizedScores": [0.0, 0.0],
            "weightedSymptomPressures": [0.0, 0.0],
            "symptomLevels": {"sob": [2, 2]}
        }))
        .unwrap();
        let base = levels(0, 0, 0, 0);
        assert_eq!(recent_average(Symptom::ShortnessOfBreath, &h, &base, 7), 2.0);
        // no series for edema, baseline used
        assert_eq!(recent_average(Symptom::Edema, &h, &base, 7), 0.0);

        let est = estimate_bias(&levels(2, 0, 0, 0), &base, &h, &BiasConfig::default());
        assert!(est.mild_up.is_empty());
    }

    #[test]
    fn test_is_rising() {
        assert!(!is_rising(&[], 0.3));
        assert!(!is_rising(&[5.0], 0.3));
        assert!(is_rising(&[1.0, 1.3], 0.3));
        assert!(!is_rising(&[2.0, 1.0, 2.1], 0.3));
    }

    #[test]
    fn test_promotion_threshold() {
        let cfg = BiasConfig::default();
        let mut est = BiasEstimate::none();
        est.bias = 0.5;
        assert!(!est.promotes(&cfg));
        est.bias = 0.6;
        assert!(est.promotes(&cfg));
    }

    #[test]
    fn test_reasons_name_symptoms() {
        let est = estimate_bias(
            &levels(0, 2, 0, 0),
            &levels(0, 0, 0, 0),
            &History::new(),
            &BiasConfig::default(),
        );
        assert_eq!(est.reasons, vec!["Swelling is higher than usual.".to_string()]);
    }
}
