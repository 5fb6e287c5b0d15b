//! Baseline-relative deltas and the noise gate
//!
//! For each scored symptom the ordinal level is compared with the baseline
//! level. Changes inside the tolerance band are zeroed and counted as small
//! changes; the rest are amplified asymmetrically so that worsening weighs
//! more than improvement.
//!
//! Global invariants enforced:
//! - Deltas are baseline-relative, never day-over-day
//! - Weighted symptom pressure is non-decreasing in every level
//! - Merged noise guard fires on two or more small changes

use crate::symptoms::{Symptom, SymptomLevels};
use serde::{Deserialize, Serialize};

/// Tolerance and gain tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseGateConfig {
    /// Tolerance once the patient has `early_days` of history
    pub tolerance_base: f64,
    /// Tolerance during the first `early_days`
    pub tolerance_early: f64,
    pub early_days: usize,
    /// Multiplier for positive (worsening) deltas
    pub worsening_gain: f64,
    /// Multiplier for negative (improving) deltas
    pub improving_gain: f64,
    /// Global factor applied to the summed deltas
    pub mild_weight: f64,
    /// Number of small changes that trips the merged noise guard
    pub merged_small_changes: usize,
    /// Raw deltas in (0, this) count as a single small driver
    pub single_driver_ceiling: f64,
}

impl Default for NoiseGateConfig {
    fn default() -> Self {
        NoiseGateConfig {
            tolerance_base: 0.19,
            tolerance_early: 0.20,
            early_days: 14,
            worsening_gain: 2.0,
            improving_gain: 1.2,
            mild_weight: 0.55,
            merged_small_changes: 2,
            single_driver_ceiling: 0.30,
        }
    }
}

impl NoiseGateConfig {
    /// Tolerance for a patient with `history_days` prior results
    pub fn tolerance_for(&self, history_days: usize) -> f64 {
        if history_days < self.early_days {
            self.tolerance_early
        } else {
            self.tolerance_base
        }
    }
}

/// Delta for one scored symptom
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SymptomDelta {
    pub symptom: Symptom,
    /// Level difference before the tolerance gate
    pub raw: f64,
    /// Level difference after the tolerance gate
    pub gated: f64,
    /// Gated difference after asymmetric amplification
    pub adjusted: f64,
}

impl SymptomDelta {
    pub fn is_worse(&self) -> bool {
        self.gated > 0.0
    }

    pub fn is_better(&self) -> bool {
        self.gated < 0.0
    }
}

/// Output of the delta stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaOutcome {
    pub tolerance: f64,
    pub deltas: Vec<SymptomDelta>,
    pub small_changes: usize,
    pub merged_noise_guard: bool,
    /// Weighted symptom pressure (WS)
    pub weighted_pressure: f64,
}

impl DeltaOutcome {
    pub fn get(&self, symptom: Symptom) -> Option<&SymptomDelta> {
        self.deltas.iter().find(|d| d.symptom == symptom)
    }

    /// The lone small positive driver, if exactly one positive gated delta
    /// exists and it lies below `ceiling`
    pub fn single_small_driver(&self, ceiling: f64) -> Option<f64> {
        let mut positive = self.deltas.iter().filter(|d| d.gated > 0.0);
        match (positive.next(), positive.next()) {
            (Some(only), None) if only.gated < ceiling => Some(only.gated),
            _ => None,
        }
    }
}

/// Compute gated, amplified deltas and weighted symptom pressure
pub fn compute_deltas(
    levels: &SymptomLevels,
    baseline: &SymptomLevels,
    history_days: usize,
    config: &NoiseGateConfig,
) -> DeltaOutcome {
    let tolerance = config.tolerance_for(history_days);
    let mut small_changes = 0;
    let mut deltas = Vec::with_capacity(Symptom::SCORED.len());

    for symptom in Symptom::SCORED {
        let raw = f64::from(levels.get(symptom)) - f64::from(baseline.get(symptom));
        let gated = if raw.abs() < tolerance {
            small_changes += 1;
            0.0
        } else {
            raw
        };
        let adjusted = if gated > 0.0 {
            gated * config.worsening_gain
        } else {
            gated * config.improving_gain
        };
        deltas.push(SymptomDelta {
            symptom,
            raw,
            gated,
            adjusted,
        });
    }

    let weighted_pressure =
        deltas.iter().map(|d| d.adjusted).sum::<f64>() * config.mild_weight;

    DeltaOutcome {
        tolerance,
        deltas,
        small_changes,
        merged_noise_guard: small_changes >= config.merged_small_changes,
        weighted_pressure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(sob: u8, edema: u8, fatigue: u8) -> SymptomLevels {
        SymptomLevels {
            shortness_of_breath: sob,
            edema,
            fatigue,
            ..SymptomLevels::default()
        }
    }

    #[test]
    fn test_unchanged_is_noise() {
        let out = compute_deltas(
            &levels(1, 1, 1),
            &levels(1, 1, 1),
            0,
            &NoiseGateConfig::default(),
        );
        assert_eq!(out.small_changes, 3);
        assert!(out.merged_noise_guard);
        assert_eq!(out.weighted_pressure, 0.0);
    }

    #[test]
    fn test_worsening_amplified() {
        let out = compute_deltas(
            &levels(3, 2, 1),
            &levels(0, 0, 0),
            0,
            &NoiseGateConfig::default(),
        );
        // (3 + 2 + 1) * 2.0 * 0.55
        assert!((out.weighted_pressure - 6.6).abs() < 1e-9);
        assert!(!out.merged_noise_guard);
        assert_eq!(out.get(Symptom::Edema).unwrap().adjusted, 4.0);
    }

    #[test]
    fn test_improving_dampened() {
        let out = compute_deltas(
            &levels(0, 1, 1),
            &levels(2, 1, 1),
            0,
            &NoiseGateConfig::default(),
        );
        // -2 * 1.2 * 0.55
        assert!((out.weighted_pressure + 1.32).abs() < 1e-9);
        assert!(out.get(Symptom::ShortnessOfBreath).unwrap().is_better());
        assert!(out.merged_noise_guard);
    }

    #[test]
    fn test_tolerance_switches_after_early_days() {
        let cfg = NoiseGateConfig::default();
        assert_eq!(cfg.tolerance_for(0), 0.20);
        assert_eq!(cfg.tolerance_for(13), 0.20);
        assert_eq!(cfg.tolerance_for(14), 0.19);
    }

    #[test]
    fn test_single_small_driver() {
        let out = DeltaOutcome {
            tolerance: 0.1,
            deltas: vec![
                SymptomDelta {
                    symptom: Symptom::ShortnessOfBreath,
                    raw: 0.25,
                    gated: 0.25,
                    adjusted: 0.5,
                },
                SymptomDelta {
                    symptom: Symptom::Edema,
                    raw: 0.0,
                    gated: 0.0,
                    adjusted: 0.0,
                },
            ],
            small_changes: 1,
            merged_noise_guard: false,
            weighted_pressure: 0.275,
        };
        assert_eq!(out.single_small_driver(0.30), Some(0.25));
        assert_eq!(out.single_small_driver(0.20), None);
    }

    #[test]
    fn test_no_single_driver_for_whole_levels() {
        let out = compute_deltas(
            &levels(1, 0, 0),
            &levels(0, 0, 0),
            0,
            &NoiseGateConfig::default(),
        );
        assert_eq!(out.single_small_driver(0.30), None);
    }
}
