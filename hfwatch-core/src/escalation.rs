//! Acute escalation override
//!
//! A sharp jump in weighted symptom pressure over the recent median, backed
//! by new orthopnea or by both core symptoms worsening, forces the proposed
//! category up regardless of what smoothing produced.
//!
//! Global invariants enforced:
//! - Escalation only ever raises the category
//! - The recent median is taken over history only (0 when empty)

use crate::category::Category;
use crate::delta::DeltaOutcome;
use crate::smoothing::{median, tail};
use crate::symptoms::Symptom;
use serde::{Deserialize, Serialize};

/// Number of prior pressures in the median
const MEDIAN_WINDOW: usize = 3;

/// Acute escalation tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcuteConfig {
    /// Minimum rise of WS over the recent median
    pub ws_jump: f64,
    /// Minimum adjusted delta for a core symptom to count
    pub core_step: f64,
    /// Optional score gate; escalation needs at least this normalized score
    pub min_score: Option<f64>,
}

impl Default for AcuteConfig {
    fn default() -> Self {
        AcuteConfig {
            ws_jump: 0.8,
            core_step: 0.3,
            min_score: None,
        }
    }
}

/// What triggered (or failed to trigger) escalation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscalationCheck {
    pub delta_ws: f64,
    pub core_count: usize,
    pub new_orthopnea: bool,
    pub fired: bool,
    /// Minimum rank forced when fired
    pub target_rank: u8,
}

impl EscalationCheck {
    /// Apply to a proposed category
    pub fn apply(&self, proposed: Category) -> Category {
        if self.fired {
            proposed.at_least(self.target_rank)
        } else {
            proposed
        }
    }
}

/// Evaluate the acute escalation condition
pub fn check_escalation(
    deltas: &DeltaOutcome,
    pressure_history: &[f64],
    new_orthopnea: bool,
    normalized_score: f64,
    config: &AcuteConfig,
) -> EscalationCheck {
    let delta_ws = deltas.weighted_pressure - median(tail(pressure_history, MEDIAN_WINDOW));
    let core_count = Symptom::CORE
        .iter()
        .filter_map(|s| deltas.get(*s))
        .filter(|d| d.adjusted >= config.core_step)
        .count();

    let score_gate = config.min_score.map_or(true, |min| normalized_score >= min);
    let fired =
        delta_ws >= config.ws_jump && (new_orthopnea || core_count >= 2) && score_gate;
    let target_rank = if core_count >= 2 { 2 } else { 1 };

    EscalationCheck {
        delta_ws,
        core_count,
        new_orthopnea,
        fired,
        target_rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{compute_deltas, NoiseGateConfig};
    use crate::symptoms::SymptomLevels;

    fn deltas(sob: u8, edema: u8, fatigue: u8) -> DeltaOutcome {
        let levels = SymptomLevels {
            shortness_of_breath: sob,
            edema,
            fatigue,
            ..SymptomLevels::default()
        };
        compute_deltas(
            &levels,
            &SymptomLevels::default(),
            0,
            &NoiseGateConfig::default(),
        )
    }

    #[test]
    fn test_two_core_symptoms_force_orange() {
        let check = check_escalation(&deltas(2, 2, 0), &[], false, 3.0, &AcuteConfig::default());
        assert!(check.fired);
        assert_eq!(check.core_count, 2);
        assert_eq!(check.apply(Category::Green), Category::Orange);
        assert_eq!(check.apply(Category::Red), Category::Red);
    }

    #[test]
    fn test_new_orthopnea_forces_yellow() {
        let check = check_escalation(&deltas(0, 0, 2), &[], true, 1.0, &AcuteConfig::default());
        assert!(check.fired);
        assert_eq!(check.core_count, 0);
        assert_eq!(check.apply(Category::Green), Category::Yellow);
    }

    #[test]
    fn test_no_trigger_no_escalation() {
        let check = check_escalation(&deltas(0, 0, 3), &[], false, 3.0, &AcuteConfig::default());
        assert!(!check.fired);
        assert_eq!(check.apply(Category::Green), Category::Green);
    }

    #[test]
    fn test_jump_measured_against_history_median() {
        // WS for (2, 2, 0) is 4.4; a history already at that level is no jump
        let check = check_escalation(
            &deltas(2, 2, 0),
            &[0.0, 4.4, 4.4, 4.4],
            false,
            5.0,
            &AcuteConfig::default(),
        );
        assert!(check.delta_ws.abs() < 1e-9);
        assert!(!check.fired);
    }

    #[test]
    fn test_min_score_gate() {
        let cfg = AcuteConfig {
            min_score: Some(3.0),
            ..AcuteConfig::default()
        };
        let check = check_escalation(&deltas(0, 0, 2), &[], true, 2.9, &cfg);
        assert!(!check.fired);
        let check = check_escalation(&deltas(0, 0, 2), &[], true, 3.0, &cfg);
        assert!(check.fired);
    }
}
