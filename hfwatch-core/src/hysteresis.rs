//! De-escalation hysteresis
//!
//! State machine over the ranked categories. Only the downward path to Green
//! is guarded:
//!
//! - cool-down: proposing Green while the last `cool_down_days` contain
//!   Orange or Red holds the day at Yellow
//! - stickiness: proposing Green after `stickiness_days` of Yellow holds at
//!   Yellow while the recent score slope is still falling
//!
//! Yellow, Orange and Red proposals pass through unchanged, as does any
//! proposal on an empty history.

use crate::category::Category;
use crate::smoothing::{slope, tail};
use serde::{Deserialize, Serialize};

/// Scores used for the stickiness slope
const SLOPE_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisConfig {
    pub cool_down_days: usize,
    pub stickiness_days: usize,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        HysteresisConfig {
            cool_down_days: 5,
            stickiness_days: 2,
        }
    }
}

/// Why a Green proposal was held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampReason {
    CoolDown,
    Stickiness,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HysteresisOutcome {
    pub category: Category,
    pub clamp: Option<ClampReason>,
}

/// Apply the de-escalation rules to a proposed category
pub fn apply_hysteresis(
    proposed: Category,
    categories: &[Category],
    scores: &[f64],
    config: &HysteresisConfig,
) -> HysteresisOutcome {
    let pass = HysteresisOutcome {
        category: proposed,
        clamp: None,
    };
    if proposed != Category::Green || categories.is_empty() {
        return pass;
    }

    if tail(categories, config.cool_down_days)
        .iter()
        .any(|c| c.is_elevated())
    {
        return HysteresisOutcome {
            category: Category::Yellow,
            clamp: Some(ClampReason::CoolDown),
        };
    }

    if config.stickiness_days > 0 && categories.len() >= config.stickiness_days {
        let all_yellow = tail(categories, config.stickiness_days)
            .iter()
            .all(|c| *c == Category::Yellow);
        if all_yellow && slope(tail(scores, SLOPE_WINDOW)) < 0.0 {
            return HysteresisOutcome {
                category: Category::Yellow,
                clamp: Some(ClampReason::Stickiness),
            };
        }
    }

    pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use Category::*;

    fn cfg() -> HysteresisConfig {
        HysteresisConfig::default()
    }

    #[test]
    fn test_empty_history_unclamped() {
        let out = apply_hysteresis(Green, &[], &[], &cfg());
        assert_eq!(out.category, Green);
        assert!(out.clamp.is_none());
    }

    #[test]
    fn test_orange_to_green_held_at_yellow() {
        let out = apply_hysteresis(Green, &[Green, Orange], &[0.0, 5.0], &cfg());
        assert_eq!(out.category, Yellow);
        assert_eq!(out.clamp, Some(ClampReason::CoolDown));
    }

    #[test]
    fn test_red_within_window_held() {
        let cats = [Red, Yellow, Yellow, Yellow, Yellow];
        let out = apply_hysteresis(Green, &cats, &[8.0, 3.0, 3.0, 3.0, 3.0], &cfg());
        assert_eq!(out.category, Yellow);
    }

    #[test]
    fn test_cool_down_expires() {
        let cats = [Orange, Green, Green, Green, Green, Green];
        let out = apply_hysteresis(Green, &cats, &[5.0, 0.0, 0.0, 0.0, 0.0, 0.0], &cfg());
        assert_eq!(out.category, Green);
    }

    #[test]
    fn test_non_green_passes_through() {
        for proposed in [Yellow, Orange, Red] {
            let out = apply_hysteresis(proposed, &[Red, Red], &[9.0, 9.0], &cfg());
            assert_eq!(out.category, proposed);
            assert!(out.clamp.is_none());
        }
    }

    #[test]
    fn test_stickiness_while_falling() {
        let out = apply_hysteresis(
            Green,
            &[Green, Yellow, Yellow],
            &[1.0, 3.5, 2.5],
            &cfg(),
        );
        assert_eq!(out.category, Yellow);
        assert_eq!(out.clamp, Some(ClampReason::Stickiness));
    }

    #[test]
    fn test_stickiness_released_when_flat() {
        let out = apply_hysteresis(Green, &[Yellow, Yellow, Yellow], &[2.5, 2.5, 2.5], &cfg());
        assert_eq!(out.category, Green);
    }

    #[test]
    fn test_neutral_days_are_not_elevated() {
        let out = apply_hysteresis(Green, &[Neutral], &[0.0], &cfg());
        assert_eq!(out.category, Green);
    }
}
