//! Patient-adaptive category cut points
//!
//! Global invariants enforced:
//! - Cut points only ever move down (toward caution)
//! - Shift is bounded by `max_shift`
//! - Too little history returns the defaults unchanged

use crate::category::CategoryThresholds;
use crate::smoothing::{tail, variance};
use serde::{Deserialize, Serialize};

/// Adaptive threshold tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Most recent scores considered
    pub lookback: usize,
    /// Fewer scores than this leaves the defaults untouched
    pub min_points: usize,
    /// Shift per unit of standard deviation
    pub shift_per_std: f64,
    pub max_shift: f64,
    /// The Orange cut point moves this much less than the others
    pub orange_relief: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        AdaptiveConfig {
            lookback: 14,
            min_points: 6,
            shift_per_std: 0.1,
            max_shift: 0.3,
            orange_relief: 0.05,
        }
    }
}

/// Cut points in effect for one classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdaptiveThresholds {
    pub thresholds: CategoryThresholds,
    pub shift: f64,
    /// Standard deviation of the lookback window, when enough points exist
    pub std_dev: Option<f64>,
}

/// Build cut points from the patient's recent score variability
pub fn adaptive_thresholds(
    defaults: &CategoryThresholds,
    score_history: &[f64],
    config: &AdaptiveConfig,
) -> AdaptiveThresholds {
    let window = tail(score_history, config.lookback);
    if window.len() < config.min_points {
        return AdaptiveThresholds {
            thresholds: *defaults,
            shift: 0.0,
            std_dev: None,
        };
    }

    let std_dev = variance(window).sqrt();
    let shift = (std_dev * config.shift_per_std).min(config.max_shift).max(0.0);

    AdaptiveThresholds {
        thresholds: CategoryThresholds {
            green_max: defaults.green_max - shift,
            yellow_max: defaults.yellow_max - shift,
            orange_max: defaults.orange_max - (shift - config.orange_relief).max(0.0),
        },
        shift,
        std_dev: Some(std_dev),
    }
}
