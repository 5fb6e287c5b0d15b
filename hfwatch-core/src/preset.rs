//! Engine configuration and the versioned preset table
//!
//! Every tunable lives in one immutable [`EngineConfig`] handed to
//! [`crate::Engine::new`]. Historical algorithm versions are presets over the
//! same pipeline, selected by their version tag.

use crate::bias::BiasConfig;
use crate::category::CategoryThresholds;
use crate::delta::NoiseGateConfig;
use crate::escalation::AcuteConfig;
use crate::hysteresis::HysteresisConfig;
use crate::smoothing::SmoothingConfig;
use crate::thresholds::AdaptiveConfig;
use serde::{Deserialize, Serialize};

/// All engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version tag reported on every result
    pub version: String,
    pub noise_gate: NoiseGateConfig,
    /// Subtracted from the composite score before clamping
    pub score_offset: f64,
    /// Score ceiling while the merged noise guard is active
    pub noise_cap: f64,
    /// Score ceiling when a single small driver is the only worsening
    pub single_symptom_cap: Option<f64>,
    pub smoothing: SmoothingConfig,
    pub bias: BiasConfig,
    pub thresholds: CategoryThresholds,
    pub adaptive: AdaptiveConfig,
    pub acute: AcuteConfig,
    pub hysteresis: HysteresisConfig,
    /// Baseline level from which a scored symptom counts as chronic
    pub chronic_baseline_level: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Preset::default().config()
    }
}

/// Known algorithm versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    /// Canonical clinical-lock configuration
    #[default]
    #[serde(rename = "3.9e-FINAL-CL")]
    V39eFinal,
    #[serde(rename = "4.1-CL")]
    V41,
    #[serde(rename = "ASE-1.3g")]
    Ase13g,
    #[serde(rename = "3.8-B1")]
    V38B1,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::V39eFinal, Preset::V41, Preset::Ase13g, Preset::V38B1];

    pub fn tag(&self) -> &'static str {
        match self {
            Preset::V39eFinal => "3.9e-FINAL-CL",
            Preset::V41 => "4.1-CL",
            Preset::Ase13g => "ASE-1.3g",
            Preset::V38B1 => "3.8-B1",
        }
    }

    /// Look up a preset by version tag (case-insensitive)
    pub fn from_tag(tag: &str) -> Option<Preset> {
        Preset::ALL
            .into_iter()
            .find(|p| p.tag().eq_ignore_ascii_case(tag.trim()))
    }

    /// One-line description for listings
    pub fn description(&self) -> &'static str {
        match self {
            Preset::V39eFinal => "canonical: balanced tolerance, merged noise guard, 5-day cool-down",
            Preset::V41 => "slightly tighter tolerance and softer gains",
            Preset::Ase13g => "wider noise cap, single-symptom guard, score-gated escalation",
            Preset::V38B1 => "short EMA window, worsening-only deltas, 2-day cool-down",
        }
    }

    pub fn config(&self) -> EngineConfig {
        let canonical = EngineConfig {
            version: self.tag().to_string(),
            noise_gate: NoiseGateConfig::default(),
            score_offset: 0.05,
            noise_cap: 1.95,
            single_symptom_cap: None,
            smoothing: SmoothingConfig::default(),
            bias: BiasConfig::default(),
            thresholds: CategoryThresholds::default(),
            adaptive: AdaptiveConfig::default(),
            acute: AcuteConfig::default(),
            hysteresis: HysteresisConfig::default(),
            chronic_baseline_level: 2,
        };

        match self {
            Preset::V39eFinal => canonical,
            Preset::V41 => EngineConfig {
                noise_gate: NoiseGateConfig {
                    tolerance_base: 0.18,
                    worsening_gain: 1.9,
                    improving_gain: 1.15,
                    ..canonical.noise_gate
                },
                ..canonical
            },
            Preset::Ase13g => EngineConfig {
                noise_gate: NoiseGateConfig {
                    tolerance_base: 0.14,
                    tolerance_early: 0.14,
                    worsening_gain: 1.8,
                    mild_weight: 0.85,
                    ..canonical.noise_gate
                },
                noise_cap: 3.0,
                single_symptom_cap: Some(2.6),
                thresholds: CategoryThresholds {
                    orange_max: 8.0,
                    ..canonical.thresholds
                },
                acute: AcuteConfig {
                    ws_jump: 0.9,
                    core_step: 0.4,
                    min_score: Some(3.0),
                },
                hysteresis: HysteresisConfig {
                    cool_down_days: 4,
                    ..canonical.hysteresis
                },
                ..canonical
            },
            Preset::V38B1 => EngineConfig {
                noise_gate: NoiseGateConfig {
                    tolerance_base: 0.35,
                    tolerance_early: 0.35,
                    worsening_gain: 1.0,
                    improving_gain: 0.0,
                    mild_weight: 0.85,
                    ..canonical.noise_gate
                },
                score_offset: 0.0,
                noise_cap: 1.8,
                smoothing: SmoothingConfig {
                    ema_days: 8,
                    extended_ema_days: 10,
                    ..canonical.smoothing
                },
                thresholds: CategoryThresholds {
                    green_max: 2.5,
                    yellow_max: 5.0,
                    orange_max: 7.5,
                },
                hysteresis: HysteresisConfig {
                    cool_down_days: 2,
                    stickiness_days: 2,
                },
                ..canonical
            },
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
