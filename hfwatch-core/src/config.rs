//! Configuration file support for hfwatch
//!
//! Loads engine tunables from JSON files and overlays them on a preset.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.hfwatchrc.json` in the working directory
//! 3. `hfwatch.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::preset::{EngineConfig, Preset};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// hfwatch configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HfwatchConfig {
    /// Version tag of the preset to start from (default: 3.9e-FINAL-CL)
    #[serde(default)]
    pub preset: Option<String>,

    /// Category cut points
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,

    /// Noise gate tolerance
    #[serde(default)]
    pub tolerance: Option<ToleranceConfig>,

    /// Delta amplification
    #[serde(default)]
    pub gains: Option<GainConfig>,

    /// Score ceiling while the merged noise guard is active
    #[serde(default)]
    pub noise_cap: Option<f64>,

    /// EMA windows
    #[serde(default)]
    pub smoothing: Option<SmoothingFileConfig>,

    /// Acute escalation gates
    #[serde(default)]
    pub acute: Option<AcuteFileConfig>,

    /// De-escalation hold-down
    #[serde(default)]
    pub hysteresis: Option<HysteresisFileConfig>,
}

/// Category cut points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Upper bound of Green (default: 2.0)
    pub green_max: Option<f64>,
    /// Upper bound of Yellow (default: 4.5)
    pub yellow_max: Option<f64>,
    /// Upper bound of Orange (default: 7.5)
    pub orange_max: Option<f64>,
}

/// Noise gate tolerance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Tolerance after the early period (default: 0.19)
    pub base: Option<f64>,
    /// Tolerance during the first 14 days (default: 0.20)
    pub early: Option<f64>,
}

/// Delta amplification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GainConfig {
    /// Gain for worsening deltas (default: 2.0)
    pub worsening: Option<f64>,
    /// Gain for improving deltas (default: 1.2)
    pub improving: Option<f64>,
    /// Global weight on summed deltas (default: 0.55)
    pub mild_weight: Option<f64>,
}

/// EMA windows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmoothingFileConfig {
    /// Regular EMA window in days (default: 26)
    pub ema_days: Option<usize>,
    /// EMA window for jittery patients (default: 32)
    pub extended_ema_days: Option<usize>,
    /// Score variance that triggers the extended window (default: 0.8)
    pub jitter_threshold: Option<f64>,
}

/// Acute escalation gates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcuteFileConfig {
    /// WS jump over the recent median (default: 0.8)
    pub ws_jump: Option<f64>,
    /// Per-core-symptom adjusted delta (default: 0.3)
    pub core_step: Option<f64>,
    /// Minimum score for escalation (default: none)
    pub min_score: Option<f64>,
}

/// De-escalation hold-down
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HysteresisFileConfig {
    /// Days an Orange/Red day blocks a return to Green (default: 5)
    pub cool_down_days: Option<usize>,
    /// Yellow days before stickiness applies (default: 2)
    pub stickiness_days: Option<usize>,
}

/// Resolved configuration ready for [`crate::Engine::new`]
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub preset: Preset,
    pub engine: EngineConfig,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl HfwatchConfig {
    fn base_preset(&self) -> Result<Preset> {
        match &self.preset {
            Some(tag) => Preset::from_tag(tag).with_context(|| {
                format!(
                    "unknown preset \"{}\" (known: {})",
                    tag,
                    Preset::ALL.map(|p| p.tag()).join(", ")
                )
            }),
            None => Ok(Preset::default()),
        }
    }

    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let preset = self.base_preset()?;
        let engine = self.overlay(preset.config());

        // Validate thresholds are positive and ordered
        let t = engine.thresholds;
        for (name, v) in [
            ("green_max", t.green_max),
            ("yellow_max", t.yellow_max),
            ("orange_max", t.orange_max),
        ] {
            if !positive(v) {
                anyhow::bail!("thresholds.{} must be positive (got {})", name, v);
            }
        }
        if t.green_max >= t.yellow_max {
            anyhow::bail!(
                "thresholds.green_max ({}) must be less than thresholds.yellow_max ({})",
                t.green_max,
                t.yellow_max
            );
        }
        if t.yellow_max >= t.orange_max {
            anyhow::bail!(
                "thresholds.yellow_max ({}) must be less than thresholds.orange_max ({})",
                t.yellow_max,
                t.orange_max
            );
        }

        let gate = engine.noise_gate;
        for (name, v) in [("base", gate.tolerance_base), ("early", gate.tolerance_early)] {
            if !(0.0..1.0).contains(&v) {
                anyhow::bail!("tolerance.{} must be in [0, 1) (got {})", name, v);
            }
        }

        // Validate gains are non-negative and asymmetric toward caution
        for (name, v) in [
            ("worsening", gate.worsening_gain),
            ("improving", gate.improving_gain),
            ("mild_weight", gate.mild_weight),
        ] {
            if !non_negative(v) {
                anyhow::bail!("gains.{} must be non-negative (got {})", name, v);
            }
        }
        if gate.improving_gain > gate.worsening_gain {
            anyhow::bail!(
                "gains.improving ({}) must not exceed gains.worsening ({})",
                gate.improving_gain,
                gate.worsening_gain
            );
        }

        if !positive(engine.noise_cap) || engine.noise_cap > crate::engine::MAX_SCORE {
            anyhow::bail!("noise_cap must be in (0, 10] (got {})", engine.noise_cap);
        }

        let s = engine.smoothing;
        if s.ema_days == 0 {
            anyhow::bail!("smoothing.ema_days must be positive");
        }
        if s.extended_ema_days < s.ema_days {
            anyhow::bail!(
                "smoothing.extended_ema_days ({}) must be at least smoothing.ema_days ({})",
                s.extended_ema_days,
                s.ema_days
            );
        }
        if !non_negative(s.jitter_threshold) {
            anyhow::bail!(
                "smoothing.jitter_threshold must be non-negative (got {})",
                s.jitter_threshold
            );
        }

        let a = engine.acute;
        if !positive(a.ws_jump) {
            anyhow::bail!("acute.ws_jump must be positive (got {})", a.ws_jump);
        }
        if !non_negative(a.core_step) {
            anyhow::bail!("acute.core_step must be non-negative (got {})", a.core_step);
        }
        if let Some(min) = a.min_score {
            if !(0.0..=crate::engine::MAX_SCORE).contains(&min) {
                anyhow::bail!("acute.min_score must be in [0, 10] (got {})", min);
            }
        }

        if engine.hysteresis.cool_down_days == 0 {
            anyhow::bail!("hysteresis.cool_down_days must be at least 1");
        }

        Ok(())
    }

    /// Overlay file values on a preset configuration
    fn overlay(&self, mut engine: EngineConfig) -> EngineConfig {
        if let Some(t) = &self.thresholds {
            engine.thresholds.green_max = t.green_max.unwrap_or(engine.thresholds.green_max);
            engine.thresholds.yellow_max = t.yellow_max.unwrap_or(engine.thresholds.yellow_max);
            engine.thresholds.orange_max = t.orange_max.unwrap_or(engine.thresholds.orange_max);
        }
        if let Some(t) = &self.tolerance {
            engine.noise_gate.tolerance_base = t.base.unwrap_or(engine.noise_gate.tolerance_base);
            engine.noise_gate.tolerance_early = t.early.unwrap_or(engine.noise_gate.tolerance_early);
        }
        if let Some(g) = &self.gains {
            engine.noise_gate.worsening_gain = g.worsening.unwrap_or(engine.noise_gate.worsening_gain);
            engine.noise_gate.improving_gain = g.improving.unwrap_or(engine.noise_gate.improving_gain);
            engine.noise_gate.mild_weight = g.mild_weight.unwrap_or(engine.noise_gate.mild_weight);
        }
        if let Some(cap) = self.noise_cap {
            engine.noise_cap = cap;
        }
        if let Some(s) = &self.smoothing {
            engine.smoothing.ema_days = s.ema_days.unwrap_or(engine.smoothing.ema_days);
            engine.smoothing.extended_ema_days =
                s.extended_ema_days.unwrap_or(engine.smoothing.extended_ema_days);
            engine.smoothing.jitter_threshold =
                s.jitter_threshold.unwrap_or(engine.smoothing.jitter_threshold);
        }
        if let Some(a) = &self.acute {
            engine.acute.ws_jump = a.ws_jump.unwrap_or(engine.acute.ws_jump);
            engine.acute.core_step = a.core_step.unwrap_or(engine.acute.core_step);
            if a.min_score.is_some() {
                engine.acute.min_score = a.min_score;
            }
        }
        if let Some(h) = &self.hysteresis {
            engine.hysteresis.cool_down_days =
                h.cool_down_days.unwrap_or(engine.hysteresis.cool_down_days);
            engine.hysteresis.stickiness_days =
                h.stickiness_days.unwrap_or(engine.hysteresis.stickiness_days);
        }
        engine
    }

    /// Resolve config into an engine configuration
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;
        let preset = self.base_preset()?;
        Ok(ResolvedConfig {
            preset,
            engine: self.overlay(preset.config()),
            config_path: None,
        })
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Discover and load a config file from a directory
///
/// Search order:
/// 1. `.hfwatchrc.json`
/// 2. `hfwatch.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(dir: &Path) -> Result<Option<(HfwatchConfig, PathBuf)>> {
    for name in [".hfwatchrc.json", "hfwatch.config.json"] {
        let path = dir.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<HfwatchConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: HfwatchConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a working directory
///
/// If `config_path` is provided, loads from that file. Otherwise, discovers
/// config in `dir`. A `preset_override` replaces the file's preset.
pub fn load_and_resolve(
    dir: &Path,
    config_path: Option<&Path>,
    preset_override: Option<&str>,
) -> Result<ResolvedConfig> {
    let (mut config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(dir)? {
            Some((config, path)) => (config, Some(path)),
            None => (HfwatchConfig::default(), None),
        }
    };

    if let Some(tag) = preset_override {
        config.preset = Some(tag.to_string());
    }

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
