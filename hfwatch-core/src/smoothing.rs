//! Trend smoothing over weighted symptom pressure
//!
//! Global invariants enforced:
//! - EMA is seeded with the first value of the series
//! - Short histories are padded with today's pressure, never with zeros
//! - The extended window is only used when recent scores are jittery

use serde::{Deserialize, Serialize};

/// Minimum series length before padding stops
const MIN_SERIES_LEN: usize = 3;

/// Number of recent scores used to measure jitter
const JITTER_WINDOW: usize = 3;

/// Number of history scores in the trend summary (today is added on top)
const SUMMARY_WINDOW: usize = 7;

/// Slope band inside which the trend counts as stable
const SUMMARY_SLOPE_BAND: f64 = 0.4;

/// EMA window tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub ema_days: usize,
    pub extended_ema_days: usize,
    /// Variance of the last three scores above which the window is extended
    pub jitter_threshold: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        SmoothingConfig {
            ema_days: 26,
            extended_ema_days: 32,
            jitter_threshold: 0.8,
        }
    }
}

/// Output of the smoother
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendEstimate {
    pub trend_score: f64,
    pub ema_days: usize,
    pub extended: bool,
    pub jitter: f64,
}

/// Exponential moving average with alpha = 2 / (days + 1)
///
/// Returns the last value of the smoothed series, 0 for an empty series.
pub fn ema(values: &[f64], days: usize) -> f64 {
    let Some((first, rest)) = values.split_first() else {
        return 0.0;
    };
    let alpha = 2.0 / (days as f64 + 1.0);
    rest.iter()
        .fold(*first, |acc, v| alpha * v + (1.0 - alpha) * acc)
}

/// Median (mean of the two middle values for even lengths), 0 when empty
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, 0 for fewer than two values
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Least-squares slope against the index, 0 for fewer than two values
pub fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    num / den
}

/// Last `n` elements of a slice
pub fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

/// Smooth today's pressure against the pressure history
pub fn smooth(
    pressure_history: &[f64],
    current_pressure: f64,
    score_history: &[f64],
    config: &SmoothingConfig,
) -> TrendEstimate {
    let jitter = variance(tail(score_history, JITTER_WINDOW));
    let extended = jitter > config.jitter_threshold;
    let ema_days = if extended {
        config.extended_ema_days
    } else {
        config.ema_days
    };

    let mut series = pressure_history.to_vec();
    while series.len() < MIN_SERIES_LEN {
        series.push(current_pressure);
    }

    let mut trend_score = ema(&series, ema_days);
    if !trend_score.is_finite() {
        trend_score = 0.0;
    }

    TrendEstimate {
        trend_score,
        ema_days,
        extended,
        jitter,
    }
}

/// Coarse direction of the recent score trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Worsening,
    Stable,
    Improving,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Worsening => "worsening",
            TrendDirection::Stable => "stable",
            TrendDirection::Improving => "improving",
        }
    }
}

/// Trajectory over the last week of scores including today
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub slope: f64,
    pub points: usize,
}

/// Summarize the last week of normalized scores plus today's
pub fn summarize_trend(score_history: &[f64], today: f64) -> TrendSummary {
    let mut window = tail(score_history, SUMMARY_WINDOW).to_vec();
    window.push(today);

    let slope = match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => last - first,
        _ => 0.0,
    };
    let direction = if slope > SUMMARY_SLOPE_BAND {
        TrendDirection::Worsening
    } else if slope < -SUMMARY_SLOPE_BAND {
        TrendDirection::Improving
    } else {
        TrendDirection::Stable
    };

    TrendSummary {
        direction,
        slope,
        points: window.len(),
    }
}
