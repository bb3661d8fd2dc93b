//! Clamping and rounding of the final estimate.

use chrono::{DateTime, Utc};

use super::config::{RoundingPolicy, SafetyConfig};
use super::kernel::round_to;
use super::Side;
use crate::observation::{Observation, SatisfactionScale};

/// Clamp to the absolute bounds.
pub fn clamp_absolute(value: f64, cfg: &SafetyConfig) -> f64 {
    if !value.is_finite() {
        return cfg.min_minutes;
    }
    value.clamp(cfg.min_minutes, cfg.max_minutes)
}

/// The owner's newest in-context observation young enough to bound a step.
///
/// `recent` must be newest first.
pub fn step_reference<'a>(
    recent: &[&'a Observation],
    now: DateTime<Utc>,
    cfg: &SafetyConfig,
) -> Option<&'a Observation> {
    recent
        .first()
        .copied()
        .filter(|o| o.age_days(now) <= cfg.step_window_days)
}

/// `(low, high)` around `reference`, `step_cap_fraction` either side.
pub fn step_bounds(reference: f64, cfg: &SafetyConfig) -> (f64, f64) {
    let low = reference * (1.0 - cfg.step_cap_fraction);
    let high = reference * (1.0 + cfg.step_cap_fraction);
    (low.min(high), low.max(high))
}

/// Direction of the owner's latest ratings, newest first.
pub fn trend(
    recent: &[&Observation],
    scale: &SatisfactionScale,
    window: usize,
    deadband: f64,
) -> Option<Side> {
    let deviations: Vec<f64> = recent
        .iter()
        .take(window)
        .map(|o| scale.deviation(o.satisfaction))
        .collect();
    if deviations.is_empty() {
        return None;
    }
    let mean = deviations.iter().sum::<f64>() / deviations.len() as f64;
    Side::of(mean, deadband)
}

/// Round to the configured resolution according to the policy.
pub fn round(value: f64, trend: Option<Side>, cfg: &SafetyConfig) -> f64 {
    match cfg.rounding {
        RoundingPolicy::Nearest => round_to(value, cfg.resolution, f64::round),
        RoundingPolicy::NeverCold => round_to(value, cfg.resolution, f64::ceil),
        RoundingPolicy::Adaptive => match trend {
            Some(Side::Cold) => round_to(value, cfg.resolution, f64::ceil),
            Some(Side::Hot) => {
                let units = value / cfg.resolution;
                if units - units.floor() <= cfg.snap_down_fraction {
                    round_to(value, cfg.resolution, f64::floor)
                } else {
                    round_to(value, cfg.resolution, f64::round)
                }
            }
            None => round_to(value, cfg.resolution, f64::round),
        },
    }
}

/// Clamp, round and clamp again. Returns `(raw, rounded)`.
pub fn finalize(value: f64, trend: Option<Side>, cfg: &SafetyConfig) -> (f64, f64) {
    let raw = clamp_absolute(value, cfg);
    let rounded = clamp_absolute(round(raw, trend, cfg), cfg);
    (raw, rounded)
}
