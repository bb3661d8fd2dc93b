//! Stuck-pattern guard.
//!
//! Small corrections can leave an owner circling the same heating time
//! while staying unhappy. When the latest attempts in the query context are
//! tightly clustered and consistently rated on one side, the guard proposes
//! a deliberate jump away from the cluster instead of another nudge.

use serde::{Deserialize, Serialize};

use super::config::PatternConfig;
use super::kernel::{mean, variance};
use super::Side;
use crate::observation::{Observation, SatisfactionScale};

/// A deliberate jump away from a stuck cluster of attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicOverride {
    pub direction: Side,
    /// Relative jump applied to the cluster's mean heating time
    pub jump: f64,
    /// Mean heating time of the clustered attempts
    pub cluster_mean: f64,
    /// Heating time variance of the clustered attempts
    pub cluster_variance: f64,
    pub mean_deviation: f64,
    pub attempts: usize,
    /// Proposed heating time before clamping and rounding
    pub value: f64,
}

/// Look for a stuck pattern in `recent`, the owner's in-context history
/// newest first.
pub fn detect(
    recent: &[&Observation],
    scale: &SatisfactionScale,
    cfg: &PatternConfig,
    deadband: f64,
) -> Option<StrategicOverride> {
    if !cfg.enabled {
        return None;
    }
    let window: Vec<&Observation> = recent.iter().take(cfg.window).copied().collect();
    if window.len() < cfg.min_window {
        return None;
    }

    let times: Vec<f64> = window.iter().map(|o| o.heating_time).collect();
    let deviations: Vec<f64> = window.iter().map(|o| scale.deviation(o.satisfaction)).collect();
    let cluster_mean = mean(&times)?;
    let cluster_variance = variance(&times)?;
    let mean_deviation = mean(&deviations)?;
    if cluster_variance > cfg.max_variance {
        return None;
    }

    let n = window.len() as f64;
    let cold_share = deviations.iter().filter(|d| **d < -deadband).count() as f64 / n;
    let hot_share = deviations.iter().filter(|d| **d > cfg.hot_threshold).count() as f64 / n;

    let direction = if cold_share >= cfg.poor_share && cold_share >= hot_share {
        Side::Cold
    } else if hot_share >= cfg.poor_share {
        Side::Hot
    } else {
        return None;
    };

    let severe = mean_deviation.abs() >= cfg.severe_deviation;
    let jump = match (direction, severe) {
        (Side::Cold, true) => cfg.severe_cold_jump,
        (Side::Cold, false) => cfg.cold_jump,
        (Side::Hot, true) => -cfg.severe_hot_jump,
        (Side::Hot, false) => -cfg.hot_jump,
    };

    let value = cluster_mean * (1.0 + jump);
    tracing::trace!(
        ?direction,
        jump,
        cluster_mean,
        cluster_variance,
        attempts = window.len(),
        "stuck pattern detected"
    );

    Some(StrategicOverride {
        direction,
        jump,
        cluster_mean,
        cluster_variance,
        mean_deviation,
        attempts: window.len(),
        value,
    })
}
