//! Anchor reinforcement.
//!
//! Anchors are near-perfect ratings. They pull a source's estimate toward
//! their own targets, unless later attempts at the same heating time have
//! since contradicted them.

use super::config::AnchorConfig;
use super::kernel::WeightedAccumulator;
use crate::observation::{Observation, SatisfactionScale};

/// Weight multiplier for an anchor given the observations around it.
///
/// Later attempts by the same owner within `retry_tolerance` minutes of
/// the anchor's heating time count as re-tries. When there are at least
/// `min_contradictions` and they average below perfect, the anchor is
/// decayed; otherwise it keeps full weight.
pub fn contradiction_factor(
    anchor: &Observation,
    neighbourhood: &[&Observation],
    scale: &SatisfactionScale,
    cfg: &AnchorConfig,
) -> f64 {
    let retries: Vec<f64> = neighbourhood
        .iter()
        .filter(|o| {
            o.owner == anchor.owner
                && o.id != anchor.id
                && o.occurred_at > anchor.occurred_at
                && (o.heating_time - anchor.heating_time).abs() <= cfg.retry_tolerance
        })
        .map(|o| o.satisfaction)
        .collect();

    if retries.len() < cfg.min_contradictions.max(1) {
        return 1.0;
    }
    let mean = retries.iter().sum::<f64>() / retries.len() as f64;
    if mean >= scale.perfect {
        return 1.0;
    }

    let drop = scale.perfect - mean;
    let factor = cfg.decay_base
        - drop / (2.0 * scale.span())
        - cfg.decay_per_attempt * retries.len() as f64;
    factor.clamp(cfg.decay_floor, 1.0)
}

/// Outcome of pulling an estimate toward its anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPull {
    pub value: f64,
    /// Share of the estimate taken from the anchor mean
    pub alpha: f64,
}

/// Blend `estimate` with the weighted mean of the anchor targets.
///
/// `total_weight` is the weight of every neighbour of the source, anchors
/// included, so the anchors' share of it drives the pull.
pub fn pull(
    estimate: f64,
    anchors: &WeightedAccumulator,
    total_weight: f64,
    cfg: &AnchorConfig,
) -> AnchorPull {
    let Some(anchor_mean) = anchors.mean() else {
        return AnchorPull { value: estimate, alpha: 0.0 };
    };
    if total_weight <= 0.0 {
        return AnchorPull { value: estimate, alpha: 0.0 };
    }
    let share = (anchors.total_weight() / total_weight).clamp(0.0, 1.0);
    let alpha = (cfg.blend * share).clamp(0.0, cfg.max_influence);
    AnchorPull {
        value: (1.0 - alpha) * estimate + alpha * anchor_mean,
        alpha,
    }
}
