//! Implied targets.
//!
//! Every rated observation says something about the heating time the owner
//! actually wanted: a perfect rating confirms the recorded time, a cold one
//! asks for more and a hot one for less. [`implied_target`] turns one
//! observation into that corrected time.

use super::config::{DefaultFormula, TargetConfig};
use super::Side;
use crate::observation::{Observation, Query, SatisfactionScale};

/// Base correction fraction for an absolute deviation.
///
/// Zero inside the deadband, then `floor + linear*x + quadratic*x^2` over
/// the rescaled deviation `x`, capped at `max_correction`.
pub fn correction_fraction(abs_deviation: f64, cfg: &TargetConfig) -> f64 {
    let d = abs_deviation.abs().min(1.0);
    if d <= cfg.deadband {
        return 0.0;
    }
    let x = (d - cfg.deadband) / (1.0 - cfg.deadband);
    let m = cfg.correction_floor + cfg.correction_linear * x + cfg.correction_quadratic * x * x;
    m.clamp(0.0, cfg.max_correction)
}

/// Extra cold correction for very cold ratings.
fn overshoot(abs_deviation: f64, cfg: &TargetConfig) -> f64 {
    if abs_deviation < cfg.overshoot_threshold || cfg.overshoot_threshold >= 1.0 {
        return 0.0;
    }
    let beyond =
        (abs_deviation.min(1.0) - cfg.overshoot_threshold) / (1.0 - cfg.overshoot_threshold);
    cfg.overshoot_fraction * beyond
}

/// An unbroken run of same-side ratings at the head of an owner's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Streak<'a> {
    pub side: Side,
    members: Vec<&'a str>,
}

impl<'a> Streak<'a> {
    /// Detect the run at the front of `recent`, which must be newest first.
    ///
    /// Returns `None` when the newest rating sits inside the deadband.
    pub fn detect(
        recent: &[&'a Observation],
        scale: &SatisfactionScale,
        deadband: f64,
    ) -> Option<Self> {
        let first = recent.first()?;
        let side = Side::of(scale.deviation(first.satisfaction), deadband)?;
        let members = recent
            .iter()
            .take_while(|o| Side::of(scale.deviation(o.satisfaction), deadband) == Some(side))
            .map(|o| o.id.as_str())
            .collect();
        Some(Self { side, members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| *m == id)
    }

    /// Multiplier for corrections of the run's members; 1.0 for short runs.
    pub fn factor(&self, cfg: &TargetConfig) -> f64 {
        if self.len() >= cfg.strong_amplify_after {
            cfg.strong_amplify_factor
        } else if self.len() >= cfg.amplify_after {
            cfg.amplify_factor
        } else {
            1.0
        }
    }

    /// Amplification for `o`: the run's factor if it belongs to the run.
    pub fn amplification_for(&self, o: &Observation, cfg: &TargetConfig) -> f64 {
        if self.contains(&o.id) {
            self.factor(cfg)
        } else {
            1.0
        }
    }
}

/// Heating time the owner would have wanted under `o`'s conditions.
pub fn implied_target(
    o: &Observation,
    scale: &SatisfactionScale,
    cfg: &TargetConfig,
    amplification: f64,
) -> f64 {
    let deviation = scale.deviation(o.satisfaction);
    let Some(side) = Side::of(deviation, cfg.deadband) else {
        return o.heating_time;
    };

    let base = correction_fraction(deviation.abs(), cfg);
    let amplified = amplification > 1.0;
    match side {
        Side::Hot => {
            let m = if amplified {
                (base * amplification).min(cfg.max_amplified_fraction)
            } else {
                base
            };
            o.heating_time * (1.0 - m)
        }
        Side::Cold => {
            let total = base + overshoot(deviation.abs(), cfg);
            let m = if amplified {
                (total * amplification).min(cfg.max_amplified_fraction)
            } else {
                total.min(cfg.max_increase_fraction)
            };
            o.heating_time * (1.0 + m)
        }
    }
}

/// Move a target from `o`'s conditions to the query's along the prior slopes.
pub fn transfer(target: f64, o: &Observation, query: &Query, formula: &DefaultFormula) -> f64 {
    let shifted = target
        + formula.duration_coefficient * (query.duration - o.duration)
        + formula.temperature_coefficient * (query.temperature - o.temperature);
    shifted.max(formula.minimum)
}
