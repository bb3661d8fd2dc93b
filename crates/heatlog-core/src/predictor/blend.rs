//! User/global blending.

use super::config::{BlendConfig, DefaultFormula};
use super::PredictionSource;
use crate::observation::Query;

/// Estimate produced by one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEstimate {
    pub value: f64,
    /// Weighted variance of the implied targets
    pub variance: f64,
    /// Summed neighbour weight
    pub weight: f64,
    pub neighbors: usize,
    /// Share taken from the anchors
    pub anchor_alpha: f64,
}

/// Blended estimate before safety.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blended {
    pub value: f64,
    pub uncertainty: Option<f64>,
    pub source: PredictionSource,
    pub user_weight: f64,
}

/// Smooth, saturating influence of the owner's history.
pub fn user_weight(effective_weight: f64, cfg: &BlendConfig) -> f64 {
    if effective_weight <= 0.0 || cfg.saturation <= 0.0 {
        return 0.0;
    }
    (1.0 - (-effective_weight / cfg.saturation).exp()).clamp(0.0, 1.0)
}

/// Combine the per-source estimates, falling back to the default formula.
pub fn combine(
    user: Option<SourceEstimate>,
    global: Option<SourceEstimate>,
    query: &Query,
    cfg: &BlendConfig,
    formula: &DefaultFormula,
) -> Blended {
    match (user, global) {
        (Some(u), Some(g)) => {
            let w = user_weight(u.weight, cfg);
            let value = w * u.value + (1.0 - w) * g.value;
            let spread = w * u.variance
                + (1.0 - w) * g.variance
                + w * (1.0 - w) * (u.value - g.value).powi(2);
            Blended {
                value,
                uncertainty: Some(spread.max(0.0).sqrt()),
                source: PredictionSource::Blended,
                user_weight: w,
            }
        }
        (Some(u), None) => Blended {
            value: u.value,
            uncertainty: Some(u.variance.max(0.0).sqrt()),
            source: PredictionSource::User,
            user_weight: user_weight(u.weight, cfg),
        },
        (None, Some(g)) => Blended {
            value: g.value,
            uncertainty: Some(g.variance.max(0.0).sqrt()),
            source: PredictionSource::Global,
            user_weight: 0.0,
        },
        (None, None) => Blended {
            value: formula.evaluate(query.duration, query.temperature),
            uncertainty: None,
            source: PredictionSource::ColdStart,
            user_weight: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(value: f64, weight: f64) -> SourceEstimate {
        SourceEstimate {
            value,
            variance: 1.0,
            weight,
            neighbors: 3,
            anchor_alpha: 0.0,
        }
    }

    #[test]
    fn user_weight_saturates_smoothly() {
        let cfg = BlendConfig::default();
        assert_eq!(user_weight(0.0, &cfg), 0.0);
        let a = user_weight(1.0, &cfg);
        let b = user_weight(3.0, &cfg);
        let c = user_weight(30.0, &cfg);
        assert!(a < b && b < c && c < 1.0);
        assert!((b - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn both_sources_blend() {
        let q = Query::new("a", 15.0, 22.0);
        let b = combine(
            Some(estimate(12.0, 3.0)),
            Some(estimate(8.0, 10.0)),
            &q,
            &BlendConfig::default(),
            &DefaultFormula::default(),
        );
        assert_eq!(b.source, PredictionSource::Blended);
        assert!(b.value > 8.0 && b.value < 12.0);
        assert!(b.uncertainty.unwrap() > 1.0);
    }

    #[test]
    fn missing_sources_fall_through() {
        let q = Query::new("a", 15.0, 22.0);
        let cfg = BlendConfig::default();
        let f = DefaultFormula::default();

        let g = combine(None, Some(estimate(9.0, 2.0)), &q, &cfg, &f);
        assert_eq!((g.source, g.value, g.user_weight), (PredictionSource::Global, 9.0, 0.0));

        let u = combine(Some(estimate(11.0, 2.0)), None, &q, &cfg, &f);
        assert_eq!((u.source, u.value), (PredictionSource::User, 11.0));

        let c = combine(None, None, &q, &cfg, &f);
        assert_eq!(c.source, PredictionSource::ColdStart);
        assert!((c.value - 10.3).abs() < 1e-9);
        assert!(c.uncertainty.is_none());
    }
}
