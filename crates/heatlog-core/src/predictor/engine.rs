//! Kernel-weighted prediction engine.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use super::anchor::{self, AnchorPull};
use super::blend::{self, SourceEstimate};
use super::config::PredictorConfig;
use super::kernel::{variance, WeightedAccumulator};
use super::monotone::Grid;
use super::pattern::{self, StrategicOverride};
use super::target::{self, Streak};
use super::weighting::{self, Neighbor};
use super::{safety, History, Prediction, PredictionSource, Predictor};
use crate::observation::{Observation, Query};

/// Gaussian-kernel nearest-neighbour predictor with anchors, pattern guard
/// and user/global blending.
#[derive(Debug, Clone, Default)]
pub struct KernelPredictor {
    config: PredictorConfig,
}

/// Observations shared by every point evaluated for one query.
struct Snapshot<'a> {
    history: &'a History,
    /// The owner's observations, newest first
    user_recent: Vec<&'a Observation>,
    now: DateTime<Utc>,
}

/// Estimate at one point of the condition space, before the monotone and
/// step bounds.
struct PointEstimate {
    value: f64,
    uncertainty: Option<f64>,
    source: PredictionSource,
    user_weight: f64,
    strategic: Option<StrategicOverride>,
    user: Option<SourceEstimate>,
    global: Option<SourceEstimate>,
    /// `(low, high)` around the newest similar entry. `None` under a
    /// strategic override, which is meant to leave the stuck range.
    step: Option<(f64, f64)>,
}

impl KernelPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    /// Weighted mean of one source's implied targets, pulled toward its
    /// anchors.
    fn estimate_source(
        &self,
        neighbors: &[Neighbor<'_>],
        context: &[&Observation],
        streak: Option<&Streak<'_>>,
        query: &Query,
    ) -> Option<SourceEstimate> {
        let cfg = &self.config;
        let mut all = WeightedAccumulator::new();
        let mut anchors = WeightedAccumulator::new();

        for n in neighbors {
            let o = n.observation;
            let amplification = streak.map_or(1.0, |s| s.amplification_for(o, &cfg.target));
            let mut value = target::implied_target(o, &cfg.scale, &cfg.target, amplification);
            if cfg.target.context_transfer {
                value = target::transfer(value, o, query, &cfg.default_formula);
            }

            let mut weight = n.weight;
            if n.anchor {
                let decay = anchor::contradiction_factor(o, context, &cfg.scale, &cfg.anchor);
                if decay < 1.0 {
                    tracing::trace!(id = %o.id, decay, "anchor contradicted by later attempts");
                }
                weight *= decay;
                anchors.push(value, weight);
            }
            all.push(value, weight);
        }

        if all.total_weight() < cfg.kernel.min_total_weight {
            return None;
        }
        let mean = all.mean()?;
        let AnchorPull { value, alpha } =
            anchor::pull(mean, &anchors, all.total_weight(), &cfg.anchor);

        Some(SourceEstimate {
            value,
            variance: all.variance().unwrap_or(0.0),
            weight: all.total_weight(),
            neighbors: all.count(),
            anchor_alpha: alpha,
        })
    }

    /// Blend or strategic override at `query`, with its step bounds.
    fn estimate_at(&self, snapshot: &Snapshot<'_>, query: &Query) -> PointEstimate {
        let cfg = &self.config;
        let deadband = cfg.target.deadband;
        let history = snapshot.history;

        let user_context: Vec<&Observation> = snapshot
            .user_recent
            .iter()
            .copied()
            .filter(|o| weighting::in_context(query, o, &cfg.kernel))
            .collect();
        let context: Vec<&Observation> = history
            .user
            .iter()
            .chain(history.global.iter())
            .filter(|o| weighting::in_context(query, o, &cfg.kernel))
            .collect();

        let neighborhood = weighting::weigh(
            query,
            history,
            snapshot.now,
            &cfg.scale,
            &cfg.kernel,
            &cfg.anchor,
        );
        let streak = Streak::detect(&user_context, &cfg.scale, deadband)
            .filter(|s| s.len() >= cfg.target.amplify_after);
        if let Some(s) = &streak {
            tracing::trace!(side = ?s.side, len = s.len(), "amplifying streak");
        }

        let user = self.estimate_source(&neighborhood.user, &context, streak.as_ref(), query);
        let global = self.estimate_source(&neighborhood.global, &context, streak.as_ref(), query);
        let blended = blend::combine(user, global, query, &cfg.blend, &cfg.default_formula);

        let stuck = pattern::detect(&user_context, &cfg.scale, &cfg.pattern, deadband);
        if let Some(strategic) = stuck {
            let times: Vec<f64> = user_context
                .iter()
                .take(strategic.attempts)
                .map(|o| o.heating_time)
                .collect();
            return PointEstimate {
                value: strategic.value,
                uncertainty: variance(&times).map(f64::sqrt),
                source: PredictionSource::PatternOverride,
                user_weight: blended.user_weight,
                strategic: Some(strategic),
                user,
                global,
                step: None,
            };
        }

        let step = safety::step_reference(&user_context, snapshot.now, &cfg.safety)
            .map(|reference| safety::step_bounds(reference.heating_time, &cfg.safety));
        PointEstimate {
            value: blended.value,
            uncertainty: blended.uncertainty,
            source: blended.source,
            user_weight: blended.user_weight,
            strategic: None,
            user,
            global,
            step,
        }
    }

    /// The estimate at `query` made monotone in both conditions.
    ///
    /// Every grid point is estimated once. Points resting on the cold-start
    /// formula count as unobserved. Step bounds reach every point they
    /// dominate: a cap also binds shorter showers on warmer days, a floor
    /// also binds longer showers on colder days.
    fn monotone_value(&self, snapshot: &Snapshot<'_>, query: &Query) -> f64 {
        let cfg = &self.config;
        let bounds = (cfg.safety.min_minutes, cfg.safety.max_minutes);
        let grid = Grid::new(&cfg.monotone);

        let samples = grid.evaluate(query, |point| {
            let e = self.estimate_at(snapshot, point);
            let observed = (e.source != PredictionSource::ColdStart).then_some(e.value);
            (observed, e.step)
        });
        let observed: Vec<Option<f64>> = samples.iter().map(|(value, _)| *value).collect();
        let fallback = cfg.default_formula.evaluate(query.duration, query.temperature);

        let value = grid.resolve(query, &observed, fallback, bounds);
        let high = grid.ceiling(query, |k| samples[k].1.map_or(bounds.1, |(_, high)| high));
        let low = grid.envelope(query, |k| samples[k].1.map_or(bounds.0, |(low, _)| low));
        value.min(high).max(low)
    }
}

/// References sorted newest first.
fn newest_first(observations: &[Observation]) -> Vec<&Observation> {
    let mut refs: Vec<&Observation> = observations.iter().collect();
    refs.sort_by_key(|o| Reverse(o.occurred_at));
    refs
}

impl Predictor for KernelPredictor {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn predict(&self, query: &Query, history: &History, now: DateTime<Utc>) -> Prediction {
        let cfg = &self.config;
        let snapshot = Snapshot {
            history,
            user_recent: newest_first(&history.user),
            now,
        };
        let point = self.estimate_at(&snapshot, query);

        let value = if history.is_empty() {
            point.value
        } else if cfg.monotone.enabled {
            self.monotone_value(&snapshot, query)
        } else {
            point.step.map_or(point.value, |(low, high)| point.value.clamp(low, high))
        };
        if value != point.value {
            tracing::debug!(from = point.value, to = value, "estimate bounded");
        }

        let trend = safety::trend(
            &snapshot.user_recent,
            &cfg.scale,
            cfg.safety.trend_window,
            cfg.target.deadband,
        );
        let (raw_value, heating_time) = safety::finalize(value, trend, &cfg.safety);
        tracing::debug!(
            source = ?point.source,
            user_neighbors = point.user.map(|u| u.neighbors),
            global_neighbors = point.global.map(|g| g.neighbors),
            user_alpha = point.user.map(|u| u.anchor_alpha),
            global_alpha = point.global.map(|g| g.anchor_alpha),
            user_weight = point.user_weight,
            heating_time,
            "kernel prediction"
        );

        Prediction {
            heating_time,
            raw_value,
            uncertainty: point.uncertainty,
            source: point.source,
            user_weight: point.user_weight,
            override_applied: point.strategic,
        }
    }
}
