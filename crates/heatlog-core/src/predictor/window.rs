//! Box-window predictor.
//!
//! The earlier engine generation: only observations inside a fixed window
//! around the query take part, weighted by linear closeness, tiered recency
//! and a confidence factor for well-covered conditions. Each one contributes
//! its recorded time shifted by a linear satisfaction adjustment.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};

use super::anchor;
use super::config::PredictorConfig;
use super::kernel::WeightedAccumulator;
use super::monotone::Grid;
use super::{safety, History, Prediction, PredictionSource, Predictor};
use crate::observation::{Observation, Query};

#[derive(Debug, Clone, Default)]
pub struct WindowPredictor {
    config: PredictorConfig,
}

impl WindowPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    /// Linear closeness in `[0, 1]`, `None` outside the window.
    fn similarity(&self, query: &Query, o: &Observation) -> Option<f64> {
        let w = &self.config.window;
        let dd = (o.duration - query.duration).abs();
        let dt = (o.temperature - query.temperature).abs();
        if dd > w.duration_window || dt > w.temperature_window {
            return None;
        }
        Some(((1.0 - dd / w.duration_window) + (1.0 - dt / w.temperature_window)) / 2.0)
    }

    fn recency(&self, o: &Observation, now: DateTime<Utc>) -> f64 {
        let w = &self.config.window;
        let days = o.age_days(now);
        if days <= w.recent_days {
            w.recent_boost
        } else if days <= w.month_days {
            w.month_boost
        } else {
            1.0
        }
    }
}

impl WindowPredictor {
    /// Window estimate at `query`: `(value, uncertainty)`, or `None` when no
    /// observation falls inside the window.
    fn estimate_at(
        &self,
        query: &Query,
        all: &[&Observation],
        now: DateTime<Utc>,
    ) -> Option<(f64, Option<f64>)> {
        let cfg = &self.config;
        let matches: Vec<(&Observation, f64)> = all
            .iter()
            .filter_map(|o| self.similarity(query, o).map(|s| (*o, s)))
            .collect();
        if matches.is_empty() {
            return None;
        }

        let share = matches.len() as f64 / all.len() as f64;
        let mean_similarity =
            matches.iter().map(|(_, s)| s).sum::<f64>() / matches.len() as f64;
        let confidence = 1.0 + share * mean_similarity;
        let similar: Vec<&Observation> = matches.iter().map(|(o, _)| *o).collect();

        let mut acc = WeightedAccumulator::new();
        for (o, similarity) in &matches {
            let deviation = cfg.scale.deviation(o.satisfaction);
            let mut weight = similarity * self.recency(o, now) * confidence;
            if deviation.abs() <= cfg.anchor.tolerance {
                weight *= anchor::contradiction_factor(o, &similar, &cfg.scale, &cfg.anchor);
            }
            let target = o.heating_time - deviation * cfg.window.max_adjustment;
            acc.push(target, weight);
        }
        tracing::trace!(matches = matches.len(), confidence, "window neighbourhood");

        let mean = acc.mean()?;
        Some((
            mean.clamp(cfg.window.min_minutes, cfg.window.max_minutes),
            acc.std_dev(),
        ))
    }
}

impl Predictor for WindowPredictor {
    fn name(&self) -> &'static str {
        "window"
    }

    fn predict(&self, query: &Query, history: &History, now: DateTime<Utc>) -> Prediction {
        let cfg = &self.config;
        let all: Vec<&Observation> = history.user.iter().chain(history.global.iter()).collect();
        let fallback = cfg.default_formula.evaluate(query.duration, query.temperature);
        let estimate = self.estimate_at(query, &all, now);

        let (mut value, source, uncertainty) = match estimate {
            Some((value, uncertainty)) => (value, PredictionSource::Global, uncertainty),
            None => (fallback, PredictionSource::ColdStart, None),
        };
        if !all.is_empty() && cfg.monotone.enabled {
            let grid = Grid::new(&cfg.monotone);
            let observed = grid.evaluate(query, |point| {
                self.estimate_at(point, &all, now).map(|(value, _)| value)
            });
            let bounds = (cfg.safety.min_minutes, cfg.safety.max_minutes);
            value = grid.resolve(query, &observed, fallback, bounds);
        }

        let mut user_recent: Vec<&Observation> = history.user.iter().collect();
        user_recent.sort_by_key(|o| Reverse(o.occurred_at));
        let trend = safety::trend(
            &user_recent,
            &cfg.scale,
            cfg.safety.trend_window,
            cfg.target.deadband,
        );
        let (raw_value, heating_time) = safety::finalize(value, trend, &cfg.safety);
        tracing::debug!(?source, heating_time, "window prediction");

        Prediction {
            heating_time,
            raw_value,
            uncertainty,
            source,
            user_weight: 0.0,
            override_applied: None,
        }
    }
}
