//! Heating time prediction.
//!
//! A [`Predictor`] turns a snapshot of observations into one recommended
//! heating time for a query. It is a pure function of
//! `(query, history, now)`: it keeps no state between calls, performs no
//! I/O and can be shared across threads.
//!
//! The default [`KernelPredictor`] runs this pipeline:
//!
//! 1. [`weighting`]: Gaussian similarity, recency, reliability, frequency,
//!    source and anchor weights per observation
//! 2. [`target`]: implied ideal heating time per observation
//! 3. [`anchor`]: contradiction decay and anchor pull
//! 4. [`pattern`]: stuck-pattern override
//! 5. [`blend`]: user/global blending and the cold-start formula
//! 6. [`monotone`]: the estimate, read over a fixed grid, made monotone in
//!    duration and temperature, with step bounds carried along
//! 7. [`safety`]: absolute and step clamps, rounding
//!
//! [`WindowPredictor`] is the earlier box-window generation, kept selectable
//! through [`PredictorVariant`] so both can be compared on the same data.

pub mod anchor;
pub mod blend;
pub mod config;
mod engine;
pub mod kernel;
pub mod monotone;
pub mod pattern;
pub mod safety;
pub mod target;
pub mod weighting;
mod window;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observation::{Observation, Query};

pub use config::{
    AnchorConfig, BlendConfig, DefaultFormula, KernelConfig, MonotoneConfig, PatternConfig,
    PredictorConfig, PredictorVariant, RoundingPolicy, SafetyConfig, TargetConfig, WindowConfig,
};
pub use engine::KernelPredictor;
pub use pattern::StrategicOverride;
pub use window::WindowPredictor;

/// Which side of perfect a rating fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Below perfect: more heating needed
    Cold,
    /// Above perfect: less heating needed
    Hot,
}

impl Side {
    /// Classify a normalised deviation; `None` inside the deadband.
    pub fn of(deviation: f64, deadband: f64) -> Option<Side> {
        if deviation < -deadband {
            Some(Side::Cold)
        } else if deviation > deadband {
            Some(Side::Hot)
        } else {
            None
        }
    }
}

/// Where the final estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// No usable history: default formula
    ColdStart,
    /// Global pool only
    Global,
    /// Owner's history only
    User,
    /// Owner's history blended with the global pool
    Blended,
    /// Stuck pattern detected: strategic jump
    PatternOverride,
}

/// A heating time recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Recommended heating time in minutes, rounded and clamped
    pub heating_time: f64,
    /// Clamped estimate before rounding
    pub raw_value: f64,
    /// Weighted spread of the implied targets behind the estimate
    pub uncertainty: Option<f64>,
    pub source: PredictionSource,
    /// Influence of the owner's history in [0, 1]
    pub user_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_applied: Option<StrategicOverride>,
}

/// Snapshot of observations fetched for one query.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// The querying owner's observations, newest first
    pub user: Vec<Observation>,
    /// Everybody else's observations, newest first
    pub global: Vec<Observation>,
}

impl History {
    pub fn new(user: Vec<Observation>, global: Vec<Observation>) -> Self {
        Self { user, global }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.global.is_empty()
    }
}

/// A swappable heating time estimator.
pub trait Predictor: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Estimate the heating time for `query` from `history` as of `now`.
    fn predict(&self, query: &Query, history: &History, now: DateTime<Utc>) -> Prediction;
}

/// Build the predictor selected by `config.variant`.
pub fn build(config: PredictorConfig) -> Box<dyn Predictor> {
    match config.variant {
        PredictorVariant::Kernel => Box::new(KernelPredictor::new(config)),
        PredictorVariant::Window => Box::new(WindowPredictor::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_respects_deadband() {
        assert_eq!(Side::of(-0.3, 0.02), Some(Side::Cold));
        assert_eq!(Side::of(0.3, 0.02), Some(Side::Hot));
        assert_eq!(Side::of(0.01, 0.02), None);
        assert_eq!(Side::of(-0.02, 0.02), None);
    }

    #[test]
    fn build_honours_variant() {
        let kernel = build(PredictorConfig::default());
        assert_eq!(kernel.name(), "kernel");

        let window = build(PredictorConfig {
            variant: PredictorVariant::Window,
            ..Default::default()
        });
        assert_eq!(window.name(), "window");
    }
}
