//! Tunable constants of the prediction engine.
//!
//! Every kernel width, boost, cap and threshold lives here so that variants
//! can be compared by configuration alone. Satisfaction tolerances are
//! expressed on the normalised deviation axis of [`SatisfactionScale`]
//! (`-1.0` fully cold, `+1.0` fully hot) and therefore work on any scale.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::observation::SatisfactionScale;

/// Which predictor implementation serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorVariant {
    /// Gaussian kernel neighbours with anchors, pattern guard and blending
    #[default]
    Kernel,
    /// Box-window similarity with tiered recency
    Window,
}

impl std::str::FromStr for PredictorVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kernel" => Ok(Self::Kernel),
            "window" => Ok(Self::Window),
            other => Err(ConfigError::InvalidValue {
                key: "predictor.variant".into(),
                message: format!("unknown variant '{other}', expected kernel or window"),
            }),
        }
    }
}

/// Rounding policy applied to the final estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round half away from zero
    Nearest,
    /// Always round up
    NeverCold,
    /// Up after cold feedback, down only after hot feedback with a small
    /// fractional part, nearest otherwise
    #[default]
    Adaptive,
}

/// Similarity weighting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Gaussian width on shower duration (minutes)
    pub sigma_duration: f64,
    /// Gaussian width on ambient temperature (degrees)
    pub sigma_temperature: f64,
    pub recency_half_life_days: f64,
    /// Width of the reliability penalty on normalised deviation
    pub reliability_sigma: f64,
    /// Multiplier for the querying owner's observations
    pub user_boost: f64,
    /// Coarse bucket size for frequency dampening
    pub bucket_duration: f64,
    pub bucket_temperature: f64,
    /// Neighbours kept per source
    pub k: usize,
    pub min_k: usize,
    /// Total weight below which a source counts as empty
    pub min_total_weight: f64,
    /// Context window half-width, in kernel sigmas
    pub context_sigmas: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            sigma_duration: 4.0,
            sigma_temperature: 3.0,
            recency_half_life_days: 5.0,
            reliability_sigma: 0.44,
            user_boost: 2.0,
            bucket_duration: 1.0,
            bucket_temperature: 1.0,
            k: 25,
            min_k: 6,
            min_total_weight: 1e-9,
            context_sigmas: 2.0,
        }
    }
}

/// Implied-target parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Deviation treated as perfect
    pub deadband: f64,
    /// Correction curve `floor + linear*x + quadratic*x^2`
    pub correction_floor: f64,
    pub correction_linear: f64,
    pub correction_quadratic: f64,
    pub max_correction: f64,
    /// Cold deviation from which the overshoot kicks in
    pub overshoot_threshold: f64,
    pub overshoot_fraction: f64,
    /// Cap on the total cold increase (fraction of the recorded time)
    pub max_increase_fraction: f64,
    pub amplify_after: usize,
    pub amplify_factor: f64,
    pub strong_amplify_after: usize,
    pub strong_amplify_factor: f64,
    pub max_amplified_fraction: f64,
    /// Shift targets along the default formula slopes toward the query
    pub context_transfer: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            deadband: 0.02,
            correction_floor: 0.01,
            correction_linear: 0.04,
            correction_quadratic: 0.20,
            max_correction: 0.25,
            overshoot_threshold: 0.5,
            overshoot_fraction: 0.05,
            max_increase_fraction: 0.35,
            amplify_after: 3,
            amplify_factor: 2.0,
            strong_amplify_after: 5,
            strong_amplify_factor: 3.0,
            max_amplified_fraction: 0.6,
            context_transfer: true,
        }
    }
}

/// Anchor detection, contradiction decay and blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// `|deviation| <= tolerance` marks an anchor
    pub tolerance: f64,
    pub boost: f64,
    /// Heating time distance (minutes) counting as a re-attempt
    pub retry_tolerance: f64,
    pub min_contradictions: usize,
    pub decay_base: f64,
    pub decay_per_attempt: f64,
    pub decay_floor: f64,
    /// Gain on the anchors' weight share
    pub blend: f64,
    pub max_influence: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.04,
            boost: 2.0,
            retry_tolerance: 0.5,
            min_contradictions: 2,
            decay_base: 0.5,
            decay_per_attempt: 0.1,
            decay_floor: 0.1,
            blend: 1.0,
            max_influence: 0.7,
        }
    }
}

/// Stuck-pattern detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub enabled: bool,
    pub window: usize,
    pub min_window: usize,
    /// Heating time variance (min^2) below which attempts count as clustered
    pub max_variance: f64,
    /// Share of poor attempts that triggers an override
    pub poor_share: f64,
    /// Deviation above which a hot attempt counts as poor
    pub hot_threshold: f64,
    pub severe_deviation: f64,
    pub severe_cold_jump: f64,
    pub cold_jump: f64,
    pub severe_hot_jump: f64,
    pub hot_jump: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 4,
            min_window: 3,
            max_variance: 1.0,
            poor_share: 0.75,
            hot_threshold: 0.1,
            severe_deviation: 0.4,
            severe_cold_jump: 0.5,
            cold_jump: 0.3,
            severe_hot_jump: 0.25,
            hot_jump: 0.15,
        }
    }
}

/// User/global blending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Effective neighbour count at which the user weight reaches 1 - 1/e
    pub saturation: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self { saturation: 3.0 }
    }
}

/// Clamping and rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub min_minutes: f64,
    pub max_minutes: f64,
    /// Max relative change against the latest similar observation
    pub step_cap_fraction: f64,
    pub step_window_days: f64,
    pub rounding: RoundingPolicy,
    /// Rounding resolution in minutes
    pub resolution: f64,
    pub trend_window: usize,
    pub snap_down_fraction: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_minutes: 5.0,
            max_minutes: 120.0,
            step_cap_fraction: 0.35,
            step_window_days: 30.0,
            rounding: RoundingPolicy::Adaptive,
            resolution: 1.0,
            trend_window: 3,
            snap_down_fraction: 0.25,
        }
    }
}

/// Cold-start formula `base + duration_coefficient*d + temperature_coefficient*t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultFormula {
    pub base: f64,
    pub duration_coefficient: f64,
    pub temperature_coefficient: f64,
    pub minimum: f64,
}

impl Default for DefaultFormula {
    fn default() -> Self {
        Self {
            base: 8.0,
            duration_coefficient: 0.3,
            temperature_coefficient: -0.1,
            minimum: 2.0,
        }
    }
}

impl DefaultFormula {
    pub fn evaluate(&self, duration: f64, temperature: f64) -> f64 {
        let value = self.base
            + self.duration_coefficient * duration
            + self.temperature_coefficient * temperature;
        value.max(self.minimum)
    }
}

/// Parameters of the window predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub duration_window: f64,
    pub temperature_window: f64,
    /// Adjustment in minutes at the ends of the scale
    pub max_adjustment: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
    pub recent_days: f64,
    pub recent_boost: f64,
    pub month_days: f64,
    pub month_boost: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            duration_window: 3.0,
            temperature_window: 2.0,
            max_adjustment: 4.0,
            min_minutes: 2.0,
            max_minutes: 30.0,
            recent_days: 7.0,
            recent_boost: 2.0,
            month_days: 30.0,
            month_boost: 1.5,
        }
    }
}

/// Upper bound on monotone grid points; each one costs a full estimate.
const MAX_GRID_POINTS: f64 = 20_000.0;

/// Grid of conditions over which predictions are kept monotone.
///
/// The grid should cover the accepted query range; queries beyond it are
/// evaluated at the nearest edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonotoneConfig {
    pub enabled: bool,
    pub min_duration: f64,
    pub max_duration: f64,
    pub duration_step: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub temperature_step: f64,
}

impl Default for MonotoneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_duration: 1.0,
            max_duration: 60.0,
            duration_step: 1.0,
            min_temperature: -50.0,
            max_temperature: 50.0,
            temperature_step: 2.0,
        }
    }
}

/// Complete predictor configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default)]
    pub variant: PredictorVariant,
    #[serde(default)]
    pub scale: SatisfactionScale,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub blend: BlendConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub default_formula: DefaultFormula,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub monotone: MonotoneConfig,
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, format!("must be positive, got {value}")))
    }
}

fn fraction(key: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, format!("must be within [0, 1], got {value}")))
    }
}

fn ordered(key: &str, low: f64, high: f64) -> Result<(), ConfigError> {
    if low.is_finite() && high.is_finite() && low <= high {
        Ok(())
    } else {
        Err(invalid(key, format!("must be finite and >= {low}, got {high}")))
    }
}

impl PredictorConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scale.is_valid() {
            return Err(invalid(
                "predictor.scale",
                "perfect must lie strictly between min and max",
            ));
        }

        let k = &self.kernel;
        positive("predictor.kernel.sigma_duration", k.sigma_duration)?;
        positive("predictor.kernel.sigma_temperature", k.sigma_temperature)?;
        positive("predictor.kernel.recency_half_life_days", k.recency_half_life_days)?;
        positive("predictor.kernel.reliability_sigma", k.reliability_sigma)?;
        positive("predictor.kernel.user_boost", k.user_boost)?;
        positive("predictor.kernel.bucket_duration", k.bucket_duration)?;
        positive("predictor.kernel.bucket_temperature", k.bucket_temperature)?;
        positive("predictor.kernel.context_sigmas", k.context_sigmas)?;
        if k.k == 0 {
            return Err(invalid("predictor.kernel.k", "must be at least 1"));
        }

        let t = &self.target;
        fraction("predictor.target.deadband", t.deadband)?;
        if t.deadband >= 1.0 {
            return Err(invalid("predictor.target.deadband", "must be below 1"));
        }
        fraction("predictor.target.max_correction", t.max_correction)?;
        fraction("predictor.target.max_amplified_fraction", t.max_amplified_fraction)?;
        if t.max_amplified_fraction >= 1.0 {
            return Err(invalid(
                "predictor.target.max_amplified_fraction",
                "must be below 1 so targets stay positive",
            ));
        }

        let a = &self.anchor;
        fraction("predictor.anchor.tolerance", a.tolerance)?;
        positive("predictor.anchor.boost", a.boost)?;
        fraction("predictor.anchor.decay_floor", a.decay_floor)?;
        fraction("predictor.anchor.max_influence", a.max_influence)?;

        let p = &self.pattern;
        if p.min_window == 0 || p.min_window > p.window {
            return Err(invalid(
                "predictor.pattern.min_window",
                "must be between 1 and pattern.window",
            ));
        }
        fraction("predictor.pattern.poor_share", p.poor_share)?;

        positive("predictor.blend.saturation", self.blend.saturation)?;

        let s = &self.safety;
        positive("predictor.safety.min_minutes", s.min_minutes)?;
        if s.max_minutes < s.min_minutes {
            return Err(invalid(
                "predictor.safety.max_minutes",
                format!("must be >= min_minutes ({})", s.min_minutes),
            ));
        }
        fraction("predictor.safety.step_cap_fraction", s.step_cap_fraction)?;
        positive("predictor.safety.resolution", s.resolution)?;
        fraction("predictor.safety.snap_down_fraction", s.snap_down_fraction)?;

        positive("predictor.window.duration_window", self.window.duration_window)?;
        positive("predictor.window.temperature_window", self.window.temperature_window)?;

        let m = &self.monotone;
        positive("predictor.monotone.duration_step", m.duration_step)?;
        positive("predictor.monotone.temperature_step", m.temperature_step)?;
        ordered("predictor.monotone.max_duration", m.min_duration, m.max_duration)?;
        ordered("predictor.monotone.max_temperature", m.min_temperature, m.max_temperature)?;
        let points = ((m.max_duration - m.min_duration) / m.duration_step + 1.0)
            * ((m.max_temperature - m.min_temperature) / m.temperature_step + 1.0);
        if points > MAX_GRID_POINTS {
            return Err(invalid(
                "predictor.monotone",
                format!("grid of {points:.0} points exceeds {MAX_GRID_POINTS}"),
            ));
        }
        Ok(())
    }
}
