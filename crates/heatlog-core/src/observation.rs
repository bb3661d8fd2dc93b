//! Observation data model.
//!
//! An [`Observation`] is one recorded fact: under these conditions the heater
//! ran this long and the owner rated the shower like this. Observations are
//! append-only. A [`Query`] asks for a recommendation under new conditions,
//! and a [`Feedback`] is the write-side contract that becomes an observation
//! once validated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Satisfaction rating scale.
///
/// The midpoint `perfect` means "just right"; lower scores mean too cold,
/// higher scores too hot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionScale {
    pub min: f64,
    pub max: f64,
    pub perfect: f64,
}

impl Default for SatisfactionScale {
    fn default() -> Self {
        Self::percent()
    }
}

impl SatisfactionScale {
    /// 1..=100 with 50 as perfect.
    pub fn percent() -> Self {
        Self {
            min: 1.0,
            max: 100.0,
            perfect: 50.0,
        }
    }

    /// 1..=10 with 5 as perfect.
    pub fn decimal() -> Self {
        Self {
            min: 1.0,
            max: 10.0,
            perfect: 5.0,
        }
    }

    /// Distance from perfect to the farther end of the scale.
    ///
    /// Both sides are normalised by the same span so equal point distances
    /// above and below perfect map to equal deviations.
    pub fn span(&self) -> f64 {
        (self.perfect - self.min).max(self.max - self.perfect).max(f64::EPSILON)
    }

    /// Signed normalised deviation from perfect: negative is cold, positive hot.
    pub fn deviation(&self, satisfaction: f64) -> f64 {
        ((satisfaction - self.perfect) / self.span()).clamp(-1.0, 1.0)
    }

    /// Whether a score lies on the scale.
    pub fn contains(&self, satisfaction: f64) -> bool {
        satisfaction >= self.min && satisfaction <= self.max
    }

    /// Scale is usable: ordered bounds with perfect strictly inside.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.perfect.is_finite()
            && self.min < self.perfect
            && self.perfect < self.max
    }
}

/// One recorded heating outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub owner: String,
    pub occurred_at: DateTime<Utc>,
    /// Shower length in minutes
    pub duration: f64,
    /// Ambient temperature in degrees
    pub temperature: f64,
    /// Heating time actually used, in minutes
    pub heating_time: f64,
    pub satisfaction: f64,
}

impl Observation {
    /// Age in fractional days relative to `now`, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.occurred_at).num_seconds() as f64;
        (secs / 86_400.0).max(0.0)
    }
}

/// A prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub owner: String,
    pub duration: f64,
    pub temperature: f64,
}

impl Query {
    pub fn new(owner: impl Into<String>, duration: f64, temperature: f64) -> Self {
        Self {
            owner: owner.into(),
            duration,
            temperature,
        }
    }
}

/// Feedback submitted after a shower, appended to the store once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub owner: String,
    pub duration: f64,
    pub temperature: f64,
    pub heating_time: f64,
    pub satisfaction: f64,
    /// Defaults to the time of submission.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Feedback {
    /// Turn validated feedback into an observation with a fresh id.
    pub fn into_observation(self, now: DateTime<Utc>) -> Observation {
        Observation {
            id: uuid::Uuid::new_v4().to_string(),
            owner: self.owner,
            occurred_at: self.occurred_at.unwrap_or(now),
            duration: self.duration,
            temperature: self.temperature,
            heating_time: self.heating_time,
            satisfaction: self.satisfaction,
        }
    }
}

/// Accepted ranges for query and feedback fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputLimits {
    #[serde(default = "default_duration_range")]
    pub duration: [f64; 2],
    #[serde(default = "default_temperature_range")]
    pub temperature: [f64; 2],
    #[serde(default = "default_heating_time_range")]
    pub heating_time: [f64; 2],
    /// Tolerated clock skew for feedback timestamps, in seconds.
    #[serde(default = "default_future_skew_secs")]
    pub future_skew_secs: i64,
}

fn default_duration_range() -> [f64; 2] {
    [1.0, 60.0]
}
fn default_temperature_range() -> [f64; 2] {
    [-50.0, 50.0]
}
fn default_heating_time_range() -> [f64; 2] {
    [2.0, 120.0]
}
fn default_future_skew_secs() -> i64 {
    300
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            duration: default_duration_range(),
            temperature: default_temperature_range(),
            heating_time: default_heating_time_range(),
            future_skew_secs: default_future_skew_secs(),
        }
    }
}

fn check_range(field: &'static str, value: f64, range: [f64; 2]) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < range[0] || value > range[1] {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: range[0],
            max: range[1],
        });
    }
    Ok(())
}

fn check_owner(owner: &str) -> Result<(), ValidationError> {
    if owner.trim().is_empty() {
        return Err(ValidationError::EmptyOwner);
    }
    Ok(())
}

impl InputLimits {
    /// Reject a query before any computation happens.
    pub fn validate_query(&self, query: &Query) -> Result<(), ValidationError> {
        check_owner(&query.owner)?;
        check_range("duration", query.duration, self.duration)?;
        check_range("temperature", query.temperature, self.temperature)?;
        Ok(())
    }

    /// Reject feedback that would violate observation invariants.
    pub fn validate_feedback(
        &self,
        feedback: &Feedback,
        scale: &SatisfactionScale,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        check_owner(&feedback.owner)?;
        check_range("duration", feedback.duration, self.duration)?;
        check_range("temperature", feedback.temperature, self.temperature)?;
        check_range("heating_time", feedback.heating_time, self.heating_time)?;
        check_range("satisfaction", feedback.satisfaction, [scale.min, scale.max])?;
        if let Some(at) = feedback.occurred_at {
            if at > now + chrono::Duration::seconds(self.future_skew_secs) {
                return Err(ValidationError::FutureTimestamp { at });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(satisfaction: f64) -> Feedback {
        Feedback {
            owner: "alice".into(),
            duration: 15.0,
            temperature: 22.0,
            heating_time: 10.0,
            satisfaction,
            occurred_at: None,
        }
    }

    #[test]
    fn deviation_is_symmetric_around_perfect() {
        let scale = SatisfactionScale::percent();
        assert_eq!(scale.span(), 50.0);
        assert_eq!(scale.deviation(40.0), -scale.deviation(60.0));
        assert_eq!(scale.deviation(50.0), 0.0);
        assert_eq!(scale.deviation(100.0), 1.0);
    }

    #[test]
    fn decimal_scale_normalises_like_percent() {
        let scale = SatisfactionScale::decimal();
        assert_eq!(scale.span(), 5.0);
        assert!((scale.deviation(9.0) - 0.8).abs() < 1e-12);
        assert!((SatisfactionScale::percent().deviation(90.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn query_out_of_range_is_rejected() {
        let limits = InputLimits::default();
        let err = limits
            .validate_query(&Query::new("alice", 75.0, 20.0))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "duration", .. }));

        let err = limits
            .validate_query(&Query::new("alice", 10.0, -60.0))
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "temperature", .. }));

        assert_eq!(
            limits.validate_query(&Query::new("  ", 10.0, 20.0)),
            Err(ValidationError::EmptyOwner)
        );
        assert!(limits.validate_query(&Query::new("alice", 10.0, 20.0)).is_ok());
    }

    #[test]
    fn nan_query_is_rejected() {
        let limits = InputLimits::default();
        assert_eq!(
            limits.validate_query(&Query::new("alice", f64::NAN, 20.0)),
            Err(ValidationError::NotFinite { field: "duration" })
        );
    }

    #[test]
    fn feedback_satisfaction_must_fit_scale() {
        let limits = InputLimits::default();
        let now = Utc::now();
        let scale = SatisfactionScale::percent();
        assert!(limits.validate_feedback(&feedback(50.0), &scale, now).is_ok());
        assert!(limits.validate_feedback(&feedback(0.0), &scale, now).is_err());
        assert!(limits
            .validate_feedback(&feedback(50.0), &SatisfactionScale::decimal(), now)
            .is_err());
    }

    #[test]
    fn future_feedback_is_rejected() {
        let limits = InputLimits::default();
        let now = Utc::now();
        let mut fb = feedback(50.0);
        fb.occurred_at = Some(now + chrono::Duration::hours(2));
        assert!(matches!(
            limits.validate_feedback(&fb, &SatisfactionScale::default(), now),
            Err(ValidationError::FutureTimestamp { .. })
        ));
    }

    #[test]
    fn into_observation_defaults_timestamp() {
        let now = Utc::now();
        let obs = feedback(45.0).into_observation(now);
        assert_eq!(obs.occurred_at, now);
        assert_eq!(obs.owner, "alice");
        assert!(!obs.id.is_empty());
    }
}
