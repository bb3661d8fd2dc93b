//! Shared numeric helpers for the predictors.

use std::f64::consts::LN_2;

/// Unnormalised Gaussian falloff `exp(-0.5 (delta/sigma)^2)`.
///
/// A non-positive width yields zero weight.
pub fn gaussian(delta: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    let x = delta / sigma;
    (-0.5 * x * x).exp()
}

/// Exponential decay that halves every `half_life` days.
pub fn half_life_decay(days: f64, half_life: f64) -> f64 {
    if half_life <= 0.0 {
        return 1.0;
    }
    (-LN_2 * days.max(0.0) / half_life).exp()
}

/// Coarse bucket used for frequency dampening.
pub fn bucket_key(
    duration: f64,
    temperature: f64,
    bucket_duration: f64,
    bucket_temperature: f64,
) -> (i64, i64) {
    (
        (duration / bucket_duration).round() as i64,
        (temperature / bucket_temperature).round() as i64,
    )
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population variance, `None` for an empty slice.
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Running weighted mean and spread.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAccumulator {
    weight: f64,
    weighted_sum: f64,
    weighted_sq_sum: f64,
    count: usize,
}

impl WeightedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; non-positive or non-finite weights are ignored.
    pub fn push(&mut self, value: f64, weight: f64) {
        if weight <= 0.0 || !weight.is_finite() || !value.is_finite() {
            return;
        }
        self.weight += weight;
        self.weighted_sum += value * weight;
        self.weighted_sq_sum += value * value * weight;
        self.count += 1;
    }

    pub fn total_weight(&self) -> f64 {
        self.weight
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        if self.weight > 0.0 {
            Some(self.weighted_sum / self.weight)
        } else {
            None
        }
    }

    pub fn variance(&self) -> Option<f64> {
        let m = self.mean()?;
        Some((self.weighted_sq_sum / self.weight - m * m).max(0.0))
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

impl FromIterator<(f64, f64)> for WeightedAccumulator {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut acc = Self::new();
        for (value, weight) in iter {
            acc.push(value, weight);
        }
        acc
    }
}

/// Round `value` to a multiple of `resolution` with the given rounding function.
pub fn round_to(value: f64, resolution: f64, f: fn(f64) -> f64) -> f64 {
    if resolution <= 0.0 {
        return value;
    }
    f(value / resolution) * resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_peaks_at_zero_and_falls_off() {
        assert_eq!(gaussian(0.0, 4.0), 1.0);
        assert!((gaussian(4.0, 4.0) - (-0.5f64).exp()).abs() < 1e-12);
        assert_eq!(gaussian(4.0, 4.0), gaussian(-4.0, 4.0));
        assert_eq!(gaussian(1.0, 0.0), 0.0);
    }

    #[test]
    fn half_life_halves() {
        assert!((half_life_decay(5.0, 5.0) - 0.5).abs() < 1e-12);
        assert!((half_life_decay(10.0, 5.0) - 0.25).abs() < 1e-12);
        assert_eq!(half_life_decay(-3.0, 5.0), 1.0);
        assert!(half_life_decay(60.0, 5.0) > 0.0);
    }

    #[test]
    fn buckets_round_to_whole_units() {
        assert_eq!(bucket_key(15.4, 21.6, 1.0, 1.0), (15, 22));
        assert_eq!(bucket_key(15.4, 21.6, 5.0, 5.0), (3, 4));
        assert_eq!(bucket_key(-0.4, -3.6, 1.0, 1.0), (0, -4));
    }

    #[test]
    fn weighted_accumulator_tracks_mean_and_spread() {
        let acc: WeightedAccumulator =
            [(10.0, 1.0), (20.0, 1.0), (99.0, 0.0)].into_iter().collect();
        assert_eq!(acc.count(), 2);
        assert_eq!(acc.mean(), Some(15.0));
        assert_eq!(acc.std_dev(), Some(5.0));
        assert!(WeightedAccumulator::new().mean().is_none());
    }

    #[test]
    fn variance_of_constant_is_zero() {
        assert_eq!(variance(&[8.0, 8.0, 8.0]), Some(0.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn round_to_resolution() {
        assert_eq!(round_to(10.26, 0.5, f64::round), 10.5);
        assert_eq!(round_to(10.26, 1.0, f64::ceil), 11.0);
    }
}
