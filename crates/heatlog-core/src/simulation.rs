//! Convergence simulation.
//!
//! Replays a synthetic owner day by day: draw today's conditions, ask the
//! engine for a heating time, rate it against a hidden ideal and feed the
//! rating back. The report shows how quickly the served heating time
//! approaches the ideal. Runs are deterministic for a given seed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observation::{Feedback, Query};
use crate::predictor::{PredictionSource, PredictorConfig};
use crate::service::PredictionService;
use crate::storage::{Config, MemoryStore};

/// Synthetic owner and run length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub days: usize,
    pub seed: u64,
    pub owner: String,
    /// Hidden ideal `base + duration_coefficient*d + temperature_coefficient*t`
    pub ideal_base: f64,
    pub ideal_duration_coefficient: f64,
    pub ideal_temperature_coefficient: f64,
    pub duration_range: [f64; 2],
    pub temperature_range: [f64; 2],
    /// Scale points gained per unit of relative error
    pub sensitivity: f64,
    /// Uniform rating noise, in scale points
    pub noise: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 28,
            seed: 42,
            owner: "sim".into(),
            ideal_base: 6.0,
            ideal_duration_coefficient: 0.4,
            ideal_temperature_coefficient: -0.15,
            duration_range: [8.0, 20.0],
            temperature_range: [5.0, 28.0],
            sensitivity: 200.0,
            noise: 3.0,
        }
    }
}

impl SimulationConfig {
    pub fn ideal(&self, duration: f64, temperature: f64) -> f64 {
        self.ideal_base
            + self.ideal_duration_coefficient * duration
            + self.ideal_temperature_coefficient * temperature
    }
}

/// One simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayResult {
    pub day: usize,
    pub duration: f64,
    pub temperature: f64,
    pub predicted: f64,
    pub ideal: f64,
    pub satisfaction: f64,
    pub abs_error: f64,
    pub source: PredictionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub predictor: String,
    pub seed: u64,
    pub days: Vec<DayResult>,
    /// Mean absolute error over the first seven days
    pub first_week_mae: f64,
    /// Mean absolute error over the last seven days
    pub last_week_mae: f64,
}

fn mae(days: &[DayResult]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    days.iter().map(|d| d.abs_error).sum::<f64>() / days.len() as f64
}

pub struct ConvergenceSimulator {
    config: SimulationConfig,
    predictor: PredictorConfig,
}

impl ConvergenceSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_predictor(config, PredictorConfig::default())
    }

    pub fn with_predictor(config: SimulationConfig, predictor: PredictorConfig) -> Self {
        Self { config, predictor }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 7, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Run the simulation against a fresh in-memory store.
    pub fn run(&self) -> Result<SimulationReport> {
        let cfg = &self.config;
        let service = PredictionService::with_config(
            MemoryStore::new(),
            Config {
                predictor: self.predictor.clone(),
                ..Default::default()
            },
        );
        let scale = self.predictor.scale;
        let mut rng = Mcg128Xsl64::seed_from_u64(cfg.seed);
        let mut days = Vec::with_capacity(cfg.days);

        for day in 0..cfg.days {
            let now = Self::start() + Duration::days(day as i64);
            let duration = rng.gen_range(cfg.duration_range[0]..=cfg.duration_range[1]).round();
            let temperature = rng
                .gen_range(cfg.temperature_range[0]..=cfg.temperature_range[1])
                .round();

            let query = Query::new(cfg.owner.clone(), duration, temperature);
            let prediction = service.predict_at(&query, now)?;
            let ideal = self.config.ideal(duration, temperature);
            let relative = (prediction.heating_time - ideal) / ideal;
            let noise = if cfg.noise > 0.0 {
                rng.gen_range(-cfg.noise..=cfg.noise)
            } else {
                0.0
            };
            let satisfaction = (scale.perfect + relative * cfg.sensitivity + noise)
                .round()
                .clamp(scale.min, scale.max);

            service.submit_feedback_at(
                Feedback {
                    owner: cfg.owner.clone(),
                    duration,
                    temperature,
                    heating_time: prediction.heating_time,
                    satisfaction,
                    occurred_at: Some(now),
                },
                now,
            )?;

            tracing::debug!(
                day,
                predicted = prediction.heating_time,
                ideal,
                satisfaction,
                "simulated day"
            );
            days.push(DayResult {
                day,
                duration,
                temperature,
                predicted: prediction.heating_time,
                ideal,
                satisfaction,
                abs_error: (prediction.heating_time - ideal).abs(),
                source: prediction.source,
            });
        }

        let week = days.len().min(7);
        Ok(SimulationReport {
            predictor: service.predictor_name().to_string(),
            seed: cfg.seed,
            first_week_mae: mae(&days[..week]),
            last_week_mae: mae(&days[days.len() - week..]),
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::PredictorVariant;

    #[test]
    fn same_seed_same_report() {
        let a = ConvergenceSimulator::new(SimulationConfig::default()).run().unwrap();
        let b = ConvergenceSimulator::new(SimulationConfig::default()).run().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.days.len(), 28);
    }

    #[test]
    fn different_seed_different_conditions() {
        let a = ConvergenceSimulator::new(SimulationConfig::default()).run().unwrap();
        let b = ConvergenceSimulator::new(SimulationConfig {
            seed: 7,
            ..Default::default()
        })
        .run()
        .unwrap();
        let conditions = |r: &SimulationReport| {
            r.days
                .iter()
                .map(|d| (d.duration, d.temperature))
                .collect::<Vec<_>>()
        };
        assert_ne!(conditions(&a), conditions(&b));
    }

    #[test]
    fn first_day_is_cold_start_and_outputs_stay_bounded() {
        let report = ConvergenceSimulator::new(SimulationConfig::default()).run().unwrap();
        assert_eq!(report.days[0].source, PredictionSource::ColdStart);
        for d in &report.days {
            assert!((5.0..=120.0).contains(&d.predicted), "{d:?}");
            assert!((1.0..=100.0).contains(&d.satisfaction), "{d:?}");
        }
        assert!(report.first_week_mae.is_finite() && report.last_week_mae.is_finite());
    }

    #[test]
    fn window_variant_runs() {
        let predictor = PredictorConfig {
            variant: PredictorVariant::Window,
            ..Default::default()
        };
        let report = ConvergenceSimulator::with_predictor(
            SimulationConfig {
                days: 5,
                ..Default::default()
            },
            predictor,
        )
        .run()
        .unwrap();
        assert_eq!(report.predictor, "window");
        assert_eq!(report.days.len(), 5);
    }
}
