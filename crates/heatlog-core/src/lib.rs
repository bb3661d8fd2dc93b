//! # Heatlog Core Library
//!
//! This library provides the core logic for heatlog, a water heater pre-heat
//! advisor. Given today's shower duration and ambient temperature it
//! recommends how long to run the heater, and learns from the satisfaction
//! ratings fed back after each shower. All operations are available via the
//! standalone CLI binary built on top of this crate.
//!
//! ## Architecture
//!
//! - **Predictor**: pure, stateless estimation from a history snapshot
//!   (kernel weighting, implied targets, anchors, pattern guard, blending,
//!   safety rounding)
//! - **Storage**: SQLite-based observation storage and TOML-based configuration
//! - **Service**: validation, history fetch and feedback append around a predictor
//! - **Simulation**: seeded synthetic owner for convergence checks
//!
//! ## Key Components
//!
//! - [`KernelPredictor`]: default prediction engine
//! - [`PredictionService`]: store-backed entry point
//! - [`Database`]: observation persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod observation;
pub mod predictor;
pub mod service;
pub mod simulation;
pub mod storage;

pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use observation::{Feedback, InputLimits, Observation, Query, SatisfactionScale};
pub use predictor::{
    History, KernelPredictor, Prediction, PredictionSource, Predictor, PredictorConfig,
    PredictorVariant, StrategicOverride, WindowPredictor,
};
pub use service::PredictionService;
pub use simulation::{ConvergenceSimulator, SimulationConfig, SimulationReport};
pub use storage::{Config, Database, MemoryStore, ObservationStore};
