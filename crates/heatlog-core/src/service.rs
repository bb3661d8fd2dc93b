//! Prediction service.
//!
//! Glue between an [`ObservationStore`] and a [`Predictor`]: validates the
//! request, fetches the two history slices and runs the engine. Feedback is
//! validated against the same limits and the configured satisfaction scale
//! before it is appended.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::observation::{Feedback, InputLimits, Observation, Query, SatisfactionScale};
use crate::predictor::{self, History, Prediction, Predictor};
use crate::storage::{Config, ObservationStore, StoreConfig};

pub struct PredictionService<S: ObservationStore> {
    store: S,
    predictor: Box<dyn Predictor>,
    scale: SatisfactionScale,
    store_config: StoreConfig,
    limits: InputLimits,
}

impl<S: ObservationStore> PredictionService<S> {
    /// Service with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: S, config: Config) -> Self {
        Self {
            store,
            scale: config.predictor.scale,
            predictor: predictor::build(config.predictor),
            store_config: config.store,
            limits: config.limits,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn predictor_name(&self) -> &'static str {
        self.predictor.name()
    }

    /// Predict the heating time for `query` as of now.
    pub fn predict(&self, query: &Query) -> Result<Prediction> {
        self.predict_at(query, Utc::now())
    }

    /// Predict the heating time for `query` as of `now`.
    ///
    /// # Errors
    /// Fails on an invalid query, before the store is touched, or when the
    /// store cannot be read.
    pub fn predict_at(&self, query: &Query, now: DateTime<Utc>) -> Result<Prediction> {
        self.limits.validate_query(query)?;

        let history = self.history(&query.owner)?;
        let prediction = self.predictor.predict(query, &history, now);
        tracing::info!(
            owner = %query.owner,
            duration = query.duration,
            temperature = query.temperature,
            heating_time = prediction.heating_time,
            source = ?prediction.source,
            predictor = self.predictor_name(),
            "prediction served"
        );
        Ok(prediction)
    }

    /// The two history slices a prediction for `owner` reads.
    pub fn history(&self, owner: &str) -> Result<History> {
        let user = self
            .store
            .observations_by_owner(owner, Some(self.store_config.user_history_limit))?;
        let global = self
            .store
            .observations_excluding(owner, Some(self.store_config.global_history_limit))?;
        tracing::debug!(owner, user = user.len(), global = global.len(), "history fetched");
        Ok(History::new(user, global))
    }

    /// Validate feedback and append it as a new observation.
    pub fn submit_feedback(&self, feedback: Feedback) -> Result<Observation> {
        self.submit_feedback_at(feedback, Utc::now())
    }

    pub fn submit_feedback_at(
        &self,
        feedback: Feedback,
        now: DateTime<Utc>,
    ) -> Result<Observation> {
        self.limits.validate_feedback(&feedback, &self.scale, now)?;
        let mut observation = feedback.into_observation(now);
        if observation.occurred_at > now {
            tracing::warn!(
                id = %observation.id,
                occurred_at = %observation.occurred_at,
                "feedback timestamp ahead of clock, clamping to now"
            );
            observation.occurred_at = now;
        }
        self.store.append(&observation)?;
        tracing::info!(
            id = %observation.id,
            owner = %observation.owner,
            heating_time = observation.heating_time,
            satisfaction = observation.satisfaction,
            "feedback stored"
        );
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, StoreError, ValidationError};
    use crate::predictor::PredictionSource;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts reads and fails every call.
    #[derive(Default)]
    struct FailingStore {
        reads: AtomicUsize,
    }

    impl ObservationStore for FailingStore {
        fn observations_by_owner(
            &self,
            _: &str,
            _: Option<usize>,
        ) -> std::result::Result<Vec<Observation>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Locked)
        }
        fn observations_excluding(
            &self,
            _: &str,
            _: Option<usize>,
        ) -> std::result::Result<Vec<Observation>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Locked)
        }
        fn append(&self, _: &Observation) -> std::result::Result<(), StoreError> {
            Err(StoreError::Locked)
        }
        fn get(&self, _: &str) -> std::result::Result<Option<Observation>, StoreError> {
            Err(StoreError::Locked)
        }
        fn list(
            &self,
            _: Option<&str>,
            _: Option<usize>,
        ) -> std::result::Result<Vec<Observation>, StoreError> {
            Err(StoreError::Locked)
        }
        fn delete(&self, _: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Locked)
        }
        fn delete_owner(&self, _: &str) -> std::result::Result<usize, StoreError> {
            Err(StoreError::Locked)
        }
        fn delete_all(&self) -> std::result::Result<usize, StoreError> {
            Err(StoreError::Locked)
        }
    }

    fn feedback(heating_time: f64, satisfaction: f64) -> Feedback {
        Feedback {
            owner: "alice".into(),
            duration: 15.0,
            temperature: 22.0,
            heating_time,
            satisfaction,
            occurred_at: None,
        }
    }

    #[test]
    fn invalid_query_never_reaches_store() {
        let service = PredictionService::new(FailingStore::default());
        let err = service.predict(&Query::new("alice", 75.0, 20.0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));
        assert_eq!(service.store().reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn store_failure_propagates() {
        let service = PredictionService::new(FailingStore::default());
        let err = service.predict(&Query::new("alice", 15.0, 20.0)).unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::Locked)));
    }

    #[test]
    fn empty_store_cold_starts() {
        let service = PredictionService::new(MemoryStore::new());
        let p = service.predict(&Query::new("alice", 15.0, 22.0)).unwrap();
        assert_eq!(p.source, PredictionSource::ColdStart);
        assert_eq!(p.heating_time, 10.0);
    }

    #[test]
    fn feedback_is_validated_then_stored() {
        let service = PredictionService::new(MemoryStore::new());
        assert!(service.submit_feedback(feedback(10.0, 150.0)).is_err());
        assert!(service.store().is_empty());

        let stored = service.submit_feedback(feedback(10.0, 45.0)).unwrap();
        assert_eq!(service.store().get(&stored.id).unwrap(), Some(stored));
    }

    #[test]
    fn feedback_changes_next_prediction() {
        let service = PredictionService::new(MemoryStore::new());
        let before = service.predict(&Query::new("alice", 15.0, 22.0)).unwrap();
        service.submit_feedback(feedback(20.0, 90.0)).unwrap();
        let after = service.predict(&Query::new("alice", 15.0, 22.0)).unwrap();
        assert_ne!(before.source, after.source);
        assert_eq!(after.source, PredictionSource::User);
    }

    #[test]
    fn slight_clock_skew_is_clamped() {
        let service = PredictionService::new(MemoryStore::new());
        let now = Utc::now();
        let mut fb = feedback(10.0, 50.0);
        fb.occurred_at = Some(now + chrono::Duration::seconds(60));
        let stored = service.submit_feedback_at(fb, now).unwrap();
        assert_eq!(stored.occurred_at, now);
    }

    #[test]
    fn variant_is_a_configuration_switch() {
        let mut config = Config::default();
        config.predictor.variant = crate::predictor::PredictorVariant::Window;
        let service = PredictionService::with_config(MemoryStore::new(), config);
        assert_eq!(service.predictor_name(), "window");
    }
}
