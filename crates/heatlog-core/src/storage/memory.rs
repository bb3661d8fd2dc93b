//! In-memory observation store.

use std::cmp::Reverse;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::ObservationStore;
use crate::error::StoreError;
use crate::observation::Observation;

/// Observation store held in memory, used by tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    observations: RwLock<Vec<Observation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observations(observations: Vec<Observation>) -> Self {
        Self {
            observations: RwLock::new(observations),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Observation>>, StoreError> {
        self.observations.read().map_err(|_| StoreError::Locked)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Observation>>, StoreError> {
        self.observations.write().map_err(|_| StoreError::Locked)
    }

    fn select(
        &self,
        keep: impl Fn(&Observation) -> bool,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        let mut out: Vec<Observation> = self.read()?.iter().filter(|o| keep(*o)).cloned().collect();
        out.sort_by_key(|o| Reverse(o.occurred_at));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

impl ObservationStore for MemoryStore {
    fn observations_by_owner(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        self.select(|o| o.owner == owner, limit)
    }

    fn observations_excluding(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        self.select(|o| o.owner != owner, limit)
    }

    fn append(&self, observation: &Observation) -> Result<(), StoreError> {
        let mut all = self.write()?;
        if all.iter().any(|o| o.id == observation.id) {
            return Err(StoreError::QueryFailed(format!(
                "duplicate observation id {}",
                observation.id
            )));
        }
        all.push(observation.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Observation>, StoreError> {
        Ok(self.read()?.iter().find(|o| o.id == id).cloned())
    }

    fn list(
        &self,
        owner: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        self.select(|o| owner.map_or(true, |w| o.owner == w), limit)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut all = self.write()?;
        let before = all.len();
        all.retain(|o| o.id != id);
        if all.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_owner(&self, owner: &str) -> Result<usize, StoreError> {
        let mut all = self.write()?;
        let before = all.len();
        all.retain(|o| o.owner != owner);
        Ok(before - all.len())
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let mut all = self.write()?;
        let n = all.len();
        all.clear();
        Ok(n)
    }
}
