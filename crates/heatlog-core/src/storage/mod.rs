mod config;
pub mod database;
mod memory;
pub mod migrations;

pub use config::{Config, StoreConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::StoreError;
use crate::observation::Observation;

/// Source of observations for predictions and sink for feedback.
///
/// Reads return observations newest first. `limit` caps the number of rows
/// returned; `None` means no cap.
pub trait ObservationStore {
    /// The owner's own observations.
    fn observations_by_owner(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError>;

    /// Everybody else's observations.
    fn observations_excluding(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError>;

    /// Persist a validated observation.
    fn append(&self, observation: &Observation) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<Observation>, StoreError>;

    /// Observations of one owner or of everyone, newest first.
    fn list(
        &self,
        owner: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError>;

    /// Delete one observation. Fails with [`StoreError::NotFound`] for an unknown id.
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Delete all of an owner's observations, returning how many were removed.
    fn delete_owner(&self, owner: &str) -> Result<usize, StoreError>;

    /// Delete every observation, returning how many were removed.
    fn delete_all(&self) -> Result<usize, StoreError>;
}

/// Returns `~/.config/heatlog[-dev]/` based on HEATLOG_ENV.
///
/// Set HEATLOG_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("HEATLOG_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("heatlog-dev")
    } else {
        base_dir.join("heatlog")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StoreError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
