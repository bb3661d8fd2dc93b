pub mod config;
pub mod delete;
pub mod feedback;
pub mod history;
pub mod predict;
pub mod simulate;

use heatlog_core::{Config, Database, PredictionService};

/// Open the configured database, honouring `store.database`.
pub fn open_database(config: &Config) -> Result<Database, Box<dyn std::error::Error>> {
    let db = match &config.store.database {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using configured database");
            Database::open_at(path)?
        }
        None => Database::open()?,
    };
    Ok(db)
}

/// Load the configuration and build a service over the database.
pub fn open_service() -> Result<PredictionService<Database>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = open_database(&config)?;
    Ok(PredictionService::with_config(db, config))
}
