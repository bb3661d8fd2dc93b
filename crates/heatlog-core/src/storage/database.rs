//! SQLite-based observation storage.
//!
//! Observations live in a single table keyed by their UUID, indexed for the
//! two reads a prediction makes: one owner's history and everybody else's.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations, ObservationStore};
use crate::error::StoreError;
use crate::observation::Observation;

const COLUMNS: &str = "id, owner, occurred_at, duration, temperature, heating_time, satisfaction";

/// SQLite database for observation storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/heatlog/heatlog.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("heatlog.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "observation database opened");
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        migrations::migrate(&self.conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    /// Number of stored observations.
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn query(
        &self,
        sql: &str,
        arg: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match arg {
            Some(a) => stmt.query_map(params![a, limit], row_to_observation)?,
            None => stmt.query_map(params![limit], row_to_observation)?,
        };
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let occurred_at: String = row.get(2)?;
    let occurred_at = DateTime::parse_from_rfc3339(&occurred_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Observation {
        id: row.get(0)?,
        owner: row.get(1)?,
        occurred_at,
        duration: row.get(3)?,
        temperature: row.get(4)?,
        heating_time: row.get(5)?,
        satisfaction: row.get(6)?,
    })
}

impl ObservationStore for Database {
    fn observations_by_owner(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM observations \
                 WHERE owner = ?1 ORDER BY occurred_at DESC LIMIT ?2"
            ),
            Some(owner),
            limit,
        )
    }

    fn observations_excluding(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM observations \
                 WHERE owner <> ?1 ORDER BY occurred_at DESC LIMIT ?2"
            ),
            Some(owner),
            limit,
        )
    }

    fn append(&self, o: &Observation) -> Result<(), StoreError> {
        self.conn.execute(
            &format!("INSERT INTO observations ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                o.id,
                o.owner,
                // fixed width so ORDER BY occurred_at stays chronological
                o.occurred_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                o.duration,
                o.temperature,
                o.heating_time,
                o.satisfaction,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Observation>, StoreError> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM observations WHERE id = ?1"),
                params![id],
                row_to_observation,
            )
            .optional()?;
        Ok(found)
    }

    fn list(
        &self,
        owner: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Observation>, StoreError> {
        match owner {
            Some(o) => self.observations_by_owner(o, limit),
            None => self.query(
                &format!("SELECT {COLUMNS} FROM observations ORDER BY occurred_at DESC LIMIT ?1"),
                None,
                limit,
            ),
        }
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let n = self.conn.execute("DELETE FROM observations WHERE id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        tracing::info!(id, "observation deleted");
        Ok(())
    }

    fn delete_owner(&self, owner: &str) -> Result<usize, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM observations WHERE owner = ?1", params![owner])?;
        tracing::info!(owner, count = n, "owner history deleted");
        Ok(n)
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let n = self.conn.execute("DELETE FROM observations", [])?;
        tracing::info!(count = n, "all observations deleted");
        Ok(n)
    }
}
