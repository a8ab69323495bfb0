//! SQLite adapter: Implementation of SampleSource.
//!
//! Reads historical laboratory records from the `calidad_agua` table used by
//! the offline training pipeline. Dates are stored as `YYYY-MM-DD` text; a
//! trailing time component is ignored.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex is reported as
//! `StorageError::LockPoisoned` instead of panicking.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::domain::features::DATE_FORMAT;
use crate::domain::WaterSample;
use crate::ports::SampleSource;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// SQLite store of historical water-quality records.
pub struct SqliteSampleStore {
    conn: Mutex<Connection>,
}

impl SqliteSampleStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS calidad_agua (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fecha TEXT NOT NULL,
                ph REAL,
                turbidez REAL,
                conductividad REAL,
                tds REAL,
                dureza REAL,
                color REAL,
                ica REAL
            );

            CREATE INDEX IF NOT EXISTS idx_calidad_agua_fecha
                ON calidad_agua(fecha);
            ",
        )?;

        Ok(())
    }

    /// Insert one record.
    ///
    /// # Errors
    /// Returns error if the insert fails.
    pub fn insert_sample(&self, sample: &WaterSample) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            r"
            INSERT INTO calidad_agua (
                fecha, ph, turbidez, conductividad, tds, dureza, color, ica
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                sample.fecha.format(DATE_FORMAT).to_string(),
                sample.ph,
                sample.turbidez,
                sample.conductividad,
                sample.tds,
                sample.dureza,
                sample.color,
                sample.ica,
            ],
        )?;
        Ok(())
    }

    fn parse_fecha(raw: &str) -> Result<NaiveDate, StorageError> {
        raw.get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .ok_or_else(|| StorageError::InvalidRecord(format!("unparsable fecha '{raw}'")))
    }
}

impl SampleSource for SqliteSampleStore {
    type Error = StorageError;

    fn load_samples(&self) -> Result<Vec<WaterSample>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r"
            SELECT fecha, ph, turbidez, conductividad, tds, dureza, color, ica
            FROM calidad_agua
            ORDER BY fecha ASC, id ASC
            ",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                WaterSample {
                    fecha: NaiveDate::MIN,
                    ph: row.get(1)?,
                    turbidez: row.get(2)?,
                    conductividad: row.get(3)?,
                    tds: row.get(4)?,
                    dureza: row.get(5)?,
                    color: row.get(6)?,
                    ica: row.get(7)?,
                },
            ))
        })?;

        let mut samples = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            let (raw_fecha, mut sample) = row?;
            match Self::parse_fecha(&raw_fecha) {
                Ok(fecha) => {
                    sample.fecha = fecha;
                    samples.push(sample);
                }
                Err(e) => {
                    tracing::warn!("Skipping record: {}", e);
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            "Loaded {} records from calidad_agua ({} skipped)",
            samples.len(),
            skipped
        );
        Ok(samples)
    }

    fn count_samples(&self) -> Result<usize, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM calidad_agua", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StorageError::InvalidRecord(format!("negative count {count}")))
    }
}
