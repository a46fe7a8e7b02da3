use crate::model::{PriceSample, RouteDateKey, StorageError};
use crate::storage::HistoryStore;
use crate::utils::parse_datetime;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::info;

/// Record counts across the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub samples: usize,
    pub routes: usize,
    pub travel_dates: usize,
}

/// A price_samples row before validation.
type RawRow = (i64, f64, String, String, u32, String);

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database file and creates the schema if needed
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {}", db_path, e)))?;
        Self::init(conn)
    }

    /// In-memory database that lives as long as the connection
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS price_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route_key TEXT NOT NULL,
                travel_date TEXT,
                price REAL NOT NULL,
                currency TEXT NOT NULL DEFAULT 'EUR',
                ticket_class TEXT NOT NULL,
                seats_available INTEGER NOT NULL,
                observed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_price_samples_route_observed
                ON price_samples (route_key, observed_at);

            CREATE INDEX IF NOT EXISTS idx_price_samples_observed
                ON price_samples (observed_at);
            "
        )?;
        info!("Price history database initialized");
        Ok(Self { conn })
    }

    /// Fixed-width timestamp so text order matches time order
    fn timestamp(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    /// History for the key over the last `days_back` days before `now`
    pub fn query_since(
        &self,
        key: &RouteDateKey,
        days_back: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceSample>, StorageError> {
        let cutoff = Self::timestamp(&(now - Duration::days(days_back)));
        let mut stmt = self.conn.prepare(
            "SELECT id, price, currency, ticket_class, seats_available, observed_at
             FROM price_samples WHERE route_key = ?1 AND observed_at >= ?2
             ORDER BY observed_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![key.as_str(), cutoff], Self::read_row)?;
        rows.map(|row| Self::map_sample(row?)).collect()
    }

    /// Deletes records older than `days_to_keep` days and returns how many went
    pub fn prune_older_than(&self, days_to_keep: i64, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = Self::timestamp(&(now - Duration::days(days_to_keep)));
        let deleted = self.conn.execute(
            "DELETE FROM price_samples WHERE observed_at < ?1",
            params![cutoff],
        )?;
        info!("Pruned {} price samples older than {} days", deleted, days_to_keep);
        Ok(deleted)
    }

    /// Totals for the whole database
    pub fn database_stats(&self) -> Result<StoreCounts, StorageError> {
        let (samples, routes, travel_dates): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT route_key), COUNT(DISTINCT travel_date) FROM price_samples",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StoreCounts {
            samples: samples as usize,
            routes: routes as usize,
            travel_dates: travel_dates as usize,
        })
    }

    /// Every route key with stored samples
    pub fn route_keys(&self) -> Result<Vec<RouteDateKey>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT route_key FROM price_samples ORDER BY route_key ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(RouteDateKey::from_raw(key?));
        }
        Ok(keys)
    }

    fn read_row(row: &rusqlite::Row) -> Result<RawRow, rusqlite::Error> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
    }

    /// Maps a result row to a PriceSample.
    /// Rows that fail validation are reported as corrupt.
    fn map_sample((id, price, currency, ticket_class, seats, observed_at): RawRow) -> Result<PriceSample, StorageError> {
        let observed_at = parse_datetime(&observed_at).ok_or_else(|| StorageError::CorruptRecord {
            id,
            reason: format!("bad timestamp {:?}", observed_at),
        })?;
        PriceSample::new(price, &currency, &ticket_class, seats, observed_at).map_err(|e| StorageError::CorruptRecord {
            id,
            reason: e.to_string(),
        })
    }
}

impl HistoryStore for SqliteStorage {
    fn append(&mut self, key: &RouteDateKey, sample: &PriceSample) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO price_samples (
                route_key, travel_date, price, currency,
                ticket_class, seats_available, observed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key.as_str(),
                key.travel_date().map(|d| d.format("%Y-%m-%d").to_string()),
                sample.price(),
                sample.currency(),
                sample.ticket_class(),
                sample.seats_available(),
                Self::timestamp(&sample.observed_at()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn query(&self, key: &RouteDateKey) -> Result<Vec<PriceSample>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, price, currency, ticket_class, seats_available, observed_at
             FROM price_samples WHERE route_key = ?1
             ORDER BY observed_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![key.as_str()], Self::read_row)?;
        rows.map(|row| Self::map_sample(row?)).collect()
    }
}
