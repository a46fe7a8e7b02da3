// Storage module: durable price history behind the HistoryStore trait.

pub mod sqlite;

pub use sqlite::SqliteStorage;

use crate::model::{PriceSample, RouteDateKey, StorageError};
use std::collections::HashMap;

/// Repository of observed samples per route+date key.
pub trait HistoryStore {
    /// Persists one sample and returns its record id.
    fn append(&mut self, key: &RouteDateKey, sample: &PriceSample) -> Result<i64, StorageError>;

    /// All samples for the key, oldest observation first.
    fn query(&self, key: &RouteDateKey) -> Result<Vec<PriceSample>, StorageError>;
}

/// Non-durable store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<RouteDateKey, Vec<PriceSample>>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn append(&mut self, key: &RouteDateKey, sample: &PriceSample) -> Result<i64, StorageError> {
        self.next_id += 1;
        self.records.entry(key.clone()).or_default().push(sample.clone());
        Ok(self.next_id)
    }

    fn query(&self, key: &RouteDateKey) -> Result<Vec<PriceSample>, StorageError> {
        let mut samples = self.records.get(key).cloned().unwrap_or_default();
        // Stable sort keeps arrival order for equal timestamps.
        samples.sort_by_key(|s| s.observed_at());
        Ok(samples)
    }
}
