use crate::analyzer::market_indicators::MarketIndicators;
use crate::model::{PriceSample, RouteDateKey, SeriesError, SeriesStats};
use std::collections::HashMap;

/// Min, max and mean over every sample of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Append-only history of one route+date key with running aggregates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    key: RouteDateKey,
    samples: Vec<PriceSample>,
    min: f64,
    max: f64,
    sum: f64,
}

impl PriceSeries {
    pub fn new(key: RouteDateKey) -> Self {
        Self {
            key,
            samples: Vec::new(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    /// Builds a series from samples in the given order.
    pub fn from_samples(key: RouteDateKey, samples: impl IntoIterator<Item = PriceSample>) -> Self {
        let mut series = Self::new(key);
        for sample in samples {
            series.append(sample);
        }
        series
    }

    pub fn append(&mut self, sample: PriceSample) {
        let price = sample.price();
        self.min = self.min.min(price);
        self.max = self.max.max(price);
        self.sum += price;
        self.samples.push(sample);
    }

    pub fn key(&self) -> &RouteDateKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Prices in arrival order.
    pub fn prices(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.price()).collect()
    }

    pub fn snapshot_statistics(&self) -> Result<Snapshot, SeriesError> {
        if self.samples.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        // Summation error can push the mean of equal prices past the max.
        let mean = (self.sum / self.samples.len() as f64).clamp(self.min, self.max);
        Ok(Snapshot {
            min: self.min,
            max: self.max,
            mean,
        })
    }

    /// Full descriptive statistics, `None` for an empty series.
    pub fn stats(&self) -> Option<SeriesStats> {
        let snapshot = self.snapshot_statistics().ok()?;
        let first_seen = self.samples.iter().map(|s| s.observed_at()).min()?;
        let last_seen = self.samples.iter().map(|s| s.observed_at()).max()?;
        Some(SeriesStats {
            route_key: self.key.clone(),
            count: self.samples.len(),
            min_price: snapshot.min,
            max_price: snapshot.max,
            avg_price: snapshot.mean,
            price_range: snapshot.max - snapshot.min,
            volatility: MarketIndicators::sample_std_dev(&self.prices()),
            first_seen,
            last_seen,
        })
    }
}

/// Session-scoped table of price series keyed by route+date.
#[derive(Debug, Default)]
pub struct SeriesRepository {
    series: HashMap<RouteDateKey, PriceSeries>,
}

impl SeriesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the key's series, creating it on first observation.
    pub fn append(&mut self, key: &RouteDateKey, sample: PriceSample) {
        self.series
            .entry(key.clone())
            .or_insert_with(|| PriceSeries::new(key.clone()))
            .append(sample);
    }

    pub fn get(&self, key: &RouteDateKey) -> Option<&PriceSeries> {
        self.series.get(key)
    }

    pub fn contains(&self, key: &RouteDateKey) -> bool {
        self.series.contains_key(key)
    }

    /// Installs a series loaded from storage. An existing series is left untouched.
    pub fn insert_if_absent(&mut self, series: PriceSeries) {
        self.series.entry(series.key().clone()).or_insert(series);
    }

    pub fn statistics_for(&self, key: &RouteDateKey) -> Option<SeriesStats> {
        self.series.get(key).and_then(PriceSeries::stats)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
