use crate::advisor::RecommendationEngine;
use crate::analyzer::{PriceSeries, SeriesRepository};
use crate::model::{validate_price, Observation, OptimizationResult, RouteDateKey, SeriesStats, TrackerError, TrainRoute};
use crate::storage::HistoryStore;
use crate::utils::days_until;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

/// Session facade: in-memory series backed by a durable history store.
///
/// A key's persisted history is loaded the first time the key is touched, so the
/// in-memory series always holds the full history followed by this session's samples.
pub struct PriceTracker<S: HistoryStore> {
    store: S,
    series: SeriesRepository,
    engine: RecommendationEngine,
}

impl<S: HistoryStore> PriceTracker<S> {
    pub fn new(store: S, engine: RecommendationEngine) -> Self {
        Self {
            store,
            series: SeriesRepository::new(),
            engine,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    pub fn series(&self) -> &SeriesRepository {
        &self.series
    }

    /// Records a sample. Persistence failures are returned and the sample is not kept.
    pub fn ingest(&mut self, observation: Observation) -> Result<i64, TrackerError> {
        let key = observation.key();
        self.hydrate(&key)?;
        let id = self.store.append(&key, &observation.sample)?;
        self.series.append(&key, observation.sample);
        info!("Stored sample #{} for {} ({} total)", id, key, self.series_len(&key));
        Ok(id)
    }

    /// Recommendation for `current_price` on `route`, counting days from today (UTC).
    /// Only an invalid candidate fare is an error; storage trouble falls back to memory.
    pub fn recommend(
        &mut self,
        route: &TrainRoute,
        current_price: f64,
        travel_date: Option<NaiveDate>,
    ) -> Result<OptimizationResult, TrackerError> {
        self.recommend_on(route, current_price, travel_date, Utc::now().date_naive())
    }

    /// Same as [`recommend`](Self::recommend) with an explicit "today".
    pub fn recommend_on(
        &mut self,
        route: &TrainRoute,
        current_price: f64,
        travel_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<OptimizationResult, TrackerError> {
        let current_price = validate_price(current_price)?;
        let travel_date = travel_date.unwrap_or_else(|| route.travel_date());
        let key = RouteDateKey::for_route(route, travel_date);
        self.hydrate_or_warn(&key);
        let days = days_until(travel_date, today);
        Ok(self.engine.recommend(&key, self.series.get(&key), current_price, days)?)
    }

    /// Statistics for a key, `None` when nothing has been observed for it.
    pub fn statistics(&mut self, key: &RouteDateKey) -> Option<SeriesStats> {
        self.hydrate_or_warn(key);
        self.series.statistics_for(key)
    }

    fn series_len(&self, key: &RouteDateKey) -> usize {
        self.series.get(key).map_or(0, PriceSeries::len)
    }

    fn hydrate(&mut self, key: &RouteDateKey) -> Result<(), TrackerError> {
        if self.series.contains(key) {
            return Ok(());
        }
        let samples = self.store.query(key)?;
        if !samples.is_empty() {
            debug!("Loaded {} stored samples for {}", samples.len(), key);
            self.series.insert_if_absent(PriceSeries::from_samples(key.clone(), samples));
        }
        Ok(())
    }

    /// Read paths keep going on whatever is already in memory.
    fn hydrate_or_warn(&mut self, key: &RouteDateKey) {
        if let Err(e) = self.hydrate(key) {
            warn!("History store unavailable for {}, using in-memory data: {}", key, e);
        }
    }
}
