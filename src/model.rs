// Core structs: PriceSample, TrainRoute, RouteDateKey, OptimizationResult
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default currency for fares.
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrainType {
    Ave,
    Avlo,
    Alvia,
    Altaria,
    Talgo,
    Intercity,
    Regional,
    Cercanias,
}

impl TrainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainType::Ave => "AVE",
            TrainType::Avlo => "AVLO",
            TrainType::Alvia => "ALVIA",
            TrainType::Altaria => "ALTARIA",
            TrainType::Talgo => "TALGO",
            TrainType::Intercity => "INTERCITY",
            TrainType::Regional => "REGIONAL",
            TrainType::Cercanias => "CERCANIAS",
        }
    }
}

impl fmt::Display for TrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AVE" => Ok(TrainType::Ave),
            "AVLO" => Ok(TrainType::Avlo),
            "ALVIA" => Ok(TrainType::Alvia),
            "ALTARIA" => Ok(TrainType::Altaria),
            "TALGO" => Ok(TrainType::Talgo),
            "INTERCITY" => Ok(TrainType::Intercity),
            "REGIONAL" => Ok(TrainType::Regional),
            "CERCANIAS" => Ok(TrainType::Cercanias),
            other => Err(ValidationError::UnknownTrainType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub code: String,
    pub name: String,
    pub city: String,
}

impl Station {
    pub fn new(code: &str, name: &str, city: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyField("station code"));
        }
        Ok(Self {
            code: code.to_uppercase(),
            name: name.trim().to_string(),
            city: city.trim().to_string(),
        })
    }

    /// Station known only by its code (name and city mirror the code).
    pub fn from_code(code: &str) -> Result<Self, ValidationError> {
        Self::new(code, code, code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRoute {
    pub origin: Station,
    pub destination: Station,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub train_type: TrainType,
    pub train_number: String,
}

impl TrainRoute {
    pub fn travel_date(&self) -> NaiveDate {
        self.departure.date()
    }

    /// Key of this route on its own departure date.
    pub fn key(&self) -> RouteDateKey {
        RouteDateKey::for_route(self, self.travel_date())
    }
}

/// Identity of one origin/destination/date/class combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteDateKey(String);

impl RouteDateKey {
    pub fn new(origin: &str, destination: &str, travel_date: NaiveDate, train_type: TrainType) -> Self {
        Self(format!(
            "{}_{}_{}_{}",
            origin.trim().to_uppercase(),
            destination.trim().to_uppercase(),
            travel_date.format("%Y-%m-%d"),
            train_type
        ))
    }

    pub fn for_route(route: &TrainRoute, travel_date: NaiveDate) -> Self {
        Self::new(&route.origin.code, &route.destination.code, travel_date, route.train_type)
    }

    /// Wraps a key read back from storage or typed by the user.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Travel date segment of the key, if the key is well formed.
    pub fn travel_date(&self) -> Option<NaiveDate> {
        let mut parts = self.0.rsplitn(3, '_');
        let _train_type = parts.next()?;
        NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()
    }
}

impl fmt::Display for RouteDateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed fare. Fields are private so a sample can only exist validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSample {
    price: f64,
    currency: String,
    ticket_class: String,
    seats_available: u32,
    observed_at: DateTime<Utc>,
}

/// Accepts finite, strictly positive fares. Zero is rejected too: ratios divide by
/// historical low and average, and a candidate fare is compared against both.
pub fn validate_price(price: f64) -> Result<f64, ValidationError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::NonPositivePrice(price));
    }
    Ok(price)
}

impl PriceSample {
    pub fn new(
        price: f64,
        currency: &str,
        ticket_class: &str,
        seats_available: u32,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let price = validate_price(price)?;
        let currency = currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(currency.to_string()));
        }
        let ticket_class = ticket_class.trim();
        if ticket_class.is_empty() {
            return Err(ValidationError::EmptyField("ticket class"));
        }
        Ok(Self {
            price,
            currency: currency.to_string(),
            ticket_class: ticket_class.to_string(),
            seats_available,
            observed_at,
        })
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn ticket_class(&self) -> &str {
        &self.ticket_class
    }

    pub fn seats_available(&self) -> u32 {
        self.seats_available
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// A sample together with the route it was observed on.
#[derive(Debug, Clone)]
pub struct Observation {
    pub route: TrainRoute,
    pub sample: PriceSample,
}

impl Observation {
    pub fn key(&self) -> RouteDateKey {
        self.route.key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    BuyNow,
    Wait,
    PriceAlert,
    NoData,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::BuyNow => "BUY_NOW",
            Recommendation::Wait => "WAIT",
            Recommendation::PriceAlert => "PRICE_ALERT",
            Recommendation::NoData => "NO_DATA",
        }
    }

    pub fn suggested_action(&self) -> &'static str {
        match self {
            Recommendation::BuyNow => "Book your ticket immediately",
            Recommendation::Wait => "Wait and monitor prices for a few more days",
            Recommendation::PriceAlert => "Excellent price! Consider booking if your plans are confirmed",
            Recommendation::NoData => "Monitor prices to gather more data",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        })
    }
}

/// Outcome of one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub route_key: RouteDateKey,
    pub current_price: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: String,
    pub suggested_action: String,
    pub price_trend: Option<Trend>,
    pub optimal_purchase_window: Option<String>,
    /// Negative once the departure date has passed.
    pub days_until_departure: i64,
    pub historical_low: Option<f64>,
    pub historical_high: Option<f64>,
    pub price_volatility: Option<f64>,
}

impl OptimizationResult {
    pub fn is_confident(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}

/// Descriptive statistics of one route's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub route_key: RouteDateKey,
    pub count: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub price_range: f64,
    pub volatility: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("price must be a positive amount, got {0}")]
    NonPositivePrice(f64),
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("unknown train type: {0}")]
    UnknownTrainType(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series has no samples")]
    EmptySeries,
    #[error("need at least {needed} samples, have {have}")]
    InsufficientHistory { have: usize, needed: usize },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
