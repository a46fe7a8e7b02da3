// Utility functions
use crate::model::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};

/// Parses a travel date in `YYYY-MM-DD` form.
pub fn parse_travel_date(date_str: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date_str.to_string()))
}

/// Converts a string to `DateTime<Utc>` if it is valid RFC 3339.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole calendar days from `today` to `travel_date`; negative once the date has passed.
pub fn days_until(travel_date: NaiveDate, today: NaiveDate) -> i64 {
    (travel_date - today).num_days()
}
