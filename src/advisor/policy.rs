use serde::{Deserialize, Serialize};

/// Every threshold, weight and fixed confidence used by the analyzer and the rules.
/// Missing fields in a config file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorPolicy {
    // Analysis
    pub min_history: usize,
    pub trailing_window: usize,
    pub trend_threshold: f64,
    pub outlier_sigmas: f64,

    // No-data path
    pub no_data_urgent_days: i64,
    pub no_data_monitor_days: i64,
    pub no_data_urgent_confidence: f64,
    pub no_data_monitor_confidence: f64,
    pub no_data_early_confidence: f64,

    // Urgency factor
    pub urgent_days: i64,
    pub soon_days: i64,
    pub moderate_days: i64,
    pub urgent_weight: f64,
    pub soon_weight: f64,
    pub moderate_weight: f64,
    pub early_weight: f64,

    // Price position factor
    pub excellent_ratio_to_low: f64,
    pub good_ratio_to_average: f64,
    pub high_ratio_to_average: f64,
    /// High prices only force WAIT when strictly more days than this remain.
    pub high_price_wait_after_days: i64,
    pub excellent_weight: f64,
    pub good_weight: f64,
    pub high_weight: f64,

    // Trend factor
    pub falling_weight: f64,
    pub rising_weight: f64,

    // Volatility factor, as a fraction of the historical average
    pub volatility_ratio: f64,
    pub volatile_weight: f64,

    // Price alert override
    pub alert_ratio_to_low: f64,
    pub alert_after_days: i64,

    pub confidence_threshold: f64,
}

impl Default for AdvisorPolicy {
    fn default() -> Self {
        Self {
            min_history: 3,
            trailing_window: 7,
            trend_threshold: 0.05,
            outlier_sigmas: 2.0,

            no_data_urgent_days: 7,
            no_data_monitor_days: 30,
            no_data_urgent_confidence: 0.5,
            no_data_monitor_confidence: 0.3,
            no_data_early_confidence: 0.4,

            urgent_days: 3,
            soon_days: 7,
            moderate_days: 14,
            urgent_weight: 0.8,
            soon_weight: 0.6,
            moderate_weight: 0.4,
            early_weight: 0.2,

            excellent_ratio_to_low: 1.10,
            good_ratio_to_average: 0.90,
            high_ratio_to_average: 1.20,
            high_price_wait_after_days: 7,
            excellent_weight: 0.9,
            good_weight: 0.7,
            high_weight: 0.8,

            falling_weight: 0.6,
            rising_weight: 0.7,

            volatility_ratio: 0.10,
            volatile_weight: 0.3,

            alert_ratio_to_low: 1.05,
            alert_after_days: 1,

            confidence_threshold: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let policy: AdvisorPolicy = serde_json::from_str(r#"{ "trailing_window": 10 }"#).unwrap();
        assert_eq!(policy.trailing_window, 10);
        assert_eq!(policy.min_history, 3);
        assert_eq!(policy.alert_ratio_to_low, 1.05);
    }
}
