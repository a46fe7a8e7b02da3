use crate::advisor::policy::AdvisorPolicy;
use crate::analyzer::market_indicators::MarketIndicators;
use crate::analyzer::series::PriceSeries;
use crate::model::{SeriesError, Trend};

/// Statistical picture of a series relative to a candidate price.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAnalysis {
    pub historical_low: f64,
    pub historical_high: f64,
    pub historical_average: f64,
    pub recent_average: f64,
    pub volatility: f64,
    pub ratio_to_low: f64,
    pub ratio_to_average: f64,
    pub trend: Trend,
    pub is_outlier: bool,
}

impl TrendAnalysis {
    /// Volatility above the configured share of the historical average.
    pub fn is_volatile(&self, volatility_ratio: f64) -> bool {
        self.volatility > self.historical_average * volatility_ratio
    }
}

/// Trait defining the interface for a series analyzer.
pub trait Analyzer {
    fn analyze(&self, series: &PriceSeries, candidate_price: f64) -> Result<TrendAnalysis, SeriesError>;
}

pub struct TrendAnalyzer {
    min_history: usize,
    window: usize,
    trend_threshold: f64,
    outlier_sigmas: f64,
}

impl TrendAnalyzer {
    pub fn new(policy: &AdvisorPolicy) -> Self {
        Self {
            min_history: policy.min_history,
            window: policy.trailing_window,
            trend_threshold: policy.trend_threshold,
            outlier_sigmas: policy.outlier_sigmas,
        }
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(&AdvisorPolicy::default())
    }
}

impl Analyzer for TrendAnalyzer {
    /// Requires at least `min_history` samples; shorter series belong to the no-data path.
    fn analyze(&self, series: &PriceSeries, candidate_price: f64) -> Result<TrendAnalysis, SeriesError> {
        if series.len() < self.min_history {
            return Err(SeriesError::InsufficientHistory {
                have: series.len(),
                needed: self.min_history,
            });
        }
        let snapshot = series.snapshot_statistics()?;
        let prices = series.prices();
        let recent = MarketIndicators::trailing_window(&prices, self.window);
        let volatility = MarketIndicators::sample_std_dev(&prices);

        Ok(TrendAnalysis {
            historical_low: snapshot.min,
            historical_high: snapshot.max,
            historical_average: snapshot.mean,
            recent_average: MarketIndicators::mean(recent),
            volatility,
            ratio_to_low: candidate_price / snapshot.min,
            ratio_to_average: candidate_price / snapshot.mean,
            trend: MarketIndicators::classify_trend(recent, self.trend_threshold),
            is_outlier: MarketIndicators::is_outlier(candidate_price, snapshot.mean, volatility, self.outlier_sigmas),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PriceSample, RouteDateKey};
    use chrono::{Duration, TimeZone, Utc};

    fn series_of(prices: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 11, 1, 8, 0, 0).unwrap();
        PriceSeries::from_samples(
            RouteDateKey::from_raw("MADRI_SEVIL_2024-12-20_AVLO"),
            prices.iter().enumerate().map(|(i, &p)| {
                PriceSample::new(p, "EUR", "Turista", 10, start + Duration::days(i as i64)).unwrap()
            }),
        )
    }

    #[test]
    fn rejects_short_series() {
        let err = TrendAnalyzer::default().analyze(&series_of(&[40.0, 41.0]), 40.0);
        assert_eq!(err, Err(SeriesError::InsufficientHistory { have: 2, needed: 3 }));
    }

    #[test]
    fn trend_uses_only_trailing_window() {
        // A big early drop falls outside the last seven samples.
        let prices = [200.0, 100.0, 100.0, 101.0, 100.0, 102.0, 100.0, 103.0];
        let analysis = TrendAnalyzer::default().analyze(&series_of(&prices), 100.0).unwrap();
        assert_eq!(analysis.trend, Trend::Stable);
        assert!((analysis.recent_average - 706.0 / 7.0).abs() < 1e-9);
        assert_eq!(analysis.historical_high, 200.0);
    }

    #[test]
    fn falling_window_and_ratios() {
        let prices = [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 70.0];
        let analysis = TrendAnalyzer::default().analyze(&series_of(&prices), 72.0).unwrap();
        assert_eq!(analysis.trend, Trend::Falling);
        assert_eq!(analysis.historical_low, 70.0);
        assert!((analysis.historical_average - 670.0 / 7.0).abs() < 1e-9);
        assert!((analysis.ratio_to_average - 72.0 / (670.0 / 7.0)).abs() < 1e-9);
        assert!((analysis.ratio_to_low - 72.0 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn flags_two_sigma_outlier() {
        let prices = [100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 60.0];
        let analysis = TrendAnalyzer::default().analyze(&series_of(&prices), 62.0).unwrap();
        assert!(analysis.is_outlier);
        let analysis = TrendAnalyzer::default().analyze(&series_of(&prices), 95.0).unwrap();
        assert!(!analysis.is_outlier);
    }

    #[test]
    fn historical_average_never_leaves_the_range() {
        for prices in [[0.1; 3], [0.7; 3], [19.99; 3]] {
            let analysis = TrendAnalyzer::default().analyze(&series_of(&prices), prices[0]).unwrap();
            assert!(analysis.historical_low <= analysis.historical_average);
            assert!(analysis.historical_average <= analysis.historical_high);
            assert_eq!(analysis.ratio_to_average, 1.0);
        }
    }
}
