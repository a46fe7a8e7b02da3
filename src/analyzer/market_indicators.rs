use crate::model::Trend;

pub struct MarketIndicators;

impl MarketIndicators {
    /// Arithmetic mean. Callers guarantee a non-empty slice.
    pub fn mean(prices: &[f64]) -> f64 {
        prices.iter().sum::<f64>() / prices.len() as f64
    }

    /// Unbiased sample standard deviation (n - 1). Zero for fewer than two points.
    pub fn sample_std_dev(prices: &[f64]) -> f64 {
        if prices.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(prices);
        let variance = prices
            .iter()
            .map(|p| (p - mean).powi(2))
            .sum::<f64>()
            / (prices.len() - 1) as f64;
        variance.sqrt()
    }

    /// Last `size` prices in arrival order, or all of them if there are fewer.
    pub fn trailing_window(prices: &[f64], size: usize) -> &[f64] {
        let start = prices.len().saturating_sub(size);
        &prices[start..]
    }

    /// Relative change from the first to the last price of the window.
    pub fn window_delta(window: &[f64]) -> Option<f64> {
        match (window.first(), window.last()) {
            (Some(&first), Some(&last)) if window.len() >= 2 => Some((last - first) / first),
            _ => None,
        }
    }

    /// Classifies the window delta against a single symmetric threshold.
    pub fn classify_trend(window: &[f64], threshold: f64) -> Trend {
        match Self::window_delta(window) {
            Some(delta) if delta > threshold => Trend::Rising,
            Some(delta) if delta < -threshold => Trend::Falling,
            _ => Trend::Stable,
        }
    }

    /// Two-sigma style check: distance from the mean exceeds `sigmas` deviations.
    pub fn is_outlier(candidate: f64, mean: f64, std_dev: f64, sigmas: f64) -> bool {
        (candidate - mean).abs() > sigmas * std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_uses_n_minus_one() {
        let prices = [50.0, 52.0, 48.0, 55.0, 90.0];
        let expected = (1228.0_f64 / 4.0).sqrt();
        assert!((MarketIndicators::sample_std_dev(&prices) - expected).abs() < 1e-9);
        assert_eq!(MarketIndicators::sample_std_dev(&[42.0]), 0.0);
    }

    #[test]
    fn trailing_window_caps_at_size() {
        let prices: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(MarketIndicators::trailing_window(&prices, 7), &prices[3..]);
        assert_eq!(MarketIndicators::trailing_window(&prices[..4], 7), &prices[..4]);
    }

    #[test]
    fn trend_threshold_is_exclusive() {
        assert_eq!(MarketIndicators::classify_trend(&[100.0, 105.0], 0.05), Trend::Stable);
        assert_eq!(MarketIndicators::classify_trend(&[100.0, 105.5], 0.05), Trend::Rising);
        assert_eq!(MarketIndicators::classify_trend(&[100.0, 94.0], 0.05), Trend::Falling);
        assert_eq!(MarketIndicators::classify_trend(&[100.0], 0.05), Trend::Stable);
    }

    #[test]
    fn outlier_needs_strictly_more_than_two_sigma() {
        assert!(!MarketIndicators::is_outlier(120.0, 100.0, 10.0, 2.0));
        assert!(MarketIndicators::is_outlier(79.0, 100.0, 10.0, 2.0));
    }
}
