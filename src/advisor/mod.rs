// Advisor module: turns a price series and a candidate fare into a recommendation.

pub mod policy;
pub mod rules;

use crate::analyzer::{Analyzer, PriceSeries, TrendAnalysis, TrendAnalyzer};
use crate::model::{validate_price, OptimizationResult, Recommendation, RouteDateKey, ValidationError};
use policy::AdvisorPolicy;
use rules::{RuleContext, RuleSet};
use tracing::debug;

pub struct RecommendationEngine {
    policy: AdvisorPolicy,
    analyzer: TrendAnalyzer,
    rules: RuleSet,
}

impl RecommendationEngine {
    pub fn new(policy: AdvisorPolicy) -> Self {
        let analyzer = TrendAnalyzer::new(&policy);
        Self {
            policy,
            analyzer,
            rules: RuleSet::default(),
        }
    }

    pub fn with_rules(policy: AdvisorPolicy, rules: RuleSet) -> Self {
        debug!("Rule order: {}", rules.names().join(" > "));
        let analyzer = TrendAnalyzer::new(&policy);
        Self { policy, analyzer, rules }
    }

    pub fn policy(&self) -> &AdvisorPolicy {
        &self.policy
    }

    /// Recommends from the series when it is long enough, otherwise from urgency alone.
    /// A candidate fare that is not a finite positive number is rejected.
    pub fn recommend(
        &self,
        key: &RouteDateKey,
        series: Option<&PriceSeries>,
        current_price: f64,
        days_until_departure: i64,
    ) -> Result<OptimizationResult, ValidationError> {
        let current_price = validate_price(current_price)?;
        let analysis = series.and_then(|s| self.analyzer.analyze(s, current_price).ok());
        Ok(match analysis {
            Some(analysis) => self.from_analysis(key, &analysis, current_price, days_until_departure),
            None => {
                debug!(
                    "Not enough history for {} ({} samples), using urgency only",
                    key,
                    series.map_or(0, PriceSeries::len)
                );
                self.no_data(key, current_price, days_until_departure)
            }
        })
    }

    /// Urgency-only heuristic for series shorter than the minimum history.
    fn no_data(&self, key: &RouteDateKey, current_price: f64, days_until_departure: i64) -> OptimizationResult {
        let p = &self.policy;
        let (recommendation, confidence, reasoning) = if days_until_departure <= p.no_data_urgent_days {
            (
                Recommendation::BuyNow,
                p.no_data_urgent_confidence,
                "Limited time until departure. Book now to secure your seat.",
            )
        } else if days_until_departure <= p.no_data_monitor_days {
            (
                Recommendation::Wait,
                p.no_data_monitor_confidence,
                "Monitor prices for a few more days before booking.",
            )
        } else {
            (
                Recommendation::Wait,
                p.no_data_early_confidence,
                "Too early to book. Wait for better price data.",
            )
        };

        OptimizationResult {
            route_key: key.clone(),
            current_price,
            recommendation,
            confidence,
            reasoning: reasoning.to_string(),
            suggested_action: recommendation.suggested_action().to_string(),
            price_trend: None,
            optimal_purchase_window: None,
            days_until_departure,
            historical_low: None,
            historical_high: None,
            price_volatility: None,
        }
    }

    fn from_analysis(
        &self,
        key: &RouteDateKey,
        analysis: &TrendAnalysis,
        current_price: f64,
        days_until_departure: i64,
    ) -> OptimizationResult {
        let ctx = RuleContext {
            analysis,
            days_until_departure,
            policy: &self.policy,
        };
        let decision = self.rules.apply(&ctx);

        let recommendation = if rules::price_alert_applies(&ctx) {
            Recommendation::PriceAlert
        } else {
            decision.recommendation
        };
        debug!(
            "{}: {} at {:.2} (trend {}, ratio to low {:.3}, outlier {})",
            key, recommendation, current_price, analysis.trend, analysis.ratio_to_low, analysis.is_outlier
        );

        OptimizationResult {
            route_key: key.clone(),
            current_price,
            recommendation,
            confidence: decision.confidence(),
            reasoning: decision.reasoning(),
            suggested_action: recommendation.suggested_action().to_string(),
            price_trend: Some(analysis.trend),
            optimal_purchase_window: Some(rules::optimal_window(&ctx).to_string()),
            days_until_departure,
            historical_low: Some(analysis.historical_low),
            historical_high: Some(analysis.historical_high),
            price_volatility: Some(analysis.volatility),
        }
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(AdvisorPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PriceSample, Trend};
    use chrono::{Duration, TimeZone, Utc};

    fn key() -> RouteDateKey {
        RouteDateKey::from_raw("MADRI_BCNSA_2024-12-25_AVE")
    }

    fn series_of(prices: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 11, 1, 8, 0, 0).unwrap();
        PriceSeries::from_samples(
            key(),
            prices.iter().enumerate().map(|(i, &p)| {
                PriceSample::new(p, "EUR", "Turista", 10, start + Duration::hours(i as i64)).unwrap()
            }),
        )
    }

    #[test]
    fn short_series_uses_fixed_no_data_policy() {
        let engine = RecommendationEngine::default();
        let series = series_of(&[40.0, 45.0]);
        let cases = [
            (-3, Recommendation::BuyNow, 0.5),
            (7, Recommendation::BuyNow, 0.5),
            (8, Recommendation::Wait, 0.3),
            (30, Recommendation::Wait, 0.3),
            (31, Recommendation::Wait, 0.4),
        ];
        for (days, expected, confidence) in cases {
            let result = engine.recommend(&key(), Some(&series), 42.0, days).unwrap();
            assert_eq!(result.recommendation, expected, "days = {days}");
            assert_eq!(result.confidence, confidence, "days = {days}");
            assert!(result.price_trend.is_none());
            assert!(result.historical_low.is_none());
        }
        let missing = engine.recommend(&key(), None, 42.0, 12).unwrap();
        assert_eq!(missing.recommendation, Recommendation::Wait);
        assert_eq!(missing.reasoning, "Monitor prices for a few more days before booking.");
    }

    #[test]
    fn near_departure_forces_buy() {
        let engine = RecommendationEngine::default();
        let result = engine.recommend(&key(), Some(&series_of(&[50.0, 52.0, 48.0, 55.0, 90.0])), 50.0, 2).unwrap();
        assert_eq!(result.recommendation, Recommendation::BuyNow);
        // urgent, excellent_price, rising_trend, volatile
        assert!((result.confidence - (0.8 + 0.9 + 0.7 + 0.3) / 4.0).abs() < 1e-9);
        assert_eq!(
            result.reasoning,
            "Very close to departure. Excellent price. Prices are rising. Volatile pricing."
        );
        assert_eq!(result.optimal_purchase_window.as_deref(), Some("Now - very close to departure"));
        assert_eq!(result.historical_low, Some(48.0));
        assert_eq!(result.historical_high, Some(90.0));
    }

    #[test]
    fn falling_window_with_good_price_waits() {
        let engine = RecommendationEngine::default();
        let series = series_of(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 70.0]);
        let result = engine.recommend(&key(), Some(&series), 80.0, 20).unwrap();
        assert_eq!(result.price_trend, Some(Trend::Falling));
        assert_eq!(result.recommendation, Recommendation::Wait);
        assert_eq!(result.reasoning, "Plenty of time. Good price. Prices are falling. Volatile pricing.");
        assert!((result.confidence - 0.45).abs() < 1e-9);
        assert_eq!(result.optimal_purchase_window.as_deref(), Some("2-4 days before departure"));
    }

    #[test]
    fn candidate_near_low_in_falling_window_becomes_alert() {
        // 72 sits within 10% of the low of 70, so the excellent-price rule fires and
        // the two-sigma outlier check then promotes the result to a price alert.
        let engine = RecommendationEngine::default();
        let series = series_of(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 70.0]);
        let result = engine.recommend(&key(), Some(&series), 72.0, 20).unwrap();
        assert_eq!(result.price_trend, Some(Trend::Falling));
        assert_eq!(result.recommendation, Recommendation::PriceAlert);
        assert!(result.reasoning.contains("Excellent price"));
    }

    #[test]
    fn outlier_near_low_overrides_to_price_alert() {
        let engine = RecommendationEngine::default();
        let series = series_of(&[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 60.0]);
        let result = engine.recommend(&key(), Some(&series), 62.0, 5).unwrap();
        assert_eq!(result.recommendation, Recommendation::PriceAlert);
        assert_eq!(result.suggested_action, Recommendation::PriceAlert.suggested_action());

        // One day out the override does not apply.
        let result = engine.recommend(&key(), Some(&series), 62.0, 1).unwrap();
        assert_eq!(result.recommendation, Recommendation::BuyNow);
    }

    #[test]
    fn custom_rule_set_drops_trend_override() {
        use crate::advisor::rules::{PricePositionRule, UrgencyRule, VolatilityRule};

        let series = series_of(&[50.0, 52.0, 48.0, 55.0, 90.0]);
        let full = RecommendationEngine::default().recommend(&key(), Some(&series), 70.0, 20).unwrap();
        assert_eq!(full.recommendation, Recommendation::BuyNow);

        let no_trend = RecommendationEngine::with_rules(
            AdvisorPolicy::default(),
            RuleSet::new(vec![Box::new(UrgencyRule), Box::new(PricePositionRule), Box::new(VolatilityRule)]),
        );
        let result = no_trend.recommend(&key(), Some(&series), 70.0, 20).unwrap();
        assert_eq!(result.recommendation, Recommendation::Wait);
        assert_eq!(result.reasoning, "Plenty of time. Volatile pricing.");
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let engine = RecommendationEngine::default();
        let series = series_of(&[30.0, 80.0, 45.0, 120.0, 60.0, 33.0]);
        for days in [-1, 0, 3, 6, 10, 15, 60] {
            for price in [20.0, 31.0, 50.0, 90.0, 200.0] {
                let r = engine.recommend(&key(), Some(&series), price, days).unwrap();
                assert!((0.0..=1.0).contains(&r.confidence));
            }
        }
    }

    #[test]
    fn rejects_candidates_that_are_not_positive_fares() {
        let engine = RecommendationEngine::default();
        let series = series_of(&[50.0, 60.0, 70.0]);
        for price in [-20.0, 0.0, -0.0, f64::NAN, f64::INFINITY] {
            for series in [Some(&series), None] {
                let err = engine.recommend(&key(), series, price, 10).unwrap_err();
                assert!(matches!(err, ValidationError::NonPositivePrice(_)), "price = {price}");
            }
        }
    }
}
