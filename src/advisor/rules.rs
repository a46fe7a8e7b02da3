use crate::advisor::policy::AdvisorPolicy;
use crate::analyzer::TrendAnalysis;
use crate::model::{Recommendation, Trend};

/// A weighted reason that contributed to a recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub label: &'static str,
    pub weight: f64,
    pub rationale: &'static str,
}

/// What a rule contributes: a factor and optionally a new recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub factor: Factor,
    pub set: Option<Recommendation>,
}

impl RuleOutcome {
    fn factor(label: &'static str, weight: f64, rationale: &'static str) -> Self {
        Self {
            factor: Factor { label, weight, rationale },
            set: None,
        }
    }

    fn setting(mut self, recommendation: Recommendation) -> Self {
        self.set = Some(recommendation);
        self
    }
}

pub struct RuleContext<'a> {
    pub analysis: &'a TrendAnalysis,
    pub days_until_departure: i64,
    pub policy: &'a AdvisorPolicy,
}

/// One step of the ordered decision pass. `current` is the recommendation so far.
pub trait Rule {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ctx: &RuleContext<'_>, current: Recommendation) -> Option<RuleOutcome>;
}

pub struct UrgencyRule;

impl Rule for UrgencyRule {
    fn name(&self) -> &'static str {
        "urgency"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _current: Recommendation) -> Option<RuleOutcome> {
        let p = ctx.policy;
        let days = ctx.days_until_departure;
        let outcome = if days <= p.urgent_days {
            RuleOutcome::factor("urgent", p.urgent_weight, "Very close to departure").setting(Recommendation::BuyNow)
        } else if days <= p.soon_days {
            RuleOutcome::factor("soon", p.soon_weight, "Close to departure")
        } else if days <= p.moderate_days {
            RuleOutcome::factor("moderate", p.moderate_weight, "Moderate time remaining")
        } else {
            RuleOutcome::factor("early", p.early_weight, "Plenty of time")
        };
        Some(outcome)
    }
}

pub struct PricePositionRule;

impl Rule for PricePositionRule {
    fn name(&self) -> &'static str {
        "price_position"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _current: Recommendation) -> Option<RuleOutcome> {
        let p = ctx.policy;
        let a = ctx.analysis;
        if a.ratio_to_low <= p.excellent_ratio_to_low {
            Some(RuleOutcome::factor("excellent_price", p.excellent_weight, "Excellent price").setting(Recommendation::BuyNow))
        } else if a.ratio_to_average <= p.good_ratio_to_average {
            Some(RuleOutcome::factor("good_price", p.good_weight, "Good price"))
        } else if a.ratio_to_average >= p.high_ratio_to_average {
            let outcome = RuleOutcome::factor("high_price", p.high_weight, "High price");
            if ctx.days_until_departure > p.high_price_wait_after_days {
                Some(outcome.setting(Recommendation::Wait))
            } else {
                Some(outcome)
            }
        } else {
            None
        }
    }
}

pub struct TrendRule;

impl Rule for TrendRule {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, current: Recommendation) -> Option<RuleOutcome> {
        let p = ctx.policy;
        match ctx.analysis.trend {
            Trend::Falling => {
                let outcome = RuleOutcome::factor("falling_trend", p.falling_weight, "Prices are falling");
                if current == Recommendation::BuyNow {
                    Some(outcome)
                } else {
                    Some(outcome.setting(Recommendation::Wait))
                }
            }
            Trend::Rising => Some(
                RuleOutcome::factor("rising_trend", p.rising_weight, "Prices are rising").setting(Recommendation::BuyNow),
            ),
            Trend::Stable => None,
        }
    }
}

/// Informational only; never changes the recommendation.
pub struct VolatilityRule;

impl Rule for VolatilityRule {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _current: Recommendation) -> Option<RuleOutcome> {
        let p = ctx.policy;
        ctx.analysis
            .is_volatile(p.volatility_ratio)
            .then(|| RuleOutcome::factor("volatile", p.volatile_weight, "Volatile pricing"))
    }
}

/// Result of one pass over the rule list.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub factors: Vec<Factor>,
}

impl Decision {
    /// Mean of the triggered weights, capped at 1.0.
    pub fn confidence(&self) -> f64 {
        if self.factors.is_empty() {
            return 0.0;
        }
        let total: f64 = self.factors.iter().map(|f| f.weight).sum();
        (total / self.factors.len() as f64).min(1.0)
    }

    pub fn reasoning(&self) -> String {
        let parts: Vec<&str> = self.factors.iter().map(|f| f.rationale).collect();
        format!("{}.", parts.join(". "))
    }
}

/// Ordered rules; a later rule's recommendation replaces an earlier one.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn apply(&self, ctx: &RuleContext<'_>) -> Decision {
        let mut decision = Decision {
            recommendation: Recommendation::Wait,
            factors: Vec::new(),
        };
        for rule in &self.rules {
            if let Some(outcome) = rule.evaluate(ctx, decision.recommendation) {
                if let Some(recommendation) = outcome.set {
                    decision.recommendation = recommendation;
                }
                decision.factors.push(outcome.factor);
            }
        }
        decision
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(vec![
            Box::new(UrgencyRule),
            Box::new(PricePositionRule),
            Box::new(TrendRule),
            Box::new(VolatilityRule),
        ])
    }
}

/// Final override: an outlier close to the historical low is surfaced as a price alert.
pub fn price_alert_applies(ctx: &RuleContext<'_>) -> bool {
    let a = ctx.analysis;
    a.is_outlier
        && a.ratio_to_low <= ctx.policy.alert_ratio_to_low
        && ctx.days_until_departure > ctx.policy.alert_after_days
}

/// Suggested purchase window. The volatile and default branches share their text.
pub fn optimal_window(ctx: &RuleContext<'_>) -> &'static str {
    let p = ctx.policy;
    if ctx.days_until_departure <= p.urgent_days {
        "Now - very close to departure"
    } else if ctx.analysis.trend == Trend::Falling {
        "2-4 days before departure"
    } else if ctx.analysis.is_volatile(p.volatility_ratio) {
        "1-2 weeks before departure"
    } else {
        "1-2 weeks before departure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(ratio_to_low: f64, ratio_to_average: f64, trend: Trend) -> TrendAnalysis {
        TrendAnalysis {
            historical_low: 50.0,
            historical_high: 120.0,
            historical_average: 80.0,
            recent_average: 80.0,
            volatility: 2.0,
            ratio_to_low,
            ratio_to_average,
            trend,
            is_outlier: false,
        }
    }

    fn decide(a: &TrendAnalysis, days: i64) -> Decision {
        let policy = AdvisorPolicy::default();
        let ctx = RuleContext { analysis: a, days_until_departure: days, policy: &policy };
        RuleSet::default().apply(&ctx)
    }

    #[test]
    fn rules_run_in_declared_order() {
        assert_eq!(RuleSet::default().names(), vec!["urgency", "price_position", "trend", "volatility"]);
    }

    #[test]
    fn rising_trend_overrides_falling_urgency_and_high_price() {
        let d = decide(&analysis(2.0, 1.3, Trend::Rising), 30);
        assert_eq!(d.recommendation, Recommendation::BuyNow);
        let labels: Vec<_> = d.factors.iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["early", "high_price", "rising_trend"]);
    }

    #[test]
    fn falling_trend_keeps_forced_buy() {
        let d = decide(&analysis(1.05, 0.7, Trend::Falling), 20);
        assert_eq!(d.recommendation, Recommendation::BuyNow);
        let d = decide(&analysis(1.5, 0.85, Trend::Falling), 20);
        assert_eq!(d.recommendation, Recommendation::Wait);
    }

    #[test]
    fn high_price_waits_only_far_from_departure() {
        // Within a week the high price does not force WAIT; the initial WAIT stands.
        let d = decide(&analysis(2.0, 1.25, Trend::Stable), 5);
        assert_eq!(d.recommendation, Recommendation::Wait);
        assert_eq!(d.factors[1].label, "high_price");
        let d = decide(&analysis(2.0, 1.25, Trend::Stable), 2);
        assert_eq!(d.recommendation, Recommendation::BuyNow);
    }

    #[test]
    fn confidence_is_mean_of_weights_and_reasoning_joins_phrases() {
        let d = decide(&analysis(1.5, 0.85, Trend::Falling), 10);
        assert!((d.confidence() - (0.4 + 0.7 + 0.6) / 3.0).abs() < 1e-9);
        assert_eq!(d.reasoning(), "Moderate time remaining. Good price. Prices are falling.");
    }

    #[test]
    fn volatile_and_default_windows_share_text() {
        let policy = AdvisorPolicy::default();
        let calm = analysis(1.5, 1.0, Trend::Stable);
        let mut wild = calm.clone();
        wild.volatility = 30.0;
        let calm_ctx = RuleContext { analysis: &calm, days_until_departure: 20, policy: &policy };
        let wild_ctx = RuleContext { analysis: &wild, days_until_departure: 20, policy: &policy };
        assert_eq!(optimal_window(&calm_ctx), optimal_window(&wild_ctx));
        assert_eq!(optimal_window(&calm_ctx), "1-2 weeks before departure");
    }

    #[test]
    fn price_alert_needs_outlier_near_low_and_time() {
        let policy = AdvisorPolicy::default();
        let mut a = analysis(1.03, 0.7, Trend::Stable);
        a.is_outlier = true;
        let ctx = |days| RuleContext { analysis: &a, days_until_departure: days, policy: &policy };
        assert!(price_alert_applies(&ctx(5)));
        assert!(!price_alert_applies(&ctx(1)));
    }
}
