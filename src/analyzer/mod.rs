// Analyzer module: price series aggregation and the statistics computed over them.

pub mod market_indicators;
pub mod price_analysis;
pub mod series;

pub use price_analysis::{Analyzer, TrendAnalysis, TrendAnalyzer};
pub use series::{PriceSeries, SeriesRepository, Snapshot};
