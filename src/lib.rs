pub mod advisor;
pub mod analyzer;
pub mod config;
pub mod model;
pub mod storage;
pub mod tracker;
pub mod utils;

pub use advisor::RecommendationEngine;
pub use tracker::PriceTracker;
