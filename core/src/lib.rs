//! Churn risk inference and analytics aggregation.
//!
//! `RiskScorer` turns a `FeatureRecord` into a `ScoreResult`, using a trained
//! `ModelBundle` when one is loaded and a rule-based fallback otherwise.
//! `PredictionStore` keeps the scored history and the customer registry;
//! `AnalyticsAggregator` and `HistoryPager` read from it.
//! `ChurnService` wires the pieces together.

pub mod analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod model;
pub mod prediction_store;
pub mod rng;
pub mod scorer;
pub mod service;
pub mod store;
pub mod types;
