//! Aggregate analytics recomputed from the prediction history on demand.
//!
//! No counters are kept between calls: every snapshot reads the store,
//! so it can never drift from the records it summarises.

use crate::{
    clock::start_of_day,
    prediction_store::PredictionStore,
    store::{PredictionFilter, RecordStore},
    types::RiskLevel,
};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reported when there is nothing to average.
pub const DEFAULT_AVG_CONFIDENCE: f64 = 0.85;

pub const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_predictions:   i64,
    pub churn_rate:          f64,
    pub avg_confidence:      f64,
    pub predictions_today:   i64,
    pub high_risk_customers: i64,
    /// Hour of day (local) -> today's count. Always 24 entries.
    pub hourly_distribution: BTreeMap<u32, i64>,
}

impl AnalyticsSnapshot {
    pub fn empty() -> Self {
        Self {
            total_predictions:   0,
            churn_rate:          0.0,
            avg_confidence:      DEFAULT_AVG_CONFIDENCE,
            predictions_today:   0,
            high_risk_customers: 0,
            hourly_distribution: empty_hours(),
        }
    }
}

fn empty_hours() -> BTreeMap<u32, i64> {
    (0..HOURS_PER_DAY).map(|h| (h, 0)).collect()
}

pub struct AnalyticsAggregator<'a, S: RecordStore> {
    store: &'a PredictionStore<S>,
}

impl<'a, S: RecordStore> AnalyticsAggregator<'a, S> {
    pub fn new(store: &'a PredictionStore<S>) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let total = self.store.count_where(&PredictionFilter::All);
        if total == 0 {
            return AnalyticsSnapshot::empty();
        }

        let churned = self.store.count_where(&PredictionFilter::Churned);
        let high_risk = self.store.count_where(&PredictionFilter::RiskLevel(RiskLevel::High));
        let avg_confidence = self
            .store
            .mean_confidence(&PredictionFilter::All)
            .unwrap_or(DEFAULT_AVG_CONFIDENCE);

        let now = self.store.now();
        let today = PredictionFilter::CreatedBetween {
            from: start_of_day(now.date_naive()),
            to:   now,
        };
        let predictions_today = self.store.count_where(&today);

        let mut hourly_distribution = empty_hours();
        let todays = self
            .store
            .filter_where(&today, 0, usize::try_from(predictions_today).unwrap_or(0));
        for record in &todays {
            *hourly_distribution.entry(record.created_at.hour()).or_insert(0) += 1;
        }

        let snapshot = AnalyticsSnapshot {
            total_predictions: total,
            churn_rate: churned as f64 / total as f64,
            avg_confidence,
            predictions_today,
            high_risk_customers: high_risk,
            hourly_distribution,
        };
        log::debug!(
            "analytics: total={} churn_rate={:.3} today={} high_risk={}",
            snapshot.total_predictions,
            snapshot.churn_rate,
            snapshot.predictions_today,
            snapshot.high_risk_customers,
        );
        snapshot
    }
}
