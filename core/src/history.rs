//! Newest-first pagination over stored predictions.

use crate::{
    prediction_store::{PredictionRecord, PredictionStore},
    store::RecordStore,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub predictions: Vec<PredictionRecord>,
    pub total_count: i64,
    pub has_more:    bool,
}

pub struct HistoryPager<'a, S: RecordStore> {
    store: &'a PredictionStore<S>,
}

impl<'a, S: RecordStore> HistoryPager<'a, S> {
    pub fn new(store: &'a PredictionStore<S>) -> Self {
        Self { store }
    }

    /// Up to `limit` records starting `offset` records from the newest.
    /// Negative arguments are clamped to zero.
    pub fn page(&self, limit: i64, offset: i64) -> HistoryPage {
        let limit = limit.max(0);
        let offset = offset.max(0);
        let (predictions, total_count) = self.store.page(limit as usize, offset as usize);
        HistoryPage {
            predictions,
            total_count,
            has_more: offset.saturating_add(limit) < total_count,
        }
    }
}
