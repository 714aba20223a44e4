//! Append-only prediction history plus the deduplicated customer registry.
//!
//! Failure semantics:
//!   - writes (`append`, `upsert_customer`) surface `StorageWrite`
//!   - reads degrade to zero / empty / `None` and log a warning,
//!     because history and analytics are best-effort telemetry.

use crate::{
    clock::{Clock, SystemClock},
    error::{ChurnError, ChurnResult},
    features::FeatureRecord,
    model::ModelMetrics,
    scorer::ScoreResult,
    store::{PredictionFilter, RecordStore},
    types::{CustomerId, PredictionId},
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: PredictionId,
    pub customer_id:   Option<CustomerId>,
    pub customer_name: Option<String>,
    pub created_at:    DateTime<Local>,
    #[serde(flatten)]
    pub score:         ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub record_id:   String,
    pub customer_id: Option<CustomerId>,
    pub name:        Option<String>,
    pub profile:     FeatureRecord,
    pub created_at:  DateTime<Local>,
    pub updated_at:  DateTime<Local>,
}

impl CustomerRecord {
    pub fn from_features(features: &FeatureRecord, now: DateTime<Local>) -> Self {
        Self {
            record_id:   uuid::Uuid::new_v4().to_string(),
            customer_id: features.customer_id.clone(),
            name:        features.customer_name.clone(),
            profile:     features.clone(),
            created_at:  now,
            updated_at:  now,
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

pub struct PredictionStore<S: RecordStore> {
    backend: S,
    clock:   Arc<dyn Clock>,
}

impl<S: RecordStore> PredictionStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: S, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    // ── Writes ────────────────────────────────────────────────────

    /// Stamp `created_at` from the store clock and persist. Never overwrites.
    pub fn append(
        &self,
        features: &FeatureRecord,
        score: ScoreResult,
    ) -> ChurnResult<PredictionRecord> {
        let record = PredictionRecord {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            customer_id:   features.customer_id.clone(),
            customer_name: features.customer_name.clone(),
            created_at:    self.clock.now(),
            score,
        };
        self.backend
            .insert_prediction(&record)
            .map_err(|e| write_failed("append", e))?;
        Ok(record)
    }

    /// Merge-overwrite by `customer_id` when present, insert otherwise.
    pub fn upsert_customer(&self, features: &FeatureRecord) -> ChurnResult<String> {
        let record = CustomerRecord::from_features(features, self.clock.now());
        self.backend
            .upsert_customer(&record)
            .map_err(|e| write_failed("upsert_customer", e))
    }

    /// Telemetry write: failures are logged, not surfaced.
    pub fn record_model_metrics(&self, metrics: &ModelMetrics) {
        if let Err(e) = self.backend.save_model_metrics(metrics, self.clock.now()) {
            log::warn!("store: could not save model metrics for v{}: {e}", metrics.model_version);
        }
    }

    // ── Reads (best effort) ───────────────────────────────────────

    pub fn count_where(&self, filter: &PredictionFilter) -> i64 {
        self.backend.count_predictions(filter).unwrap_or_else(|e| {
            log::warn!("store: count {filter:?} failed, reporting 0: {e}");
            0
        })
    }

    pub fn filter_where(
        &self,
        filter: &PredictionFilter,
        skip: usize,
        limit: usize,
    ) -> Vec<PredictionRecord> {
        self.backend
            .find_predictions(filter, skip, limit)
            .unwrap_or_else(|e| {
                log::warn!("store: find {filter:?} failed, reporting empty: {e}");
                Vec::new()
            })
    }

    pub fn mean_confidence(&self, filter: &PredictionFilter) -> Option<f64> {
        self.backend.mean_confidence(filter).unwrap_or_else(|e| {
            log::warn!("store: mean confidence failed: {e}");
            None
        })
    }

    /// Newest-first slice of the whole history plus its total size.
    pub fn page(&self, limit: usize, offset: usize) -> (Vec<PredictionRecord>, i64) {
        let total = self.count_where(&PredictionFilter::All);
        if limit == 0 || offset as i64 >= total {
            return (Vec::new(), total);
        }
        (self.filter_where(&PredictionFilter::All, offset, limit), total)
    }

    pub fn customers(&self, limit: usize) -> Vec<CustomerRecord> {
        self.backend.list_customers(limit).unwrap_or_else(|e| {
            log::warn!("store: list customers failed: {e}");
            Vec::new()
        })
    }

    pub fn customer_count(&self) -> i64 {
        self.backend.count_customers().unwrap_or_else(|e| {
            log::warn!("store: count customers failed: {e}");
            0
        })
    }

    pub fn latest_model_metrics(&self) -> Option<ModelMetrics> {
        self.backend.latest_model_metrics().unwrap_or_else(|e| {
            log::warn!("store: read model metrics failed: {e}");
            None
        })
    }

    pub fn is_reachable(&self) -> bool {
        self.backend.ping().is_ok()
    }
}

fn write_failed(operation: &'static str, err: ChurnError) -> ChurnError {
    log::error!("store: {operation} failed: {err}");
    match err {
        ChurnError::StorageWrite { .. } => err,
        other => ChurnError::StorageWrite {
            operation,
            reason: other.to_string(),
        },
    }
}
