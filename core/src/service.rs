//! The churn service: scorer handle + prediction store behind one facade.
//!
//! FLOW (per request):
//!   1. RiskScorer.score(features)         (validated, pure)
//!   2. PredictionStore.append(...)        (created_at assigned here)
//!   3. PredictionStore.upsert_customer    (only when the input names a customer)
//!
//! Analytics and history read the store and never block writers.
//! A model reload builds a complete scorer and swaps it atomically;
//! if the reload fails the previous scorer stays active.

use crate::{
    analytics::{AnalyticsAggregator, AnalyticsSnapshot},
    clock::{end_of_day, start_of_day, Clock},
    config::ChurnConfig,
    error::ChurnResult,
    features::FeatureRecord,
    history::{HistoryPage, HistoryPager},
    model::{ModelBundle, ModelInfo, ModelMetrics},
    prediction_store::{CustomerRecord, PredictionRecord, PredictionStore},
    rng::ConfidenceJitter,
    scorer::{RiskScorer, ScorerHandle},
    store::{PredictionFilter, RecordStore, SqliteStore},
    types::{RiskLevel, ScorerKind},
};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_customers: usize,
    pub churn_count:     usize,
    pub churn_rate:      f64,
    pub avg_confidence:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id:    String,
    pub predictions: Vec<PredictionRecord>,
    pub summary:     BatchSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub scorer:             ScorerKind,
    pub model_version:      Option<String>,
    pub database_reachable: bool,
    pub checked_at:         DateTime<Local>,
}

pub struct ChurnService<S: RecordStore = SqliteStore> {
    config: ChurnConfig,
    scorer: ScorerHandle,
    store:  PredictionStore<S>,
}

impl ChurnService<SqliteStore> {
    /// Open the configured database, apply migrations and pick the scorer.
    pub fn open(config: ChurnConfig) -> ChurnResult<Self> {
        let backend = if config.database_path == ":memory:" {
            SqliteStore::in_memory()?
        } else {
            SqliteStore::open(&config.database_path)?
        };
        backend.migrate()?;
        let store = PredictionStore::new(backend);
        let scorer = initial_scorer(&config);
        if let Some(metrics) = scorer.bundle().and_then(|b| b.metrics.as_ref()) {
            store.record_model_metrics(metrics);
        }
        Ok(Self::new(config, ScorerHandle::new(scorer), store))
    }

    /// Fully wired in-memory service with heuristic scoring and `clock`.
    pub fn build_test(clock: Arc<dyn Clock>) -> ChurnResult<Self> {
        let config = ChurnConfig::default_test();
        let backend = SqliteStore::in_memory()?;
        backend.migrate()?;
        let scorer = ScorerHandle::new(RiskScorer::heuristic(ConfidenceJitter::from_config(
            config.confidence_seed,
        )));
        Ok(Self::new(config, scorer, PredictionStore::with_clock(backend, clock)))
    }

    /// Another service for a different thread: same scorer handle, its own
    /// connection to the same database file. Writes nothing on construction.
    pub fn worker(&self) -> ChurnResult<Self> {
        let backend = self.store.backend().reopen()?;
        Ok(Self::new(
            self.config.clone(),
            self.scorer.clone(),
            PredictionStore::with_clock(backend, self.store.clock()),
        ))
    }
}

impl<S: RecordStore> ChurnService<S> {
    pub fn new(config: ChurnConfig, scorer: ScorerHandle, store: PredictionStore<S>) -> Self {
        Self { config, scorer, store }
    }

    pub fn config(&self) -> &ChurnConfig {
        &self.config
    }

    pub fn scorer_handle(&self) -> ScorerHandle {
        self.scorer.clone()
    }

    pub fn store(&self) -> &PredictionStore<S> {
        &self.store
    }

    // ── Scoring ───────────────────────────────────────────────────

    /// Score one record and persist the result.
    pub fn predict(&self, features: &FeatureRecord) -> ChurnResult<PredictionRecord> {
        let scorer = self.scorer.current();
        let score = scorer.score(features)?;
        let record = self.store.append(features, score)?;

        if features.identifies_customer() {
            self.store.upsert_customer(features)?;
        }

        log::info!(
            "prediction {} saved (customer={}, level={})",
            record.prediction_id,
            record.customer_id.as_deref().unwrap_or("-"),
            record.score.risk_level,
        );
        Ok(record)
    }

    /// Score and persist every record in order. The first failure aborts the batch.
    pub fn predict_batch(&self, batch: &[FeatureRecord]) -> ChurnResult<BatchOutcome> {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let predictions = batch
            .iter()
            .map(|features| self.predict(features))
            .collect::<ChurnResult<Vec<_>>>()?;

        let total = predictions.len();
        let churn_count = predictions.iter().filter(|p| p.score.prediction == 1).count();
        let summary = if total == 0 {
            BatchSummary {
                total_customers: 0,
                churn_count:     0,
                churn_rate:      0.0,
                avg_confidence:  0.0,
            }
        } else {
            BatchSummary {
                total_customers: total,
                churn_count,
                churn_rate: churn_count as f64 / total as f64,
                avg_confidence: predictions.iter().map(|p| p.score.confidence).sum::<f64>()
                    / total as f64,
            }
        };

        log::info!("batch {batch_id}: {total} scored, {churn_count} predicted to churn");
        Ok(BatchOutcome { batch_id, predictions, summary })
    }

    // ── Reads ─────────────────────────────────────────────────────

    pub fn analytics(&self) -> AnalyticsSnapshot {
        AnalyticsAggregator::new(&self.store).snapshot()
    }

    pub fn history(&self, limit: i64, offset: i64) -> HistoryPage {
        HistoryPager::new(&self.store).page(limit, offset)
    }

    pub fn customers(&self, limit: usize) -> Vec<CustomerRecord> {
        self.store.customers(limit)
    }

    pub fn high_risk_predictions(&self) -> Vec<PredictionRecord> {
        self.store.filter_where(
            &PredictionFilter::RiskLevel(RiskLevel::High),
            0,
            self.config.high_risk_list_limit,
        )
    }

    /// Records created during the local calendar `day`, newest first.
    pub fn predictions_on(&self, day: NaiveDate) -> Vec<PredictionRecord> {
        let filter = PredictionFilter::CreatedBetween {
            from: start_of_day(day),
            to:   end_of_day(day),
        };
        self.store.filter_where(&filter, 0, self.config.daily_list_limit)
    }

    pub fn predictions_for_customer(&self, customer_id: &str) -> Vec<PredictionRecord> {
        self.store.filter_where(
            &PredictionFilter::Customer(customer_id.to_string()),
            0,
            self.config.history_page_size,
        )
    }

    // ── Model ─────────────────────────────────────────────────────

    pub fn scorer_kind(&self) -> ScorerKind {
        self.scorer.current().kind()
    }

    pub fn model_info(&self) -> ModelInfo {
        self.scorer.current().info()
    }

    /// Persisted metrics first, then whatever the active bundle carries.
    pub fn model_metrics(&self) -> Option<ModelMetrics> {
        self.store
            .latest_model_metrics()
            .or_else(|| self.scorer.current().bundle().and_then(|b| b.metrics.clone()))
    }

    /// Load the bundle at `path` and make it the active scorer.
    /// On failure the error is logged and the previous scorer stays in place.
    pub fn reload_model(&self, path: &str) -> ChurnResult<ScorerKind> {
        let bundle = match ModelBundle::load(path) {
            Ok(b) => b,
            Err(e) => {
                log::error!("model reload from {path} failed, keeping current scorer: {e}");
                return Err(e);
            }
        };
        let metrics = bundle.metrics.clone();
        let previous = self.scorer.swap(RiskScorer::from_bundle(Some(bundle), self.jitter()));
        log::info!(
            "model reloaded from {path} (replaced {} scorer)",
            previous.kind().as_str()
        );
        if let Some(m) = metrics {
            self.store.record_model_metrics(&m);
        }
        Ok(ScorerKind::Model)
    }

    pub fn health(&self) -> HealthReport {
        let scorer = self.scorer.current();
        HealthReport {
            scorer:             scorer.kind(),
            model_version:      scorer.bundle().map(|b| b.version.clone()),
            database_reachable: self.store.is_reachable(),
            checked_at:         self.store.now(),
        }
    }

    fn jitter(&self) -> ConfidenceJitter {
        ConfidenceJitter::from_config(self.config.confidence_seed)
    }
}

/// Scorer selected at start-up. Absence of a bundle is expected;
/// an unreadable bundle is logged and also falls back to the heuristic.
fn initial_scorer(config: &ChurnConfig) -> RiskScorer {
    let jitter = ConfidenceJitter::from_config(config.confidence_seed);
    let bundle = match config.model_bundle_path.as_deref() {
        None => None,
        Some(path) if !Path::new(path).exists() => {
            log::warn!("model bundle {path} not found, running in heuristic mode");
            None
        }
        Some(path) => match ModelBundle::load(path) {
            Ok(b) => Some(b),
            Err(e) => {
                log::error!("{e}; running in heuristic mode");
                None
            }
        },
    };
    RiskScorer::from_bundle(bundle, jitter)
}
