//! SQLite persistence layer.
//!
//! RULE: Only the store module talks to the database.
//! The prediction store, aggregator and pager go through `RecordStore`;
//! they never execute SQL directly.

mod customer;
mod model_metrics;
mod prediction;

use crate::{
    error::ChurnResult,
    model::ModelMetrics,
    prediction_store::{CustomerRecord, PredictionRecord},
    types::RiskLevel,
};
use chrono::{DateTime, Local, TimeZone};
use rusqlite::{types::Value, Connection};

/// Equality and date-range predicates over stored predictions.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionFilter {
    All,
    /// `prediction == 1`.
    Churned,
    RiskLevel(RiskLevel),
    /// Inclusive on both ends.
    CreatedBetween {
        from: DateTime<Local>,
        to:   DateTime<Local>,
    },
    Customer(String),
}

impl PredictionFilter {
    /// SQL predicate using `?1`, `?2`... plus its bound values.
    pub(crate) fn to_sql(&self) -> (&'static str, Vec<Value>) {
        match self {
            Self::All => ("1 = 1", vec![]),
            Self::Churned => ("prediction = 1", vec![]),
            Self::RiskLevel(level) => (
                "risk_level = ?1",
                vec![Value::Text(level.as_str().to_string())],
            ),
            Self::CreatedBetween { from, to } => (
                "created_at >= ?1 AND created_at <= ?2",
                vec![
                    Value::Integer(from.timestamp_millis()),
                    Value::Integer(to.timestamp_millis()),
                ],
            ),
            Self::Customer(id) => ("customer_id = ?1", vec![Value::Text(id.clone())]),
        }
    }
}

/// Contract the core needs from its persistence collaborator.
///
/// Writes are serialised per key by the backend's own update-or-insert
/// primitive; no in-process lock is taken around them.
pub trait RecordStore {
    fn insert_prediction(&self, record: &PredictionRecord) -> ChurnResult<()>;

    /// Insert, or overwrite the row with the same `customer_id`.
    /// Returns the stored row's record id.
    fn upsert_customer(&self, customer: &CustomerRecord) -> ChurnResult<String>;

    fn count_predictions(&self, filter: &PredictionFilter) -> ChurnResult<i64>;

    /// Newest `created_at` first.
    fn find_predictions(
        &self,
        filter: &PredictionFilter,
        skip: usize,
        limit: usize,
    ) -> ChurnResult<Vec<PredictionRecord>>;

    /// `None` when no record matches.
    fn mean_confidence(&self, filter: &PredictionFilter) -> ChurnResult<Option<f64>>;

    fn list_customers(&self, limit: usize) -> ChurnResult<Vec<CustomerRecord>>;

    fn count_customers(&self) -> ChurnResult<i64>;

    /// Replace any previously saved metrics.
    fn save_model_metrics(&self, metrics: &ModelMetrics, saved_at: DateTime<Local>) -> ChurnResult<()>;

    fn latest_model_metrics(&self) -> ChurnResult<Option<ModelMetrics>>;

    /// Cheap reachability check.
    fn ping(&self) -> ChurnResult<()>;
}

pub struct SqliteStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SqliteStore {
    pub fn open(path: &str) -> ChurnResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL lets readers run alongside the writer. Ignored for :memory:.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ChurnResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> ChurnResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ChurnResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_predictions.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_customers.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_model_metrics.sql"))?;
        Ok(())
    }

    /// Raw connection, for tooling and fault injection in tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteStore {
    fn insert_prediction(&self, record: &PredictionRecord) -> ChurnResult<()> {
        self.insert_prediction_row(record)
    }

    fn upsert_customer(&self, customer: &CustomerRecord) -> ChurnResult<String> {
        self.upsert_customer_row(customer)
    }

    fn count_predictions(&self, filter: &PredictionFilter) -> ChurnResult<i64> {
        self.prediction_count(filter)
    }

    fn find_predictions(
        &self,
        filter: &PredictionFilter,
        skip: usize,
        limit: usize,
    ) -> ChurnResult<Vec<PredictionRecord>> {
        self.predictions_newest_first(filter, skip, limit)
    }

    fn mean_confidence(&self, filter: &PredictionFilter) -> ChurnResult<Option<f64>> {
        self.prediction_mean_confidence(filter)
    }

    fn list_customers(&self, limit: usize) -> ChurnResult<Vec<CustomerRecord>> {
        self.customers_newest_first(limit)
    }

    fn count_customers(&self) -> ChurnResult<i64> {
        self.customer_count()
    }

    fn save_model_metrics(&self, metrics: &ModelMetrics, saved_at: DateTime<Local>) -> ChurnResult<()> {
        self.replace_model_metrics(metrics, saved_at)
    }

    fn latest_model_metrics(&self) -> ChurnResult<Option<ModelMetrics>> {
        self.current_model_metrics()
    }

    fn ping(&self) -> ChurnResult<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

// ── Row conversion helpers ──────────────────────────────────────────────────

pub(crate) fn millis_to_local(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(idx, ms)
    })
}

pub(crate) fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
