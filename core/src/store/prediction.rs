use super::{conversion_error, millis_to_local, PredictionFilter, SqliteStore};
use crate::{
    error::ChurnResult,
    prediction_store::PredictionRecord,
    scorer::ScoreResult,
    types::{RiskLevel, ScorerKind},
};
use rusqlite::{params, params_from_iter, types::Value, Row};
use std::collections::BTreeMap;

#[derive(Debug)]
struct UnknownVariant(String);

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown stored value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl SqliteStore {
    // ── Prediction history ────────────────────────────────────────

    pub(super) fn insert_prediction_row(&self, record: &PredictionRecord) -> ChurnResult<()> {
        let importance = record
            .score
            .feature_importance
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO prediction (
                prediction_id, customer_id, customer_name, created_at,
                churn_probability, prediction, confidence, risk_level,
                message, feature_importance, scorer
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.prediction_id,
                record.customer_id,
                record.customer_name,
                record.created_at.timestamp_millis(),
                record.score.churn_probability,
                record.score.prediction as i64,
                record.score.confidence,
                record.score.risk_level.as_str(),
                record.score.message,
                importance,
                record.score.scorer.as_str(),
            ],
        )?;
        Ok(())
    }

    pub(super) fn prediction_count(&self, filter: &PredictionFilter) -> ChurnResult<i64> {
        let (clause, values) = filter.to_sql();
        let sql = format!("SELECT COUNT(*) FROM prediction WHERE {clause}");
        let count = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count)
    }

    pub(super) fn predictions_newest_first(
        &self,
        filter: &PredictionFilter,
        skip: usize,
        limit: usize,
    ) -> ChurnResult<Vec<PredictionRecord>> {
        let (clause, mut values) = filter.to_sql();
        let limit_idx = values.len() + 1;
        let sql = format!(
            "SELECT prediction_id, customer_id, customer_name, created_at,
                    churn_probability, prediction, confidence, risk_level,
                    message, feature_importance, scorer
             FROM prediction WHERE {clause}
             ORDER BY created_at DESC, seq DESC
             LIMIT ?{limit_idx} OFFSET ?{}",
            limit_idx + 1
        );
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        values.push(Value::Integer(i64::try_from(skip).unwrap_or(i64::MAX)));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), prediction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(super) fn prediction_mean_confidence(
        &self,
        filter: &PredictionFilter,
    ) -> ChurnResult<Option<f64>> {
        let (clause, values) = filter.to_sql();
        let sql = format!("SELECT AVG(confidence) FROM prediction WHERE {clause}");
        let mean = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| {
                row.get::<_, Option<f64>>(0)
            })?;
        Ok(mean)
    }
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<PredictionRecord> {
    let risk_raw: String = row.get(7)?;
    let risk_level = RiskLevel::parse(&risk_raw)
        .ok_or_else(|| conversion_error(7, UnknownVariant(risk_raw.clone())))?;

    let scorer_raw: String = row.get(10)?;
    let scorer = ScorerKind::parse(&scorer_raw)
        .ok_or_else(|| conversion_error(10, UnknownVariant(scorer_raw.clone())))?;

    let feature_importance = row
        .get::<_, Option<String>>(9)?
        .map(|json| serde_json::from_str::<BTreeMap<String, f64>>(&json))
        .transpose()
        .map_err(|e| conversion_error(9, e))?;

    Ok(PredictionRecord {
        prediction_id: row.get(0)?,
        customer_id:   row.get(1)?,
        customer_name: row.get(2)?,
        created_at:    millis_to_local(3, row.get(3)?)?,
        score: ScoreResult {
            churn_probability: row.get(4)?,
            prediction:        row.get::<_, i64>(5)? as u8,
            confidence:        row.get(6)?,
            risk_level,
            message:           row.get(8)?,
            feature_importance,
            scorer,
        },
    })
}
