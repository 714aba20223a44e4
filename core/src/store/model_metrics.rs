use super::SqliteStore;
use crate::{error::ChurnResult, model::ModelMetrics};
use chrono::{DateTime, Local};
use rusqlite::{params, OptionalExtension};

impl SqliteStore {
    // ── Model metrics ─────────────────────────────────────────────

    pub(super) fn replace_model_metrics(
        &self,
        m: &ModelMetrics,
        saved_at: DateTime<Local>,
    ) -> ChurnResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM model_metrics", [])?;
        tx.execute(
            "INSERT INTO model_metrics (
                model_version, training_date, accuracy, precision, recall, f1_score, saved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                m.model_version,
                m.training_date,
                m.accuracy,
                m.precision,
                m.recall,
                m.f1_score,
                saved_at.timestamp_millis(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub(super) fn current_model_metrics(&self) -> ChurnResult<Option<ModelMetrics>> {
        let metrics = self
            .conn
            .query_row(
                "SELECT model_version, training_date, accuracy, precision, recall, f1_score
                 FROM model_metrics ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(ModelMetrics {
                        model_version: row.get(0)?,
                        training_date: row.get(1)?,
                        accuracy:      row.get(2)?,
                        precision:     row.get(3)?,
                        recall:        row.get(4)?,
                        f1_score:      row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(metrics)
    }
}
