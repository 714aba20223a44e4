use super::{millis_to_local, SqliteStore};
use crate::{error::ChurnResult, features::FeatureRecord, prediction_store::CustomerRecord};
use rusqlite::params;

impl SqliteStore {
    // ── Customer registry ─────────────────────────────────────────

    /// Single-statement upsert keyed on `customer_id`.
    /// On conflict every field is overwritten except `record_id`, which keeps
    /// its first-seen value.
    pub(super) fn upsert_customer_row(&self, c: &CustomerRecord) -> ChurnResult<String> {
        let p = &c.profile;
        let record_id: String = self.conn.query_row(
            "INSERT INTO customer (
                record_id, customer_id, name,
                account_length, international_plan, voice_mail_plan, number_vmail_messages,
                total_day_minutes, total_day_calls, total_day_charge,
                total_eve_minutes, total_eve_calls, total_eve_charge,
                total_night_minutes, total_night_calls, total_night_charge,
                total_intl_minutes, total_intl_calls, total_intl_charge,
                customer_service_calls, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21, ?22)
            ON CONFLICT(customer_id) DO UPDATE SET
                name                   = excluded.name,
                account_length         = excluded.account_length,
                international_plan     = excluded.international_plan,
                voice_mail_plan        = excluded.voice_mail_plan,
                number_vmail_messages  = excluded.number_vmail_messages,
                total_day_minutes      = excluded.total_day_minutes,
                total_day_calls        = excluded.total_day_calls,
                total_day_charge       = excluded.total_day_charge,
                total_eve_minutes      = excluded.total_eve_minutes,
                total_eve_calls        = excluded.total_eve_calls,
                total_eve_charge       = excluded.total_eve_charge,
                total_night_minutes    = excluded.total_night_minutes,
                total_night_calls      = excluded.total_night_calls,
                total_night_charge     = excluded.total_night_charge,
                total_intl_minutes     = excluded.total_intl_minutes,
                total_intl_calls       = excluded.total_intl_calls,
                total_intl_charge      = excluded.total_intl_charge,
                customer_service_calls = excluded.customer_service_calls,
                created_at             = excluded.created_at,
                updated_at             = excluded.updated_at
            RETURNING record_id",
            params![
                c.record_id,
                c.customer_id,
                c.name,
                p.account_length,
                p.international_plan as i64,
                p.voice_mail_plan as i64,
                p.number_vmail_messages,
                p.total_day_minutes,
                p.total_day_calls,
                p.total_day_charge,
                p.total_eve_minutes,
                p.total_eve_calls,
                p.total_eve_charge,
                p.total_night_minutes,
                p.total_night_calls,
                p.total_night_charge,
                p.total_intl_minutes,
                p.total_intl_calls,
                p.total_intl_charge,
                p.customer_service_calls,
                c.created_at.timestamp_millis(),
                c.updated_at.timestamp_millis(),
            ],
            |row| row.get(0),
        )?;
        Ok(record_id)
    }

    pub(super) fn customers_newest_first(&self, limit: usize) -> ChurnResult<Vec<CustomerRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, customer_id, name,
                    account_length, international_plan, voice_mail_plan, number_vmail_messages,
                    total_day_minutes, total_day_calls, total_day_charge,
                    total_eve_minutes, total_eve_calls, total_eve_charge,
                    total_night_minutes, total_night_calls, total_night_charge,
                    total_intl_minutes, total_intl_calls, total_intl_charge,
                    customer_service_calls, created_at, updated_at
             FROM customer
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            let customer_id: Option<String> = row.get(1)?;
            let name: Option<String> = row.get(2)?;
            Ok(CustomerRecord {
                record_id: row.get(0)?,
                profile: FeatureRecord {
                    account_length:         row.get(3)?,
                    international_plan:     row.get::<_, i64>(4)? as u8,
                    voice_mail_plan:        row.get::<_, i64>(5)? as u8,
                    number_vmail_messages:  row.get(6)?,
                    total_day_minutes:      row.get(7)?,
                    total_day_calls:        row.get(8)?,
                    total_day_charge:       row.get(9)?,
                    total_eve_minutes:      row.get(10)?,
                    total_eve_calls:        row.get(11)?,
                    total_eve_charge:       row.get(12)?,
                    total_night_minutes:    row.get(13)?,
                    total_night_calls:      row.get(14)?,
                    total_night_charge:     row.get(15)?,
                    total_intl_minutes:     row.get(16)?,
                    total_intl_calls:       row.get(17)?,
                    total_intl_charge:      row.get(18)?,
                    customer_service_calls: row.get(19)?,
                    customer_id:            customer_id.clone(),
                    customer_name:          name.clone(),
                },
                customer_id,
                name,
                created_at: millis_to_local(20, row.get(20)?)?,
                updated_at: millis_to_local(21, row.get(21)?)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub(super) fn customer_count(&self) -> ChurnResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
