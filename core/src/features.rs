//! Customer usage profile fed to the scorer.
//!
//! Every numeric field is always present: fields the caller omits
//! deserialize to the defaults in `FeatureRecord::default()`.

use crate::{
    error::{ChurnError, ChurnResult},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};

/// Canonical names of the 17 scored attributes, in record order.
pub const FEATURE_NAMES: [&str; 17] = [
    "account_length",
    "international_plan",
    "voice_mail_plan",
    "number_vmail_messages",
    "total_day_minutes",
    "total_day_calls",
    "total_day_charge",
    "total_eve_minutes",
    "total_eve_calls",
    "total_eve_charge",
    "total_night_minutes",
    "total_night_calls",
    "total_night_charge",
    "total_intl_minutes",
    "total_intl_calls",
    "total_intl_charge",
    "customer_service_calls",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRecord {
    pub account_length:         f64,
    pub international_plan:     u8,
    pub voice_mail_plan:        u8,
    pub number_vmail_messages:  f64,
    pub total_day_minutes:      f64,
    pub total_day_calls:        f64,
    pub total_day_charge:       f64,
    pub total_eve_minutes:      f64,
    pub total_eve_calls:        f64,
    pub total_eve_charge:       f64,
    pub total_night_minutes:    f64,
    pub total_night_calls:      f64,
    pub total_night_charge:     f64,
    pub total_intl_minutes:     f64,
    pub total_intl_calls:       f64,
    pub total_intl_charge:      f64,
    pub customer_service_calls: f64,
    pub customer_id:            Option<CustomerId>,
    pub customer_name:          Option<String>,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            account_length:         100.0,
            international_plan:     0,
            voice_mail_plan:        0,
            number_vmail_messages:  0.0,
            total_day_minutes:      200.0,
            total_day_calls:        100.0,
            total_day_charge:       30.0,
            total_eve_minutes:      200.0,
            total_eve_calls:        100.0,
            total_eve_charge:       15.0,
            total_night_minutes:    200.0,
            total_night_calls:      100.0,
            total_night_charge:     10.0,
            total_intl_minutes:     10.0,
            total_intl_calls:       5.0,
            total_intl_charge:      3.0,
            customer_service_calls: 2.0,
            customer_id:            None,
            customer_name:          None,
        }
    }
}

impl FeatureRecord {
    /// Look up a scored attribute by its canonical name.
    /// Returns `None` for names outside `FEATURE_NAMES`.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        let v = match name {
            "account_length"         => self.account_length,
            "international_plan"     => f64::from(self.international_plan),
            "voice_mail_plan"        => f64::from(self.voice_mail_plan),
            "number_vmail_messages"  => self.number_vmail_messages,
            "total_day_minutes"      => self.total_day_minutes,
            "total_day_calls"        => self.total_day_calls,
            "total_day_charge"       => self.total_day_charge,
            "total_eve_minutes"      => self.total_eve_minutes,
            "total_eve_calls"        => self.total_eve_calls,
            "total_eve_charge"       => self.total_eve_charge,
            "total_night_minutes"    => self.total_night_minutes,
            "total_night_calls"      => self.total_night_calls,
            "total_night_charge"     => self.total_night_charge,
            "total_intl_minutes"     => self.total_intl_minutes,
            "total_intl_calls"       => self.total_intl_calls,
            "total_intl_charge"      => self.total_intl_charge,
            "customer_service_calls" => self.customer_service_calls,
            _ => return None,
        };
        Some(v)
    }

    /// Build a vector in `order`. Unknown names contribute 0.0.
    pub fn to_vector(&self, order: &[String]) -> Vec<f64> {
        order
            .iter()
            .map(|name| self.value_of(name).unwrap_or(0.0))
            .collect()
    }

    /// Reject records the scorer must never see.
    pub fn validate(&self) -> ChurnResult<()> {
        for name in FEATURE_NAMES {
            let v = self.value_of(name).unwrap_or(0.0);
            if !v.is_finite() {
                return Err(ChurnError::validation(name, format!("must be finite, got {v}")));
            }
            if v < 0.0 {
                return Err(ChurnError::validation(name, format!("must be >= 0, got {v}")));
            }
        }
        if self.international_plan > 1 {
            return Err(ChurnError::validation("international_plan", "must be 0 or 1"));
        }
        if self.voice_mail_plan > 1 {
            return Err(ChurnError::validation("voice_mail_plan", "must be 0 or 1"));
        }
        if matches!(&self.customer_id, Some(id) if id.trim().is_empty()) {
            return Err(ChurnError::validation("customer_id", "must not be blank when present"));
        }
        Ok(())
    }

    /// Whether saving a prediction for this record should also touch the customer registry.
    pub fn identifies_customer(&self) -> bool {
        self.customer_id.is_some() || self.customer_name.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_take_defaults() {
        let rec: FeatureRecord =
            serde_json::from_str(r#"{"customer_service_calls": 5, "customer_id": "c-1"}"#).unwrap();
        assert_eq!(rec.customer_service_calls, 5.0);
        assert_eq!(rec.account_length, 100.0);
        assert_eq!(rec.total_eve_charge, 15.0);
        assert_eq!(rec.customer_id.as_deref(), Some("c-1"));
        assert!(rec.customer_name.is_none());
    }

    #[test]
    fn every_feature_name_resolves() {
        let rec = FeatureRecord::default();
        for name in FEATURE_NAMES {
            assert!(rec.value_of(name).is_some(), "{name} not mapped");
        }
        assert_eq!(rec.value_of("State"), None);
    }

    #[test]
    fn vector_pads_unknown_names_with_zero() {
        let rec = FeatureRecord { international_plan: 1, ..Default::default() };
        let order = vec![
            "international_plan".to_string(),
            "Total minutes".to_string(),
            "account_length".to_string(),
        ];
        assert_eq!(rec.to_vector(&order), vec![1.0, 0.0, 100.0]);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let neg = FeatureRecord { total_day_minutes: -1.0, ..Default::default() };
        assert!(matches!(neg.validate(), Err(ChurnError::Validation { ref field, .. }) if field == "total_day_minutes"));

        let nan = FeatureRecord { account_length: f64::NAN, ..Default::default() };
        assert!(nan.validate().is_err());

        let flag = FeatureRecord { voice_mail_plan: 2, ..Default::default() };
        assert!(flag.validate().is_err());

        let blank = FeatureRecord { customer_id: Some("  ".into()), ..Default::default() };
        assert!(blank.validate().is_err());

        assert!(FeatureRecord::default().validate().is_ok());
    }
}
