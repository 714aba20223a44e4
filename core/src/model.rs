//! Trained-classifier artifact consumed by the model-backed scorer.
//!
//! A bundle is immutable once built. Reloading means building a new bundle
//! and swapping the whole scorer (see `scorer::ScorerHandle`).
//!
//! On disk a bundle is a JSON document:
//!
//! ```json
//! {
//!   "version": "3.0.0",
//!   "feature_order": ["account_length", "customer_service_calls"],
//!   "classifier": { "kind": "logistic", "weights": [-0.4, 1.1], "intercept": -1.5 },
//!   "scaler": { "mean": [100.0, 1.5], "scale": [40.0, 1.3] },
//!   "importances": { "customer_service_calls": 0.7, "account_length": 0.3 },
//!   "metrics": { "model_version": "3.0.0", "training_date": "2026-10-01",
//!                "accuracy": 0.87, "precision": 0.85, "recall": 0.82, "f1_score": 0.83 }
//! }
//! ```

use crate::error::{ChurnError, ChurnResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Anything that maps an ordered feature vector to `[P(stay), P(churn)]`.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &[f64]) -> ChurnResult<[f64; 2]>;

    /// Short identifier shown in model info.
    fn kind(&self) -> &str;
}

/// Binary logistic regression over standardised inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub weights:   Vec<f64>,
    pub intercept: f64,
}

impl Classifier for LogisticClassifier {
    fn predict_proba(&self, features: &[f64]) -> ChurnResult<[f64; 2]> {
        if features.len() != self.weights.len() {
            return Err(ChurnError::Scoring(format!(
                "expected {} features, got {}",
                self.weights.len(),
                features.len()
            )));
        }
        let z: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        let p1 = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - p1, p1])
    }

    fn kind(&self) -> &str {
        "logistic"
    }
}

/// Per-feature standardisation applied before the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    pub mean:  Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    pub fn transform(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| if *s == 0.0 { x - m } else { (x - m) / s })
            .collect()
    }
}

/// Offline evaluation figures shipped with a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub model_version: String,
    pub training_date: String,
    pub accuracy:      f64,
    pub precision:     f64,
    pub recall:        f64,
    pub f1_score:      f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature:    String,
    pub importance: f64,
}

/// Descriptive view of whichever scorer is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name:               String,
    pub version:            String,
    pub features:           Vec<String>,
    pub feature_importance: Vec<FeatureImportance>,
}

impl ModelInfo {
    pub(crate) fn new(
        name: String,
        version: String,
        features: Vec<String>,
        importances: Option<&BTreeMap<String, f64>>,
    ) -> Self {
        let mut feature_importance: Vec<FeatureImportance> = importances
            .map(|m| {
                m.iter()
                    .map(|(feature, importance)| FeatureImportance {
                        feature: feature.clone(),
                        importance: *importance,
                    })
                    .collect()
            })
            .unwrap_or_default();
        feature_importance.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { name, version, features, feature_importance }
    }
}

/// Classifiers a bundle file can describe. Only logistic regression has an
/// on-disk form; ensembles and other models plug in as `Classifier` impls
/// through `ModelBundle::new`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierSpec {
    Logistic(LogisticClassifier),
}

#[derive(Debug, Clone, Deserialize)]
struct BundleFile {
    #[serde(default)]
    name:          Option<String>,
    version:       String,
    feature_order: Vec<String>,
    classifier:    ClassifierSpec,
    #[serde(default)]
    scaler:        Option<Scaler>,
    #[serde(default)]
    importances:   Option<BTreeMap<String, f64>>,
    #[serde(default)]
    metrics:       Option<ModelMetrics>,
}

pub struct ModelBundle {
    pub name:          String,
    pub version:       String,
    pub feature_order: Vec<String>,
    pub classifier:    Arc<dyn Classifier>,
    pub scaler:        Option<Scaler>,
    pub importances:   Option<BTreeMap<String, f64>>,
    pub metrics:       Option<ModelMetrics>,
}

impl ModelBundle {
    /// Programmatic bundle around any classifier.
    pub fn new(
        version: impl Into<String>,
        feature_order: Vec<String>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            name: "churn_classifier".to_string(),
            version: version.into(),
            feature_order,
            classifier,
            scaler: None,
            importances: None,
            metrics: None,
        }
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn with_importances(mut self, importances: BTreeMap<String, f64>) -> Self {
        self.importances = Some(importances);
        self
    }

    pub fn with_metrics(mut self, metrics: ModelMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Read and validate a bundle file.
    pub fn load(path: &str) -> ChurnResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ChurnError::ModelLoad {
            path:   path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ChurnError::ModelLoad { reason, .. } => ChurnError::ModelLoad {
                path: path.to_string(),
                reason,
            },
            other => ChurnError::ModelLoad {
                path:   path.to_string(),
                reason: other.to_string(),
            },
        })
    }

    pub fn from_json(content: &str) -> ChurnResult<Self> {
        let file: BundleFile = serde_json::from_str(content)?;
        let n = file.feature_order.len();
        let invalid = |reason: String| ChurnError::ModelLoad {
            path: "<inline>".to_string(),
            reason,
        };

        if n == 0 {
            return Err(invalid("feature_order is empty".into()));
        }
        let classifier: Arc<dyn Classifier> = match file.classifier {
            ClassifierSpec::Logistic(c) => {
                if c.weights.len() != n {
                    return Err(invalid(format!(
                        "classifier has {} weights for {n} features",
                        c.weights.len()
                    )));
                }
                Arc::new(c)
            }
        };
        if let Some(s) = &file.scaler {
            if s.mean.len() != n || s.scale.len() != n {
                return Err(invalid(format!(
                    "scaler has {}/{} entries for {n} features",
                    s.mean.len(),
                    s.scale.len()
                )));
            }
        }

        Ok(Self {
            name: file.name.unwrap_or_else(|| "churn_classifier".to_string()),
            version: file.version,
            feature_order: file.feature_order,
            classifier,
            scaler: file.scaler,
            importances: file.importances,
            metrics: file.metrics,
        })
    }

    /// Run the classifier on an already ordered vector; returns P(churn=1).
    pub fn churn_probability(&self, ordered: &[f64]) -> ChurnResult<f64> {
        let input = match &self.scaler {
            Some(s) => s.transform(ordered),
            None => ordered.to_vec(),
        };
        let [_, p1] = self.classifier.predict_proba(&input)?;
        if !p1.is_finite() || !(0.0..=1.0).contains(&p1) {
            return Err(ChurnError::Scoring(format!(
                "classifier returned out-of-range probability {p1}"
            )));
        }
        Ok(p1)
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo::new(
            format!("{} ({})", self.name, self.classifier.kind()),
            self.version.clone(),
            self.feature_order.clone(),
            self.importances.as_ref(),
        )
    }
}
