use churn_core::{
    error::{ChurnError, ChurnResult},
    features::FeatureRecord,
    model::{Classifier, ModelBundle},
    rng::ConfidenceJitter,
    scorer::{RiskScorer, MODEL_BANDS},
    types::{RiskLevel, ScorerKind},
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Always answers the same churn probability.
struct Fixed(f64);

impl Classifier for Fixed {
    fn predict_proba(&self, _features: &[f64]) -> ChurnResult<[f64; 2]> {
        Ok([1.0 - self.0, self.0])
    }
    fn kind(&self) -> &str { "fixed" }
}

/// Records the vector it was handed.
#[derive(Default)]
struct Spy(Mutex<Vec<f64>>);

impl Classifier for Spy {
    fn predict_proba(&self, features: &[f64]) -> ChurnResult<[f64; 2]> {
        *self.0.lock().unwrap() = features.to_vec();
        Ok([0.5, 0.5])
    }
    fn kind(&self) -> &str { "spy" }
}

struct Broken;

impl Classifier for Broken {
    fn predict_proba(&self, _features: &[f64]) -> ChurnResult<[f64; 2]> {
        Err(ChurnError::Scoring("tree 17 has no root".into()))
    }
    fn kind(&self) -> &str { "broken" }
}

fn model_scorer(classifier: Arc<dyn Classifier>) -> RiskScorer {
    let bundle = ModelBundle::new(
        "test",
        vec!["customer_service_calls".into(), "account_length".into()],
        classifier,
    );
    RiskScorer::from_bundle(Some(bundle), ConfidenceJitter::unseeded())
}

const LOGISTIC_BUNDLE: &str = r#"{
    "name": "rf_export",
    "version": "3.0.0",
    "feature_order": ["customer_service_calls", "international_plan", "total_day_minutes", "Total minutes"],
    "classifier": { "kind": "logistic", "weights": [1.2, 0.9, -0.4, 0.0], "intercept": -0.2 },
    "scaler": { "mean": [1.5, 0.1, 180.0, 0.0], "scale": [1.3, 0.3, 55.0, 1.0] },
    "importances": { "customer_service_calls": 0.5, "international_plan": 0.3, "total_day_minutes": 0.2 },
    "metrics": { "model_version": "3.0.0", "training_date": "2026-10-01",
                 "accuracy": 0.87, "precision": 0.85, "recall": 0.82, "f1_score": 0.83 }
}"#;

// ── Tests ────────────────────────────────────────────────────────────────────

/// Model-path banding: > 0.7 HIGH, (0.4, 0.7] MEDIUM, otherwise LOW.
#[test]
fn model_bands_use_model_thresholds() {
    let cases = [
        (0.95, RiskLevel::High),
        (0.71, RiskLevel::High),
        (0.70, RiskLevel::Medium),
        (0.65, RiskLevel::Medium),
        (0.41, RiskLevel::Medium),
        (0.40, RiskLevel::Low),
        (0.05, RiskLevel::Low),
    ];
    for (p, expected) in cases {
        let r = model_scorer(Arc::new(Fixed(p))).score(&FeatureRecord::default()).unwrap();
        assert_eq!(r.risk_level, expected, "p={p}");
        assert_eq!(r.scorer, ScorerKind::Model);
    }
}

/// A probability of 0.65 is MEDIUM on the model path but HIGH on the
/// heuristic path: the two paths band differently on purpose.
#[test]
fn model_and_heuristic_bands_differ() {
    assert_eq!(MODEL_BANDS.classify(0.65), RiskLevel::Medium);
    assert_eq!(churn_core::scorer::HEURISTIC_BANDS.classify(0.65), RiskLevel::High);
}

/// label = 1 iff p > 0.5, confidence = max(p, 1 - p).
#[test]
fn label_and_confidence_follow_probability() {
    for p in [0.0, 0.2, 0.5, 0.500001, 0.8, 1.0] {
        let r = model_scorer(Arc::new(Fixed(p))).score(&FeatureRecord::default()).unwrap();
        assert_eq!(r.prediction == 1, p > 0.5, "label at p={p}");
        assert!((r.confidence - p.max(1.0 - p)).abs() < 1e-12, "confidence at p={p}");
    }
}

/// The vector is reordered to the bundle's feature order.
#[test]
fn features_are_reordered_to_bundle_order() {
    let spy = Arc::new(Spy::default());
    let scorer = model_scorer(spy.clone());
    let rec = FeatureRecord {
        customer_service_calls: 7.0,
        account_length: 42.0,
        ..Default::default()
    };

    scorer.score(&rec).unwrap();

    assert_eq!(*spy.0.lock().unwrap(), vec![7.0, 42.0]);
}

/// A classifier failure surfaces as a scoring error, never a heuristic guess.
#[test]
fn classifier_failure_is_reported() {
    let err = model_scorer(Arc::new(Broken))
        .score(&FeatureRecord::default())
        .unwrap_err();
    assert!(matches!(err, ChurnError::Scoring(_)), "got {err:?}");
}

/// Out-of-range classifier output is a scoring error too.
#[test]
fn out_of_range_probability_is_rejected() {
    let err = model_scorer(Arc::new(Fixed(1.3)))
        .score(&FeatureRecord::default())
        .unwrap_err();
    assert!(matches!(err, ChurnError::Scoring(_)), "got {err:?}");
}

/// Importance is the bundle's static map; absent map means null.
#[test]
fn importance_comes_from_bundle() {
    let bare = model_scorer(Arc::new(Fixed(0.3))).score(&FeatureRecord::default()).unwrap();
    assert!(bare.feature_importance.is_none());

    let mut imp = BTreeMap::new();
    imp.insert("customer_service_calls".to_string(), 0.6);
    imp.insert("account_length".to_string(), 0.4);
    let bundle = ModelBundle::new(
        "test",
        vec!["customer_service_calls".into(), "account_length".into()],
        Arc::new(Fixed(0.3)),
    )
    .with_importances(imp.clone());
    let scorer = RiskScorer::from_bundle(Some(bundle), ConfidenceJitter::unseeded());

    let a = scorer.score(&FeatureRecord::default()).unwrap();
    let b = scorer
        .score(&FeatureRecord { customer_service_calls: 9.0, ..Default::default() })
        .unwrap();
    assert_eq!(a.feature_importance.as_ref(), Some(&imp));
    assert_eq!(a.feature_importance, b.feature_importance, "importance must not vary per record");
}

/// A JSON bundle scores: more service calls means higher churn probability.
#[test]
fn logistic_bundle_scores_end_to_end() {
    let bundle = ModelBundle::from_json(LOGISTIC_BUNDLE).unwrap();
    assert_eq!(bundle.metrics.as_ref().map(|m| m.accuracy), Some(0.87));
    let scorer = RiskScorer::from_bundle(Some(bundle), ConfidenceJitter::unseeded());

    let calm = scorer
        .score(&FeatureRecord { customer_service_calls: 0.0, ..Default::default() })
        .unwrap();
    let angry = scorer
        .score(&FeatureRecord { customer_service_calls: 6.0, international_plan: 1, ..Default::default() })
        .unwrap();

    assert!(angry.churn_probability > calm.churn_probability);
    assert!((0.0..=1.0).contains(&angry.churn_probability));
    assert_eq!(angry.risk_level, MODEL_BANDS.classify(angry.churn_probability));

    let info = scorer.info();
    assert_eq!(info.version, "3.0.0");
    assert!(info.name.starts_with("rf_export"));
    assert_eq!(info.feature_importance[0].feature, "customer_service_calls");
}

/// Both paths return the same shape with the same field names.
#[test]
fn both_paths_serialize_identically_shaped() {
    let model = model_scorer(Arc::new(Fixed(0.8))).score(&FeatureRecord::default()).unwrap();
    let heur = RiskScorer::heuristic(ConfidenceJitter::seeded(1))
        .score(&FeatureRecord::default())
        .unwrap();

    let keys = |v: serde_json::Value| -> Vec<String> {
        v.as_object().unwrap().keys().cloned().collect()
    };
    assert_eq!(
        keys(serde_json::to_value(&model).unwrap()),
        keys(serde_json::to_value(&heur).unwrap())
    );
}

/// A bundle assembled in code scores exactly like the same bundle read from JSON.
#[test]
fn programmatic_bundle_matches_file_bundle() {
    use churn_core::model::{LogisticClassifier, ModelMetrics, Scaler};

    let from_file = ModelBundle::from_json(LOGISTIC_BUNDLE).unwrap();
    let built = ModelBundle::new(
        "3.0.0",
        from_file.feature_order.clone(),
        Arc::new(LogisticClassifier { weights: vec![1.2, 0.9, -0.4, 0.0], intercept: -0.2 }),
    )
    .with_scaler(Scaler {
        mean:  vec![1.5, 0.1, 180.0, 0.0],
        scale: vec![1.3, 0.3, 55.0, 1.0],
    })
    .with_metrics(ModelMetrics {
        model_version: "3.0.0".into(),
        training_date: "2026-10-01".into(),
        accuracy:      0.87,
        precision:     0.85,
        recall:        0.82,
        f1_score:      0.83,
    });

    assert_eq!(built.metrics, from_file.metrics);
    let rec = FeatureRecord { customer_service_calls: 3.0, total_day_minutes: 120.0, ..Default::default() };
    let ordered = rec.to_vector(&built.feature_order);
    assert_eq!(
        built.churn_probability(&ordered).unwrap(),
        from_file.churn_probability(&ordered).unwrap()
    );
}
