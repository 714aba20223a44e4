//! Dual-path churn scorer.
//!
//! A `RiskScorer` is built once per bundle state: model-backed when a
//! `ModelBundle` is available, heuristic otherwise. Both paths return the
//! same `ScoreResult` shape. The active scorer lives behind a
//! `ScorerHandle` and is replaced wholesale on reload, never mutated.

use crate::{
    error::{ChurnError, ChurnResult},
    features::FeatureRecord,
    model::{ModelBundle, ModelInfo},
    rng::ConfidenceJitter,
    types::{RiskLevel, ScorerKind},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub churn_probability:  f64,
    /// 1 iff `churn_probability > 0.5`.
    pub prediction:         u8,
    pub confidence:         f64,
    pub risk_level:         RiskLevel,
    pub message:            String,
    pub feature_importance: Option<BTreeMap<String, f64>>,
    pub scorer:             ScorerKind,
}

/// Probability thresholds for HIGH and MEDIUM (both exclusive lower bounds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBands {
    pub high:   f64,
    pub medium: f64,
}

pub const MODEL_BANDS: RiskBands = RiskBands { high: 0.7, medium: 0.4 };

/// The heuristic has no learned calibration, so it bands more aggressively.
pub const HEURISTIC_BANDS: RiskBands = RiskBands { high: 0.6, medium: 0.35 };

impl RiskBands {
    pub fn classify(&self, p: f64) -> RiskLevel {
        if p > self.high {
            RiskLevel::High
        } else if p > self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Capability shared by both scoring paths.
pub trait ScoringPath: Send + Sync {
    fn kind(&self) -> ScorerKind;
    fn score(&self, features: &FeatureRecord) -> ChurnResult<ScoreResult>;
    fn info(&self) -> ModelInfo;
}

fn label_for(p: f64) -> u8 {
    if p > 0.5 { 1 } else { 0 }
}

// ── Model path ───────────────────────────────────────────────────────────────

pub struct ModelScorer {
    bundle: ModelBundle,
}

impl ModelScorer {
    pub fn new(bundle: ModelBundle) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }
}

impl ScoringPath for ModelScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Model
    }

    fn score(&self, features: &FeatureRecord) -> ChurnResult<ScoreResult> {
        let ordered = features.to_vector(&self.bundle.feature_order);
        let p = self.bundle.churn_probability(&ordered)?;
        let risk_level = MODEL_BANDS.classify(p);

        Ok(ScoreResult {
            churn_probability:  p,
            prediction:         label_for(p),
            confidence:         p.max(1.0 - p),
            risk_level,
            message:            risk_level.message().to_string(),
            feature_importance: self.bundle.importances.clone(),
            scorer:             ScorerKind::Model,
        })
    }

    fn info(&self) -> ModelInfo {
        self.bundle.info()
    }
}

// ── Heuristic path ───────────────────────────────────────────────────────────

/// Heuristic weights are in hundredths of probability: summed as integers,
/// clamped, then divided by 100 once.
pub const HEURISTIC_BASE: i32 = 15;
pub const HEURISTIC_FLOOR: i32 = 5;
pub const HEURISTIC_CEILING: i32 = 95;

/// One additive adjustment of the fallback rule table, in hundredths.
pub struct HeuristicRule {
    pub feature: &'static str,
    pub adjust:  fn(&FeatureRecord) -> i32,
}

fn service_calls_rule(f: &FeatureRecord) -> i32 {
    if f.customer_service_calls >= 4.0 {
        35
    } else if f.customer_service_calls >= 2.0 {
        15
    } else {
        0
    }
}

fn international_plan_rule(f: &FeatureRecord) -> i32 {
    if f.international_plan == 1 { 15 } else { 0 }
}

fn voice_mail_rule(f: &FeatureRecord) -> i32 {
    match f.voice_mail_plan {
        0 => 10,
        1 => -8,
        _ => 0,
    }
}

fn day_minutes_rule(f: &FeatureRecord) -> i32 {
    if f.total_day_minutes < 50.0 {
        20
    } else if f.total_day_minutes < 100.0 {
        10
    } else if f.total_day_minutes > 200.0 {
        -10
    } else {
        0
    }
}

fn account_length_rule(f: &FeatureRecord) -> i32 {
    if f.account_length < 30.0 {
        15
    } else if f.account_length > 180.0 {
        -12
    } else {
        0
    }
}

fn evening_minutes_rule(f: &FeatureRecord) -> i32 {
    if f.total_eve_minutes < 20.0 { 10 } else { 0 }
}

/// Applied in order, starting from `HEURISTIC_BASE`.
pub const HEURISTIC_RULES: [HeuristicRule; 6] = [
    HeuristicRule { feature: "customer_service_calls", adjust: service_calls_rule },
    HeuristicRule { feature: "international_plan",     adjust: international_plan_rule },
    HeuristicRule { feature: "voice_mail_plan",        adjust: voice_mail_rule },
    HeuristicRule { feature: "total_day_minutes",      adjust: day_minutes_rule },
    HeuristicRule { feature: "account_length",         adjust: account_length_rule },
    HeuristicRule { feature: "total_eve_minutes",      adjust: evening_minutes_rule },
];

/// Static importance reported by the fallback. Not derived from the rule weights.
pub fn heuristic_importance() -> BTreeMap<String, f64> {
    [
        ("customer_service_calls", 0.28),
        ("international_plan",     0.20),
        ("total_day_minutes",      0.18),
        ("account_length",         0.15),
        ("voice_mail_plan",        0.12),
        ("total_day_charge",       0.07),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Rule-based fallback used whenever no bundle is loaded.
///
/// Confidence is drawn within a band: 0.85..0.95 in the high-certainty
/// region (p > 0.7 or p < 0.3), 0.70..0.85 elsewhere. With a seeded
/// `ConfidenceJitter` the draw is a deterministic function of the record,
/// still inside the same band.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    jitter: ConfidenceJitter,
}

impl HeuristicScorer {
    pub fn new(jitter: ConfidenceJitter) -> Self {
        Self { jitter }
    }

    pub fn probability(features: &FeatureRecord) -> f64 {
        let hundredths = HEURISTIC_RULES
            .iter()
            .fold(HEURISTIC_BASE, |acc, rule| acc + (rule.adjust)(features));
        f64::from(hundredths.clamp(HEURISTIC_FLOOR, HEURISTIC_CEILING)) / 100.0
    }

    fn confidence(&self, p: f64, features: &FeatureRecord) -> f64 {
        let u = self.jitter.draw(features);
        if p > 0.7 || p < 0.3 {
            0.85 + u * 0.10
        } else {
            0.70 + u * 0.15
        }
    }
}

impl ScoringPath for HeuristicScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Heuristic
    }

    fn score(&self, features: &FeatureRecord) -> ChurnResult<ScoreResult> {
        let p = Self::probability(features);
        let risk_level = HEURISTIC_BANDS.classify(p);

        Ok(ScoreResult {
            churn_probability:  p,
            prediction:         label_for(p),
            confidence:         self.confidence(p, features),
            risk_level,
            message:            risk_level.message().to_string(),
            feature_importance: Some(heuristic_importance()),
            scorer:             ScorerKind::Heuristic,
        })
    }

    fn info(&self) -> ModelInfo {
        ModelInfo::new(
            "heuristic_fallback".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
            HEURISTIC_RULES.iter().map(|r| r.feature.to_string()).collect(),
            Some(&heuristic_importance()),
        )
    }
}

// ── Variant selection ────────────────────────────────────────────────────────

/// The scoring path chosen once, when the scorer is built.
pub enum ScorerVariant {
    ModelBacked(ModelScorer),
    Heuristic(HeuristicScorer),
}

impl ScorerVariant {
    fn path(&self) -> &dyn ScoringPath {
        match self {
            Self::ModelBacked(m) => m as &dyn ScoringPath,
            Self::Heuristic(h)   => h as &dyn ScoringPath,
        }
    }
}

pub struct RiskScorer {
    variant: ScorerVariant,
}

impl RiskScorer {
    /// Model-backed when `bundle` is present, heuristic otherwise.
    /// A missing bundle is an expected state, not an error.
    pub fn from_bundle(bundle: Option<ModelBundle>, jitter: ConfidenceJitter) -> Self {
        let variant = match bundle {
            Some(b) => {
                log::info!(
                    "scorer: model-backed ({} v{}, {} features)",
                    b.name, b.version, b.feature_order.len()
                );
                ScorerVariant::ModelBacked(ModelScorer::new(b))
            }
            None => {
                log::info!(
                    "scorer: no model bundle, using heuristic fallback ({} confidence jitter)",
                    if jitter.is_deterministic() { "seeded" } else { "unseeded" }
                );
                ScorerVariant::Heuristic(HeuristicScorer::new(jitter))
            }
        };
        Self { variant }
    }

    pub fn heuristic(jitter: ConfidenceJitter) -> Self {
        Self::from_bundle(None, jitter)
    }

    pub fn kind(&self) -> ScorerKind {
        self.variant.path().kind()
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        match &self.variant {
            ScorerVariant::ModelBacked(m) => Some(m.bundle()),
            ScorerVariant::Heuristic(_)   => None,
        }
    }

    /// Validate, then score on the active path.
    /// A classifier failure is reported as `Scoring`; it is never
    /// replaced by a heuristic guess.
    pub fn score(&self, features: &FeatureRecord) -> ChurnResult<ScoreResult> {
        features.validate()?;
        let result = self.variant.path().score(features).map_err(|e| match e {
            ChurnError::Scoring(_) => e,
            other => ChurnError::Scoring(other.to_string()),
        })?;
        log::debug!(
            "scored {} via {}: p={:.3} level={}",
            features.customer_id.as_deref().unwrap_or("<anonymous>"),
            result.scorer.as_str(),
            result.churn_probability,
            result.risk_level,
        );
        Ok(result)
    }

    pub fn info(&self) -> ModelInfo {
        self.variant.path().info()
    }
}

// ── Shared handle ────────────────────────────────────────────────────────────

/// Cloneable reference to the active scorer.
///
/// Readers take the inner `Arc` and release the lock before scoring, so a
/// swap never blocks or invalidates an in-flight request.
#[derive(Clone)]
pub struct ScorerHandle {
    inner: Arc<RwLock<Arc<RiskScorer>>>,
}

impl ScorerHandle {
    pub fn new(scorer: RiskScorer) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(scorer))) }
    }

    pub fn current(&self) -> Arc<RiskScorer> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `scorer` and return the one it replaced.
    pub fn swap(&self, scorer: RiskScorer) -> Arc<RiskScorer> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(scorer))
    }
}
