use churn_core::{
    error::ChurnError,
    features::FeatureRecord,
    rng::ConfidenceJitter,
    scorer::{HeuristicScorer, RiskScorer, HEURISTIC_BANDS},
    types::{RiskLevel, ScorerKind},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn seeded() -> RiskScorer {
    RiskScorer::heuristic(ConfidenceJitter::seeded(42))
}

/// A spread of profiles covering every branch of the rule table.
fn profiles() -> Vec<FeatureRecord> {
    let mut out = Vec::new();
    for calls in [0.0, 1.0, 2.0, 3.0, 4.0, 9.0] {
        for intl in [0u8, 1] {
            for vm in [0u8, 1] {
                for day in [10.0, 75.0, 150.0, 250.0] {
                    for acct in [5.0, 100.0, 200.0] {
                        for eve in [5.0, 200.0] {
                            out.push(FeatureRecord {
                                customer_service_calls: calls,
                                international_plan: intl,
                                voice_mail_plan: vm,
                                total_day_minutes: day,
                                account_length: acct,
                                total_eve_minutes: eve,
                                ..Default::default()
                            });
                        }
                    }
                }
            }
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The worst-case profile saturates at the ceiling and lands in HIGH.
#[test]
fn worst_profile_clamps_to_ceiling() {
    let rec = FeatureRecord {
        customer_service_calls: 5.0,
        international_plan: 1,
        voice_mail_plan: 0,
        total_day_minutes: 40.0,
        account_length: 20.0,
        total_eve_minutes: 10.0,
        ..Default::default()
    };

    let r = seeded().score(&rec).unwrap();

    assert!((r.churn_probability - 0.95).abs() < 1e-12, "p={}", r.churn_probability);
    assert_eq!(r.risk_level, RiskLevel::High);
    assert_eq!(r.prediction, 1);
    assert_eq!(r.scorer, ScorerKind::Heuristic);
}

/// The best-case profile bottoms out at the floor and lands in LOW.
#[test]
fn best_profile_clamps_to_floor() {
    let rec = FeatureRecord {
        customer_service_calls: 0.0,
        international_plan: 0,
        voice_mail_plan: 1,
        total_day_minutes: 300.0,
        account_length: 365.0,
        total_eve_minutes: 250.0,
        ..Default::default()
    };

    let r = seeded().score(&rec).unwrap();

    // 0.15 - 0.08 - 0.10 - 0.12 < 0.05
    assert!((r.churn_probability - 0.05).abs() < 1e-12, "p={}", r.churn_probability);
    assert_eq!(r.risk_level, RiskLevel::Low);
    assert_eq!(r.prediction, 0);
}

/// Default input: 2 service calls (+0.15), no voice mail (+0.10), 200 day
/// minutes (no adjustment) -> 0.40, which is MEDIUM on the heuristic bands.
#[test]
fn default_profile_is_medium() {
    let r = seeded().score(&FeatureRecord::default()).unwrap();

    assert!((r.churn_probability - 0.40).abs() < 1e-9, "p={}", r.churn_probability);
    assert_eq!(r.risk_level, RiskLevel::Medium);
    assert_eq!(r.prediction, 0);
}

/// Raising service calls from 1 to 5, all else fixed, never lowers probability.
#[test]
fn service_calls_are_monotonic() {
    for base in profiles() {
        let mut last = f64::MIN;
        for calls in 1..=5 {
            let rec = FeatureRecord { customer_service_calls: calls as f64, ..base.clone() };
            let p = HeuristicScorer::probability(&rec);
            assert!(p >= last, "p dropped from {last} to {p} at {calls} calls");
            last = p;
        }
    }
}

/// Range, label and banding invariants hold across the whole rule table.
#[test]
fn outputs_respect_invariants() {
    let scorer = RiskScorer::heuristic(ConfidenceJitter::unseeded());

    for rec in profiles() {
        let r = scorer.score(&rec).unwrap();
        let p = r.churn_probability;

        assert!((0.05..=0.95).contains(&p), "p={p} outside clamp");
        assert!((0.0..=1.0).contains(&r.confidence), "confidence={}", r.confidence);
        assert_eq!(r.prediction == 1, p > 0.5, "label mismatch at p={p}");
        assert_eq!(r.risk_level, HEURISTIC_BANDS.classify(p));
        assert_eq!(r.message, r.risk_level.message());
    }
}

/// Confidence is jittered inside the documented band for the certainty region.
#[test]
fn confidence_stays_in_band() {
    let scorer = RiskScorer::heuristic(ConfidenceJitter::unseeded());

    for rec in profiles() {
        let r = scorer.score(&rec).unwrap();
        let p = r.churn_probability;
        let c = r.confidence;
        if p > 0.7 || p < 0.3 {
            assert!((0.85..=0.95).contains(&c), "p={p} confidence={c} not in [0.85, 0.95]");
        } else {
            assert!((0.70..=0.85).contains(&c), "p={p} confidence={c} not in [0.70, 0.85]");
        }
    }
}

/// With a seed the jitter is a deterministic function of the record.
#[test]
fn seeded_confidence_is_repeatable() {
    let a = seeded();
    let b = seeded();
    for rec in profiles().into_iter().take(50) {
        assert_eq!(a.score(&rec).unwrap(), b.score(&rec).unwrap());
    }
}

/// The fallback reports its fixed importance map, not the rule weights.
#[test]
fn importance_is_static() {
    let r = seeded().score(&FeatureRecord::default()).unwrap();
    let imp = r.feature_importance.expect("heuristic always reports importance");

    assert_eq!(imp.len(), 6);
    assert_eq!(imp["customer_service_calls"], 0.28);
    assert_eq!(imp["total_day_charge"], 0.07);
    let sum: f64 = imp.values().sum();
    assert!((sum - 1.0).abs() < 1e-9, "importances sum to {sum}");
}

/// Malformed input is rejected before scoring.
#[test]
fn invalid_record_is_a_validation_error() {
    let rec = FeatureRecord { international_plan: 3, ..Default::default() };
    let err = seeded().score(&rec).unwrap_err();
    assert!(matches!(err, ChurnError::Validation { .. }), "got {err:?}");
}

/// Profiles whose rule sum lands exactly on a threshold, with their p and band.
/// All four sit in the grey confidence region (0.3 <= p <= 0.7).
fn boundary_profiles() -> Vec<(FeatureRecord, f64, RiskLevel)> {
    let rec = |calls: f64, intl: u8, vm: u8, day: f64, acct: f64, eve: f64| FeatureRecord {
        customer_service_calls: calls,
        international_plan: intl,
        voice_mail_plan: vm,
        total_day_minutes: day,
        account_length: acct,
        total_eve_minutes: eve,
        ..Default::default()
    };
    vec![
        // 15 + 15 - 8 + 10 - 12 + 10
        (rec(0.0, 1, 1, 75.0, 200.0, 5.0), 0.30, RiskLevel::Low),
        // 15 + 10 + 10
        (rec(0.0, 0, 0, 75.0, 100.0, 200.0), 0.35, RiskLevel::Low),
        // 15 + 15 + 10 + 20
        (rec(0.0, 1, 0, 10.0, 100.0, 200.0), 0.60, RiskLevel::Medium),
        // 15 + 35 + 10 + 10
        (rec(4.0, 0, 0, 150.0, 100.0, 5.0), 0.70, RiskLevel::High),
    ]
}

/// Threshold profiles hit the threshold exactly and band on the inclusive side.
#[test]
fn boundary_profiles_band_exactly() {
    for (rec, expected_p, expected_level) in boundary_profiles() {
        let r = seeded().score(&rec).unwrap();
        assert_eq!(r.churn_probability, expected_p, "profile {rec:?}");
        assert_eq!(r.risk_level, expected_level, "p={}", r.churn_probability);
    }
}

/// p = 0.30 and p = 0.70 belong to the grey region, never the high-certainty band.
#[test]
fn boundary_profiles_draw_grey_confidence() {
    for (rec, expected_p, _) in boundary_profiles() {
        for seed in 0..200u64 {
            let c = RiskScorer::heuristic(ConfidenceJitter::seeded(seed))
                .score(&rec)
                .unwrap()
                .confidence;
            assert!(
                (0.70..=0.85).contains(&c),
                "p={expected_p} seed={seed} confidence={c} outside [0.70, 0.85]"
            );
        }
    }
}
