//! Blending, classification, cold start, factors and recommendations.

use behavior_guard::baseline::{AnomalyScore, LocationPattern, TransactionPatterns, UserBaseline};
use behavior_guard::config::RiskConfig;
use behavior_guard::features::layout::index_of;
use behavior_guard::features::{FeatureVector, FEATURE_DIM};
use behavior_guard::risk::factors::{
    context_factors, heuristic_probability, location_risk, recommendations, HIGH_VALUE,
    OUTSIDE_HOURS, UNUSUAL_LOCATION, UNUSUAL_MOVEMENT, UNUSUAL_TIMING,
};
use behavior_guard::risk::{
    BlendInput, RiskAssessment, RiskBlender, RiskLabel, ThresholdPolicy, Thresholds,
    UNABLE_TO_ASSESS,
};
use behavior_guard::transaction::{Transaction, TransactionType};
use chrono::{TimeZone, Utc};

fn blend(p: f64, a: f64, history_len: usize) -> RiskAssessment {
    let anomaly = AnomalyScore {
        score: a,
        factors: Vec::new(),
    };
    let history = vec![0.5; history_len];
    let features = FeatureVector::zeros();
    RiskBlender::new(RiskConfig::default()).blend(BlendInput {
        model_score: p,
        anomaly: &anomaly,
        thresholds: Thresholds::default(),
        history: &history,
        features: &features,
        context_factors: Vec::new(),
    })
}

fn home_baseline() -> UserBaseline {
    UserBaseline {
        user_id: "u".into(),
        feature_baseline: vec![0.0; FEATURE_DIM],
        feature_variance: vec![0.1; FEATURE_DIM],
        location_patterns: vec![LocationPattern {
            latitude: 12.97,
            longitude: 77.59,
            frequency: 4,
            last_seen: Utc::now(),
            risk_score: 0.0,
        }],
        time_patterns: Vec::new(),
        transaction_patterns: TransactionPatterns::default(),
        confidence: 0.6,
        sample_count: 50,
        last_updated: Utc::now(),
    }
}

#[test]
fn strong_model_and_anomaly_signal_blocks() {
    let r = blend(0.95, 0.8, 10);
    assert!((r.risk_score - 0.905).abs() < 1e-9);
    assert_eq!(r.risk_label, RiskLabel::High);
    assert!(r.should_block);
    assert!(!r.requires_additional_auth);
    assert_eq!(r.recommendations[0], "Transaction blocked due to high risk");
}

#[test]
fn medium_boundary_is_inclusive() {
    let r = blend(1.0, 0.0, 10);
    assert!((r.risk_score - 0.7).abs() < 1e-12);
    assert_eq!(r.risk_label, RiskLabel::Medium);
    assert!(r.requires_additional_auth);
    assert!(!r.should_block);
}

#[test]
fn cold_start_downgrades_high() {
    let r = blend(0.95, 0.95, 3);
    assert!((r.risk_score - 0.95).abs() < 1e-9);
    assert_eq!(r.risk_label, RiskLabel::Medium);
    assert!(!r.should_block);
    assert!(r.requires_additional_auth);

    // five prior scores are enough
    assert_eq!(blend(0.95, 0.95, 5).risk_label, RiskLabel::High);
}

#[test]
fn quiet_signals_are_low() {
    let r = blend(0.0, 0.0, 0);
    assert_eq!(r.risk_score, 0.0);
    assert_eq!(r.risk_label, RiskLabel::Low);
    assert_eq!(
        r.recommendations,
        vec![
            "Transaction appears normal".to_string(),
            "Continue with standard security measures".to_string()
        ]
    );
}

#[test]
fn non_finite_inputs_are_treated_as_zero() {
    let r = blend(f64::NAN, 0.5, 10);
    assert!((r.risk_score - 0.15).abs() < 1e-12);
    assert!(r.confidence.is_finite());
}

#[test]
fn confidence_stays_in_unit_range() {
    for (p, a, h) in [(0.0, 0.0, 0), (1.0, 1.0, 50), (0.3, 0.9, 2)] {
        let r = blend(p, a, h);
        assert!((0.0..=1.0).contains(&r.confidence));
    }
}

#[test]
fn factors_merge_context_then_anomaly() {
    let anomaly = AnomalyScore {
        score: 0.2,
        factors: vec!["Unusual touch_4 (2.5σ)".into()],
    };
    let features = FeatureVector::zeros();
    let r = RiskBlender::new(RiskConfig::default()).blend(BlendInput {
        model_score: 0.0,
        anomaly: &anomaly,
        thresholds: Thresholds::default(),
        history: &[],
        features: &features,
        context_factors: vec![HIGH_VALUE.to_string()],
    });
    assert_eq!(r.factors, vec![HIGH_VALUE.to_string(), "Unusual touch_4 (2.5σ)".to_string()]);
}

#[test]
fn unassessed_is_low_with_caution() {
    let r = RiskAssessment::unassessed();
    assert_eq!(r.risk_label, RiskLabel::Low);
    assert_eq!(r.confidence, 0.0);
    assert_eq!(r.recommendations, vec![UNABLE_TO_ASSESS.to_string()]);
    assert!(!r.should_block);
}

#[test]
fn assessment_serializes_in_camel_case() {
    let json = serde_json::to_value(blend(0.95, 0.8, 10)).unwrap();
    assert_eq!(json["riskLabel"], "HIGH");
    assert_eq!(json["shouldBlock"], true);
    assert!(json.get("requiresAdditionalAuth").is_some());
}

#[test]
fn threshold_policies_parse() {
    let adaptive: ThresholdPolicy = serde_json::from_str(r#"{"policy":"adaptive"}"#).unwrap();
    assert_eq!(adaptive, ThresholdPolicy::Adaptive);
    let fixed: ThresholdPolicy =
        serde_json::from_str(r#"{"policy":"fixed","low":0.2,"medium":0.5,"high":0.8}"#).unwrap();
    assert_eq!(
        fixed,
        ThresholdPolicy::Fixed(Thresholds {
            low: 0.2,
            medium: 0.5,
            high: 0.8
        })
    );
}

#[test]
fn location_risk_grows_with_distance() {
    let b = home_baseline();
    assert_eq!(location_risk(&b, 12.97, 77.59), Some(0.1));
    // about 22 km north
    assert_eq!(location_risk(&b, 13.17, 77.59), Some(0.4));
    // about 67 km north
    assert_eq!(location_risk(&b, 13.57, 77.59), Some(0.6));
    // Delhi
    assert_eq!(location_risk(&b, 28.61, 77.20), Some(0.8));

    let mut unknown = home_baseline();
    unknown.location_patterns.clear();
    assert_eq!(location_risk(&unknown, 28.61, 77.20), None);
    assert_eq!(location_risk(&b, f64::NAN, 77.59), None);
}

#[test]
fn context_factors_read_transaction_and_vector() {
    let mut values = vec![0.0; FEATURE_DIM];
    values[index_of("accelMeanY").unwrap()] = -2.5;
    let features = FeatureVector::from_padded(values);
    let mut tx = Transaction::new("t", 25_000.0, TransactionType::Transfer);
    tx.timestamp = Utc.with_ymd_and_hms(2024, 3, 4, 3, 15, 0).unwrap();

    let factors = context_factors(&features, Some(&tx), Some(0.8));
    assert_eq!(
        factors,
        vec![
            UNUSUAL_MOVEMENT.to_string(),
            UNUSUAL_LOCATION.to_string(),
            HIGH_VALUE.to_string(),
            OUTSIDE_HOURS.to_string()
        ]
    );

    tx.amount = 40.0;
    tx.timestamp = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
    assert!(context_factors(&FeatureVector::zeros(), Some(&tx), Some(0.6)).is_empty());

    let mut values = vec![0.0; FEATURE_DIM];
    values[index_of("touchDurationStd").unwrap()] = 6_000.0;
    let slow = FeatureVector::from_padded(values);
    assert_eq!(context_factors(&slow, Some(&tx), None), vec![UNUSUAL_TIMING.to_string()]);

    let mut values = vec![0.0; FEATURE_DIM];
    values[index_of("touchDurationMean").unwrap()] = 5_000.0;
    assert!(context_factors(&FeatureVector::from_padded(values), None, None).is_empty());
}

#[test]
fn heuristic_is_bounded_and_location_aware() {
    let loud = FeatureVector::from_padded(vec![50.0; FEATURE_DIM]);
    assert_eq!(heuristic_probability(&loud, None, None), 1.0);
    assert_eq!(heuristic_probability(&FeatureVector::zeros(), None, None), 0.0);

    let tx = Transaction::new("t", 20_000.0, TransactionType::Transfer);
    assert_eq!(heuristic_probability(&FeatureVector::zeros(), Some(&tx), Some(0.8)), 0.8);
}

#[test]
fn medium_location_factor_asks_for_location_confirmation() {
    let recs = recommendations(RiskLabel::Medium, &[UNUSUAL_LOCATION.to_string()]);
    assert_eq!(recs.last().map(String::as_str), Some("Confirm your current location"));
    let recs = recommendations(RiskLabel::Medium, &[]);
    assert_eq!(recs.len(), 2);
    assert_eq!(recommendations(RiskLabel::High, &[]).len(), 3);
}
