//! Baseline learning, anomaly scoring and adaptive thresholds.

use behavior_guard::baseline::{
    BaselineLearner, BaselineTracker, TransactionPatterns, UserBaseline,
};
use behavior_guard::config::BaselineConfig;
use behavior_guard::features::{FeatureVector, FEATURE_DIM};
use behavior_guard::risk::Thresholds;
use behavior_guard::sensors::{GeoLocation, SensorContext};
use behavior_guard::storage::{BaselineStore, MemoryStore};
use behavior_guard::transaction::{Transaction, TransactionType};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

fn ctx() -> SensorContext {
    SensorContext::at(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap())
}

fn learner() -> BaselineLearner {
    BaselineLearner::new(BaselineConfig::default())
}

fn known_user(mean: f64, variance: f64, confidence: f64) -> UserBaseline {
    UserBaseline {
        user_id: "u".into(),
        feature_baseline: vec![mean; FEATURE_DIM],
        feature_variance: vec![variance; FEATURE_DIM],
        location_patterns: Vec::new(),
        time_patterns: Vec::new(),
        transaction_patterns: TransactionPatterns::default(),
        confidence,
        sample_count: 200,
        last_updated: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

#[test]
fn first_observation_seeds_baseline() {
    let raw = FeatureVector::from_padded(vec![2.0; FEATURE_DIM]);
    let b = learner().update(None, "u", &raw, &ctx(), None);
    assert_eq!(b.sample_count, 1);
    assert_eq!(b.confidence, 0.1);
    assert_eq!(b.feature_baseline, vec![2.0; FEATURE_DIM]);
    assert!(b.feature_variance.iter().all(|v| *v == 0.1));
    assert_eq!(b.time_patterns.len(), 1);
}

#[test]
fn variance_uses_pre_update_mean() {
    let l = learner();
    let first = l.update(None, "u", &FeatureVector::zeros(), &ctx(), None);
    let ones = FeatureVector::from_padded(vec![1.0; FEATURE_DIM]);
    let second = l.update(Some(&first), "u", &ones, &ctx(), None);
    assert!((second.feature_baseline[0] - 0.1).abs() < 1e-12);
    // 0.1 * 0.9 + (1 - 0)^2 * 0.1
    assert!((second.feature_variance[0] - 0.19).abs() < 1e-12);
    assert!((second.confidence - 0.11).abs() < 1e-12);
}

#[test]
fn sample_count_caps_and_confidence_never_drops() {
    let config = BaselineConfig {
        max_samples: 3,
        ..BaselineConfig::default()
    };
    let l = BaselineLearner::new(config);
    let raw = FeatureVector::zeros();
    let mut b = l.update(None, "u", &raw, &ctx(), None);
    let mut last_confidence = b.confidence;
    for n in 2..=6u64 {
        b = l.update(Some(&b), "u", &raw, &ctx(), None);
        assert_eq!(b.sample_count, n.min(3));
        assert!(b.confidence >= last_confidence);
        last_confidence = b.confidence;
    }
}

#[test]
fn confidence_saturates_at_one() {
    let l = learner();
    let b = l.update(Some(&known_user(0.0, 1.0, 0.995)), "u", &FeatureVector::zeros(), &ctx(), None);
    assert_eq!(b.confidence, 1.0);
}

#[test]
fn wrong_dimension_baseline_is_reseeded() {
    let mut broken = known_user(0.0, 1.0, 0.9);
    broken.feature_baseline.truncate(10);
    let b = learner().update(Some(&broken), "u", &FeatureVector::zeros(), &ctx(), None);
    assert_eq!(b.sample_count, 1);
    assert_eq!(b.feature_baseline.len(), FEATURE_DIM);
}

#[test]
fn locations_and_transactions_are_remembered() {
    let l = learner();
    let mut context = ctx();
    context.location = Some(GeoLocation {
        latitude: 12.97,
        longitude: 77.59,
        accuracy: 10.0,
    });
    let tx = Transaction::new("t", 120.0, TransactionType::Transfer).with_location(28.61, 77.20);
    let b = l.update(None, "u", &FeatureVector::zeros(), &context, Some(&tx));
    // the transaction location wins over the device location
    assert_eq!(b.location_patterns.len(), 1);
    assert_eq!(b.location_patterns[0].latitude, 28.61);
    assert_eq!(b.transaction_patterns.typical_amounts, vec![120.0]);

    let b = l.update(Some(&b), "u", &FeatureVector::zeros(), &context, None);
    assert_eq!(b.location_patterns.len(), 2);
    assert!((b.transaction_patterns.frequency - 1.0 / 30.0).abs() < 1e-12);
}

#[test]
fn non_finite_locations_are_not_learned() {
    let l = learner();
    let mut context = ctx();
    context.location = Some(GeoLocation {
        latitude: 12.97,
        longitude: 77.59,
        accuracy: 10.0,
    });
    let tx = Transaction::new("t", 120.0, TransactionType::Transfer).with_location(f64::NAN, 77.20);
    // a broken transaction fix falls back to the device location
    let b = l.update(None, "u", &FeatureVector::zeros(), &context, Some(&tx));
    assert_eq!(b.location_patterns.len(), 1);
    assert_eq!(b.location_patterns[0].latitude, 12.97);

    context.location = Some(GeoLocation {
        latitude: f64::NAN,
        longitude: f64::INFINITY,
        accuracy: 0.0,
    });
    let b = l.update(Some(&b), "u", &FeatureVector::zeros(), &context, None);
    assert_eq!(b.location_patterns.len(), 1);
    assert_eq!(b.location_patterns[0].frequency, 1);
}

#[test]
fn low_confidence_reports_insufficient_data() {
    let raw = FeatureVector::from_padded(vec![1000.0; FEATURE_DIM]);
    let score = learner().anomaly_score(&raw, &known_user(0.0, 1.0, 0.29));
    assert_eq!(score.score, 0.0);
    assert_eq!(score.factors, vec!["Insufficient behavioral data".to_string()]);
}

#[test]
fn anomaly_averages_clipped_z_scores() {
    let mut values = vec![0.0; FEATURE_DIM];
    values[5] = 3.0;
    values[40] = 1.5;
    let raw = FeatureVector::from_padded(values);
    let score = learner().anomaly_score(&raw, &known_user(0.0, 1.0, 0.8));
    // (1.0 + 0.5) / 100
    assert!((score.score - 0.015).abs() < 1e-12);
    assert_eq!(score.factors, vec!["Unusual motion_5 (3.0σ)".to_string()]);
}

#[test]
fn zero_variance_features_are_skipped() {
    let mut baseline = known_user(0.0, 1.0, 0.8);
    for v in baseline.feature_variance.iter_mut().skip(1) {
        *v = 0.0;
    }
    let raw = FeatureVector::from_padded(vec![30.0; FEATURE_DIM]);
    let score = learner().anomaly_score(&raw, &baseline);
    assert_eq!(score.score, 1.0);
    assert_eq!(score.factors.len(), 1);
}

#[test]
fn adaptive_thresholds_follow_variance() {
    let l = learner();
    assert_eq!(l.adaptive_thresholds(None), Thresholds::default());
    assert_eq!(
        l.adaptive_thresholds(Some(&known_user(0.0, 4.0, 0.4))),
        Thresholds::default()
    );

    let wide = l.adaptive_thresholds(Some(&known_user(0.0, 4.0, 0.6)));
    assert!((wide.high - 1.8).abs() < 1e-12);
    assert!((wide.medium - 1.4).abs() < 1e-12);

    let tight = l.adaptive_thresholds(Some(&known_user(0.0, 0.01, 0.6)));
    assert!((tight.low - 0.15).abs() < 1e-12);
    assert!((tight.high - 0.45).abs() < 1e-12);

    let unit = l.adaptive_thresholds(Some(&known_user(0.0, 1.0, 0.6)));
    assert_eq!(unit, Thresholds::default());
}

#[test]
fn baseline_serialization_is_lossless() {
    let l = learner();
    let raw = FeatureVector::from_padded((0..FEATURE_DIM).map(|i| i as f64 / 7.0).collect());
    let b = l.update(None, "u", &raw, &ctx(), None);
    let b = l.update(Some(&b), "u", &FeatureVector::zeros(), &ctx(), None);
    let json = serde_json::to_string(&b).unwrap();
    let back: UserBaseline = serde_json::from_str(&json).unwrap();
    assert_eq!(back, b);
}

#[tokio::test]
async fn tracker_reports_previous_and_current() {
    let store = Arc::new(MemoryStore::new());
    let tracker = BaselineTracker::new(learner(), store.clone());
    let raw = FeatureVector::zeros();

    let first = tracker.observe("u", &raw, &ctx(), None).await;
    assert!(first.previous.is_none());
    assert_eq!(first.current.sample_count, 1);

    let second = tracker.observe("u", &raw, &ctx(), None).await;
    assert_eq!(second.previous.map(|b| b.sample_count), Some(1));
    assert_eq!(second.current.sample_count, 2);

    assert_eq!(tracker.get_baseline("u").await.map(|b| b.sample_count), Some(2));
    assert!(tracker.get_baseline("someone-else").await.is_none());

    tracker.reset("u").await.unwrap();
    assert!(tracker.get_baseline("u").await.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_observations_are_not_lost() {
    let store: Arc<dyn BaselineStore> = Arc::new(MemoryStore::new());
    let tracker = Arc::new(BaselineTracker::new(learner(), store));

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let tracker = Arc::clone(&tracker);
        tasks.push(tokio::spawn(async move {
            tracker
                .observe("u", &FeatureVector::zeros(), &ctx(), None)
                .await;
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    let b = tracker.get_baseline("u").await.unwrap();
    assert_eq!(b.sample_count, 32);
}

#[tokio::test]
async fn tracker_thresholds_use_stored_baseline() {
    let store = Arc::new(MemoryStore::new());
    store.save("u", &known_user(0.0, 4.0, 0.9)).await.unwrap();
    let tracker = BaselineTracker::new(learner(), store);
    let t = tracker.adaptive_thresholds("u").await;
    assert!((t.low - 0.6).abs() < 1e-12);
    assert_eq!(tracker.adaptive_thresholds("new").await, Thresholds::default());
}
