//! Baseline benchmark: EMA update and anomaly scoring for an established user.

use behavior_guard::baseline::{BaselineLearner, UserBaseline};
use behavior_guard::config::BaselineConfig;
use behavior_guard::features::{FeatureExtractor, FeatureVector};
use behavior_guard::sensors::{SensorSource, SignalProfile, SimulatedSensors};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn warm_baseline(learner: &BaselineLearner, sensors: &SimulatedSensors) -> (UserBaseline, FeatureVector) {
    let extractor = FeatureExtractor::new();
    let sample = || {
        let context = sensors.context().unwrap();
        (extractor.extract(&sensors.snapshot().unwrap(), &context, None), context)
    };
    let (mut last, context) = sample();
    let mut baseline = learner.update(None, "bench", &last, &context, None);
    for _ in 1..60 {
        let (raw, context) = sample();
        baseline = learner.update(Some(&baseline), "bench", &raw, &context, None);
        last = raw;
    }
    (baseline, last)
}

fn bench_update(c: &mut Criterion) {
    let learner = BaselineLearner::new(BaselineConfig::default());
    let sensors = SimulatedSensors::new(SignalProfile::Legitimate, Some(11));
    let (baseline, raw) = warm_baseline(&learner, &sensors);
    let context = sensors.context().unwrap();

    c.bench_function("baseline_update", |b| {
        b.iter(|| black_box(learner.update(Some(&baseline), "bench", black_box(&raw), &context, None)))
    });
}

fn bench_anomaly(c: &mut Criterion) {
    let learner = BaselineLearner::new(BaselineConfig::default());
    let sensors = SimulatedSensors::new(SignalProfile::Legitimate, Some(12));
    let (baseline, _) = warm_baseline(&learner, &sensors);
    sensors.set_profile(SignalProfile::Fraudulent);
    let raw = FeatureExtractor::new().extract(&sensors.snapshot().unwrap(), &sensors.context().unwrap(), None);

    c.bench_function("baseline_anomaly_score", |b| {
        b.iter(|| black_box(learner.anomaly_score(black_box(&raw), &baseline)))
    });
}

criterion_group!(benches, bench_update, bench_anomaly);
criterion_main!(benches);
