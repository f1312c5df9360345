//! Scaler benchmark: positional and named transforms before inference.

use behavior_guard::features::{FeatureScaler, ScalerParams, FEATURE_DIM, FEATURE_NAMES};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;

fn scaler() -> FeatureScaler {
    let mut params = ScalerParams::identity();
    for i in 0..FEATURE_DIM {
        params.mean[i] = i as f64 * 0.5;
        params.scale[i] = 1.0 / (1.0 + i as f64);
    }
    FeatureScaler::new(params).unwrap()
}

fn bench_transform_vector(c: &mut Criterion) {
    let s = scaler();
    let input: Vec<f64> = (0..FEATURE_DIM).map(|i| i as f64).collect();
    c.bench_function("scaler_transform_vector", |b| {
        b.iter(|| black_box(s.transform_vector(black_box(&input))).unwrap())
    });
}

fn bench_transform_named(c: &mut Criterion) {
    let s = scaler();
    let named: HashMap<String, f64> = FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(i, n)| (n.to_string(), i as f64))
        .collect();
    c.bench_function("scaler_transform_named", |b| {
        b.iter(|| black_box(s.transform(black_box(&named))))
    });
}

criterion_group!(benches, bench_transform_vector, bench_transform_named);
criterion_main!(benches);
