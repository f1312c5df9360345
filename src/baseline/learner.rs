//! Pure baseline arithmetic: EMA update, z-score anomaly, adaptive thresholds.

use super::patterns::{merge_location, merge_time, TransactionPatterns};
use super::UserBaseline;
use crate::config::BaselineConfig;
use crate::features::layout::{display_name, FEATURE_DIM};
use crate::features::FeatureVector;
use crate::risk::Thresholds;
use crate::sensors::SensorContext;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

pub const INSUFFICIENT_DATA: &str = "Insufficient behavioral data";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnomalyScore {
    /// Mean clipped z-distance, 0..=1
    pub score: f64,
    pub factors: Vec<String>,
}

impl AnomalyScore {
    pub fn insufficient() -> Self {
        Self {
            score: 0.0,
            factors: vec![INSUFFICIENT_DATA.to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct BaselineLearner {
    config: BaselineConfig,
}

impl BaselineLearner {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Fold one raw observation into `existing`, or seed a new baseline from it.
    pub fn update(
        &self,
        existing: Option<&UserBaseline>,
        user_id: &str,
        raw: &FeatureVector,
        context: &SensorContext,
        tx: Option<&Transaction>,
    ) -> UserBaseline {
        let c = &self.config;
        let at = context.timestamp;

        let mut next = match existing {
            Some(prev)
                if prev.feature_baseline.len() == FEATURE_DIM
                    && prev.feature_variance.len() == FEATURE_DIM =>
            {
                let alpha = c.learning_rate;
                let x = raw.as_slice();
                // variance is measured against the pre-update mean
                let feature_variance = prev
                    .feature_variance
                    .iter()
                    .zip(&prev.feature_baseline)
                    .zip(x)
                    .map(|((var, mean), xi)| var * (1.0 - alpha) + (xi - mean).powi(2) * alpha)
                    .collect();
                let feature_baseline = prev
                    .feature_baseline
                    .iter()
                    .zip(x)
                    .map(|(mean, xi)| mean * (1.0 - alpha) + xi * alpha)
                    .collect();
                UserBaseline {
                    user_id: user_id.to_string(),
                    feature_baseline,
                    feature_variance,
                    location_patterns: prev.location_patterns.clone(),
                    time_patterns: prev.time_patterns.clone(),
                    transaction_patterns: prev.transaction_patterns.clone(),
                    confidence: (prev.confidence + c.confidence_step).min(1.0),
                    sample_count: (prev.sample_count + 1).min(c.max_samples),
                    last_updated: at,
                }
            }
            Some(_) => {
                tracing::warn!(user_id, "stored baseline has wrong dimensions; reseeding");
                self.seed(user_id, raw, at)
            }
            None => self.seed(user_id, raw, at),
        };

        // a NaN fix would not survive a JSON round trip
        let finite = |&(lat, lng): &(f64, f64)| lat.is_finite() && lng.is_finite();
        let location = tx
            .and_then(|t| t.location.as_ref().map(|l| (l.latitude, l.longitude)))
            .filter(finite)
            .or_else(|| context.location.map(|l| (l.latitude, l.longitude)).filter(finite));
        if let Some((lat, lng)) = location {
            merge_location(
                &mut next.location_patterns,
                lat,
                lng,
                at,
                c.location_merge_km,
                c.max_location_patterns,
            );
        }
        merge_time(&mut next.time_patterns, at, c.max_time_patterns);
        if let Some(tx) = tx {
            next.transaction_patterns.record(tx, c.max_transaction_samples);
        }
        next
    }

    fn seed(&self, user_id: &str, raw: &FeatureVector, at: chrono::DateTime<chrono::Utc>) -> UserBaseline {
        UserBaseline {
            user_id: user_id.to_string(),
            feature_baseline: raw.as_slice().to_vec(),
            feature_variance: vec![self.config.initial_variance; FEATURE_DIM],
            location_patterns: Vec::new(),
            time_patterns: Vec::new(),
            transaction_patterns: TransactionPatterns::default(),
            confidence: self.config.initial_confidence,
            sample_count: 1,
            last_updated: at,
        }
    }

    /// Average clipped z-distance of `raw` from the baseline, over features
    /// with non-zero variance.
    pub fn anomaly_score(&self, raw: &FeatureVector, baseline: &UserBaseline) -> AnomalyScore {
        if baseline.confidence < self.config.min_anomaly_confidence {
            return AnomalyScore::insufficient();
        }

        let mut factors = Vec::new();
        let mut total = 0.0;
        let mut counted = 0usize;

        let stats = baseline.feature_baseline.iter().zip(&baseline.feature_variance);
        for (i, (x, (mean, var))) in raw.as_slice().iter().zip(stats).enumerate() {
            if *var <= 0.0 || !var.is_finite() {
                continue;
            }
            let z = (x - mean).abs() / var.sqrt();
            total += (z / 3.0).clamp(0.0, 1.0);
            counted += 1;
            if z > self.config.factor_sigma {
                factors.push(format!("Unusual {} ({:.1}σ)", display_name(i), z));
            }
        }

        let score = if counted > 0 { total / counted as f64 } else { 0.0 };
        AnomalyScore { score, factors }
    }

    /// Defaults for unknown or low-confidence users; otherwise the defaults
    /// scaled by the mean feature variance, clamped to [0.5, 2.0].
    pub fn adaptive_thresholds(&self, baseline: Option<&UserBaseline>) -> Thresholds {
        match baseline {
            Some(b) if b.confidence >= self.config.min_adaptive_confidence => {
                let v = b.mean_variance();
                let factor = if v.is_nan() { 2.0 } else { v.clamp(0.5, 2.0) };
                Thresholds::default().scaled(factor)
            }
            _ => Thresholds::default(),
        }
    }
}
