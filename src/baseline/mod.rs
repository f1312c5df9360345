//! Per-user behavioral baseline: EMA mean/variance over the raw feature vector,
//! bounded location / time-of-week / transaction histories, and the
//! anomaly scoring and adaptive thresholds derived from them.

mod learner;
mod patterns;
mod tracker;

pub use learner::{AnomalyScore, BaselineLearner};
pub use patterns::{distance_km, AmountStats, LocationPattern, TimePattern, TransactionPatterns};
pub use tracker::{BaselineTracker, Observation};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Learned statistics for one user. Owned by that user id; replaced as a
/// whole on every observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBaseline {
    pub user_id: String,
    /// EMA mean per feature index
    pub feature_baseline: Vec<f64>,
    /// EMA variance per feature index
    pub feature_variance: Vec<f64>,
    pub location_patterns: Vec<LocationPattern>,
    pub time_patterns: Vec<TimePattern>,
    pub transaction_patterns: TransactionPatterns,
    /// 0..=1, how well the user is known
    pub confidence: f64,
    pub sample_count: u64,
    pub last_updated: DateTime<Utc>,
}

impl UserBaseline {
    pub fn mean_variance(&self) -> f64 {
        if self.feature_variance.is_empty() {
            return 0.0;
        }
        self.feature_variance.iter().sum::<f64>() / self.feature_variance.len() as f64
    }
}
