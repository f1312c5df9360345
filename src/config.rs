//! Engine configuration. Every section has defaults so a partial (or absent)
//! JSON file yields a working engine.

use crate::error::{GuardError, Result};
use crate::risk::{FallbackPolicy, ThresholdPolicy, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Data directory (encrypted baseline store)
    pub data_dir: PathBuf,
    /// Path to the ONNX fraud classifier
    pub model_path: PathBuf,
    /// Exported standard-scaler JSON; identity scaler when unset
    pub scaler_path: Option<PathBuf>,
    /// Environment variable holding the store secret
    pub store_secret_env: String,
    pub monitoring: MonitoringConfig,
    pub baseline: BaselineConfig,
    pub risk: RiskConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Background sampling cadence
    pub interval_ms: u64,
    /// Upper bound on a single model call
    pub model_timeout_ms: u64,
    /// Model calls allowed in flight at once, timed-out ones included
    pub max_pending_inferences: usize,
    /// User monitored by the daemon binary
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// EMA learning rate (alpha)
    pub learning_rate: f64,
    /// Cap on the retained sample count
    pub max_samples: u64,
    pub initial_variance: f64,
    pub initial_confidence: f64,
    /// Confidence gained per observation
    pub confidence_step: f64,
    /// Below this confidence anomaly scoring reports insufficient data
    pub min_anomaly_confidence: f64,
    /// Below this confidence adaptive thresholds fall back to defaults
    pub min_adaptive_confidence: f64,
    /// z-score above which a feature is reported as a factor
    pub factor_sigma: f64,
    /// Locations closer than this merge into one pattern
    pub location_merge_km: f64,
    pub max_location_patterns: usize,
    pub max_time_patterns: usize,
    pub max_transaction_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub model_weight: f64,
    pub anomaly_weight: f64,
    /// HIGH is downgraded to MEDIUM while fewer prior scores than this exist
    pub cold_start_min_history: usize,
    /// Retained blended scores per user
    pub history_capacity: usize,
    /// Thresholds for background monitoring ticks
    pub monitoring_thresholds: ThresholdPolicy,
    /// Thresholds for explicit transaction evaluation
    pub transaction_thresholds: ThresholdPolicy,
    /// Model probability used when inference fails or times out
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .map(|d| d.join("behavior-guard"))
                .unwrap_or_else(|| PathBuf::from(".behavior-guard")),
            model_path: PathBuf::from("model.onnx"),
            scaler_path: None,
            store_secret_env: "BEHAVIOR_GUARD_SECRET".to_string(),
            monitoring: MonitoringConfig::default(),
            baseline: BaselineConfig::default(),
            risk: RiskConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            model_timeout_ms: 500,
            max_pending_inferences: 4,
            user_id: "anonymous".to_string(),
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_samples: 1000,
            initial_variance: 0.1,
            initial_confidence: 0.1,
            confidence_step: 0.01,
            min_anomaly_confidence: 0.3,
            min_adaptive_confidence: 0.5,
            factor_sigma: 2.0,
            location_merge_km: 0.1,
            max_location_patterns: 20,
            max_time_patterns: 50,
            max_transaction_samples: 100,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            model_weight: 0.7,
            anomaly_weight: 0.3,
            cold_start_min_history: 5,
            history_capacity: 200,
            monitoring_thresholds: ThresholdPolicy::Fixed(Thresholds::default()),
            transaction_thresholds: ThresholdPolicy::Adaptive,
            fallback: FallbackPolicy::Zero,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl MonitoringConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms.max(1))
    }
}

impl GuardConfig {
    /// Load from a JSON file. A missing file yields defaults; an unreadable or
    /// malformed one is an error for the caller to report.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| GuardError::Config(format!("{}: {e}", path.display())))
    }
}
