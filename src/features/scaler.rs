//! Standard-scaler runtime: `(x - mean[i]) * scale[i]`, where `scale` is the
//! reciprocal of the training standard deviation.

use super::layout::{FEATURE_DIM, FEATURE_NAMES};
use super::FeatureVector;
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Exported scaler parameters (`{"mean": [...], "scale": [...], "featureOrder": [...]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub feature_order: Vec<String>,
}

impl ScalerParams {
    /// mean 0, scale 1, canonical feature order.
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; FEATURE_DIM],
            scale: vec![1.0; FEATURE_DIM],
            feature_order: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureScaler {
    params: ScalerParams,
}

impl FeatureScaler {
    pub fn new(params: ScalerParams) -> Result<Self> {
        if params.mean.len() != FEATURE_DIM || params.scale.len() != FEATURE_DIM {
            return Err(GuardError::InvalidScaler(format!(
                "scaler must contain {FEATURE_DIM} features (mean: {}, scale: {})",
                params.mean.len(),
                params.scale.len()
            )));
        }
        if params.feature_order.len() != FEATURE_DIM {
            return Err(GuardError::InvalidScaler(format!(
                "featureOrder must name {FEATURE_DIM} features, found {}",
                params.feature_order.len()
            )));
        }
        if params.scale.iter().any(|s| *s == 0.0) {
            tracing::warn!("scaler has zero scale entries; those features transform to 0");
        }
        Ok(Self { params })
    }

    pub fn identity() -> Self {
        Self {
            params: ScalerParams::identity(),
        }
    }

    /// Load exported parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let params: ScalerParams = serde_json::from_str(&data)
            .map_err(|e| GuardError::InvalidScaler(format!("{}: {e}", path.display())))?;
        Self::new(params)
    }

    pub fn feature_order(&self) -> &[String] {
        &self.params.feature_order
    }

    /// Look features up by `featureOrder[i]` (missing names → 0) and standardize.
    pub fn transform(&self, named: &HashMap<String, f64>) -> FeatureVector {
        FeatureVector::from_padded(
            self.order(named)
                .into_iter()
                .enumerate()
                .map(|(i, x)| self.apply(i, x))
                .collect(),
        )
    }

    /// Positional transform of an already-ordered vector.
    pub fn transform_vector(&self, vector: &[f64]) -> Result<FeatureVector> {
        if vector.len() != FEATURE_DIM {
            return Err(GuardError::InvalidVectorLength {
                expected: FEATURE_DIM,
                actual: vector.len(),
            });
        }
        Ok(FeatureVector::from_padded(
            vector
                .iter()
                .enumerate()
                .map(|(i, x)| self.apply(i, *x))
                .collect(),
        ))
    }

    /// Raw (unscaled) vector in `featureOrder`, missing names → 0.
    pub fn order(&self, named: &HashMap<String, f64>) -> Vec<f64> {
        self.params
            .feature_order
            .iter()
            .map(|name| named.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    fn apply(&self, i: usize, x: f64) -> f64 {
        (x - self.params.mean[i]) * self.params.scale[i]
    }
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self::identity()
    }
}
