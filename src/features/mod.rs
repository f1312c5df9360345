//! Feature extraction: sensors + context + transaction → fixed 100-slot vector,
//! and the standardization transform applied before model inference.

pub mod layout;
mod extractor;
mod scaler;

pub use extractor::FeatureExtractor;
pub use layout::{Section, FEATURE_DIM, FEATURE_NAMES};
pub use scaler::{FeatureScaler, ScalerParams};

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};

/// Exactly [`FEATURE_DIM`] finite values. The length is fixed at construction,
/// so downstream consumers never re-validate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn zeros() -> Self {
        Self {
            values: vec![0.0; FEATURE_DIM],
        }
    }

    /// Pad with zeros or truncate to [`FEATURE_DIM`]; non-finite entries become 0.
    pub fn from_padded(raw: Vec<f64>) -> Self {
        let mut values = vec![0.0; FEATURE_DIM];
        let copy = raw.len().min(FEATURE_DIM);
        values[..copy].copy_from_slice(&raw[..copy]);
        for v in values.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        Self { values }
    }

    /// Strict constructor for caller-supplied vectors.
    pub fn from_exact(raw: &[f64]) -> Result<Self> {
        if raw.len() != FEATURE_DIM {
            return Err(GuardError::InvalidVectorLength {
                expected: FEATURE_DIM,
                actual: raw.len(),
            });
        }
        Ok(Self::from_padded(raw.to_vec()))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    pub fn section(&self, section: Section) -> &[f64] {
        &self.values[section.range()]
    }

    /// Fraction of entries that carry signal (non-zero and finite).
    pub fn signal_fraction(&self) -> f64 {
        let live = self
            .values
            .iter()
            .filter(|v| **v != 0.0 && v.is_finite())
            .count();
        live as f64 / FEATURE_DIM as f64
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = GuardError;

    fn try_from(raw: Vec<f64>) -> Result<Self> {
        Self::from_exact(&raw)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.values
    }
}
