//! Fraud-probability collaborator. The loaded flavor is resolved once, at load time.

mod onnx;

pub use onnx::OnnxModel;

use crate::error::ModelError;
use std::path::Path;

pub trait RiskModel: Send + Sync {
    /// Probability in [0, 1] that the (scaled) vector is fraudulent.
    fn predict(&self, features: &[f32]) -> Result<f32, ModelError>;

    fn is_available(&self) -> bool {
        true
    }
}

pub enum FraudModel {
    /// Feed-forward classifier over a `[1, 100]` input
    Dense(OnnxModel),
    /// Sequence classifier over a `[1, 1, 100]` input
    Sequence(OnnxModel),
    Unavailable,
}

impl FraudModel {
    /// A missing file yields `Unavailable`; a present but unloadable file is an error.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "fraud model not found; scoring without model");
            return Ok(FraudModel::Unavailable);
        }
        let model = OnnxModel::load(path)?;
        let flavor = if model.input_rank() >= 3 {
            FraudModel::Sequence(model)
        } else {
            FraudModel::Dense(model)
        };
        tracing::info!(path = %path.display(), kind = flavor.kind(), "fraud model loaded");
        Ok(flavor)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FraudModel::Dense(_) => "dense",
            FraudModel::Sequence(_) => "sequence",
            FraudModel::Unavailable => "unavailable",
        }
    }
}

impl RiskModel for FraudModel {
    fn predict(&self, features: &[f32]) -> Result<f32, ModelError> {
        match self {
            FraudModel::Dense(m) | FraudModel::Sequence(m) => m.predict(features),
            FraudModel::Unavailable => Err(ModelError::Unavailable),
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self, FraudModel::Unavailable)
    }
}
