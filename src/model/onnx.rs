//! ONNX Runtime backend. Input: `[1, 100]` or `[1, 1, 100]` f32, output: fraud probability.

use crate::error::ModelError;
use crate::features::FEATURE_DIM;
use ndarray::{Array2, Array3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Value, ValueType};
use std::path::Path;
use std::sync::Mutex;

fn runtime(e: impl std::fmt::Display) -> ModelError {
    ModelError::Runtime(e.to_string())
}

pub struct OnnxModel {
    // `Session::run` needs exclusive access
    session: Mutex<Session>,
    output_name: String,
    input_rank: usize,
}

impl OnnxModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?
            .commit_from_file(path)
            .map_err(runtime)?;

        let input_rank = match session.inputs.first().map(|i| &i.input_type) {
            Some(ValueType::Tensor { shape, .. }) => shape.len(),
            _ => 2,
        };
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or(ModelError::InvalidOutput)?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            input_rank,
        })
    }

    pub fn input_rank(&self) -> usize {
        self.input_rank
    }

    /// First element of the first output, clamped to [0, 1].
    pub fn predict(&self, features: &[f32]) -> Result<f32, ModelError> {
        let mut row = vec![0.0f32; FEATURE_DIM];
        let n = features.len().min(FEATURE_DIM);
        row[..n].copy_from_slice(&features[..n]);

        let input = if self.input_rank >= 3 {
            let arr = Array3::from_shape_vec((1, 1, FEATURE_DIM), row).map_err(runtime)?;
            Value::from_array(arr).map_err(runtime)?.into_dyn()
        } else {
            let arr = Array2::from_shape_vec((1, FEATURE_DIM), row).map_err(runtime)?;
            Value::from_array(arr).map_err(runtime)?.into_dyn()
        };

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Runtime("session lock poisoned".into()))?;
        let outputs = session.run(ort::inputs![input]).map_err(runtime)?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or(ModelError::InvalidOutput)?;
        let (_, data) = output.try_extract_tensor::<f32>().map_err(runtime)?;
        let score = data.first().copied().ok_or(ModelError::InvalidOutput)?;
        if !score.is_finite() {
            return Err(ModelError::InvalidOutput);
        }
        Ok(score.clamp(0.0, 1.0))
    }
}
