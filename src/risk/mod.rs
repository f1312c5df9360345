//! Risk blending, classification and the explanation attached to each result.

mod engine;
pub mod factors;
mod history;

pub use engine::{
    BlendInput, RiskAssessment, RiskBlender, RiskLabel, ThresholdPolicy, Thresholds,
    UNABLE_TO_ASSESS,
};
pub use history::RiskHistory;

use serde::{Deserialize, Serialize};

/// Model probability used when inference fails, times out or no model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Zero,
    Heuristic,
}

/// Observable progress of the most recent evaluation for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPhase {
    #[default]
    Idle,
    Scoring,
    Classified,
}
