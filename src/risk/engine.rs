//! Blends model probability with the baseline anomaly score and classifies
//! the result against a threshold set.

use super::factors::recommendations;
use crate::baseline::AnomalyScore;
use crate::config::RiskConfig;
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

const CONSISTENCY_WINDOW: usize = 10;

pub const UNABLE_TO_ASSESS: &str = "Unable to assess risk - proceeding with caution";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "LOW",
            RiskLabel::Medium => "MEDIUM",
            RiskLabel::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.7,
            high: 0.9,
        }
    }
}

impl Thresholds {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            low: self.low * factor,
            medium: self.medium * factor,
            high: self.high * factor,
        }
    }

    /// Boundaries are inclusive: a score equal to `medium` is MEDIUM.
    pub fn classify(&self, score: f64) -> RiskLabel {
        if score >= self.high {
            RiskLabel::High
        } else if score >= self.medium {
            RiskLabel::Medium
        } else {
            RiskLabel::Low
        }
    }
}

/// Where a call site takes its thresholds from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    Fixed(Thresholds),
    /// Derived from the user's baseline variance
    Adaptive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_label: RiskLabel,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub requires_additional_auth: bool,
    pub should_block: bool,
}

impl RiskAssessment {
    /// Returned when an evaluation cannot complete; never blocks the user.
    pub fn unassessed() -> Self {
        Self {
            risk_score: 0.0,
            risk_label: RiskLabel::Low,
            confidence: 0.0,
            factors: Vec::new(),
            recommendations: vec![UNABLE_TO_ASSESS.to_string()],
            requires_additional_auth: false,
            should_block: false,
        }
    }
}

/// Everything one blend needs. `history` holds prior blended scores only.
pub struct BlendInput<'a> {
    pub model_score: f64,
    pub anomaly: &'a AnomalyScore,
    pub thresholds: Thresholds,
    pub history: &'a [f64],
    /// Scaled feature vector that was fed to the model
    pub features: &'a FeatureVector,
    pub context_factors: Vec<String>,
}

pub struct RiskBlender {
    config: RiskConfig,
}

impl RiskBlender {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn blended_score(&self, model_score: f64, anomaly_score: f64) -> f64 {
        model_score * self.config.model_weight + anomaly_score * self.config.anomaly_weight
    }

    pub fn blend(&self, input: BlendInput<'_>) -> RiskAssessment {
        let p = sanitize(input.model_score);
        let a = sanitize(input.anomaly.score);
        let risk_score = self.blended_score(p, a);

        let mut risk_label = input.thresholds.classify(risk_score);
        if risk_label == RiskLabel::High && input.history.len() < self.config.cold_start_min_history {
            tracing::debug!(
                history = input.history.len(),
                score = risk_score,
                "cold start: HIGH downgraded to MEDIUM"
            );
            risk_label = RiskLabel::Medium;
        }

        let mut factors = input.context_factors;
        factors.extend(input.anomaly.factors.iter().cloned());
        let recommendations = recommendations(risk_label, &factors);

        RiskAssessment {
            risk_score,
            risk_label,
            confidence: confidence(input.features, input.history, risk_score),
            factors,
            recommendations,
            requires_additional_auth: risk_label == RiskLabel::Medium,
            should_block: risk_label == RiskLabel::High,
        }
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Signal quality of the vector averaged with the stability of recent scores.
fn confidence(features: &FeatureVector, history: &[f64], current: f64) -> f64 {
    let consistency = if history.is_empty() {
        0.5
    } else {
        let start = history.len().saturating_sub(CONSISTENCY_WINDOW - 1);
        let mut window = history[start..].to_vec();
        window.push(current);
        1.0 - std_dev(&window)
    };
    ((features.signal_fraction() + consistency) / 2.0).clamp(0.0, 1.0)
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
