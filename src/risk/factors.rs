//! Context-derived risk factors, location risk, the heuristic fallback
//! probability and the per-label recommendations.

use super::engine::RiskLabel;
use crate::baseline::{distance_km, UserBaseline};
use crate::features::layout::index_of;
use crate::features::FeatureVector;
use crate::transaction::Transaction;
use chrono::Timelike;

pub const UNUSUAL_MOVEMENT: &str = "Unusual device movement detected";
pub const ATYPICAL_TOUCH: &str = "Atypical touch patterns detected";
pub const UNUSUAL_TIMING: &str = "Unusual timing patterns detected";
pub const UNUSUAL_LOCATION: &str = "Transaction from unusual location";
pub const HIGH_VALUE: &str = "High-value transaction";
pub const OUTSIDE_HOURS: &str = "Transaction outside normal hours";

pub const HIGH_VALUE_AMOUNT: f64 = 10_000.0;

const MOTION_LIMIT: f64 = 2.0;
const TOUCH_LIMIT: f64 = 0.8;
const TIMING_LIMIT_MS: f64 = 5000.0;
const LOCATION_FACTOR_RISK: f64 = 0.6;

fn named(features: &FeatureVector, name: &str) -> f64 {
    index_of(name).map(|i| features.get(i)).unwrap_or(0.0)
}

/// Risk of `(latitude, longitude)` given the user's known locations.
/// `None` while the user has no location history or the fix is not finite.
pub fn location_risk(baseline: &UserBaseline, latitude: f64, longitude: f64) -> Option<f64> {
    if !(latitude.is_finite() && longitude.is_finite()) {
        return None;
    }
    let nearest = baseline
        .location_patterns
        .iter()
        .map(|p| distance_km(p.latitude, p.longitude, latitude, longitude))
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))?;
    let risk = if nearest > 100.0 {
        0.8
    } else if nearest > 50.0 {
        0.6
    } else if nearest > 10.0 {
        0.4
    } else {
        0.1
    };
    Some(risk)
}

/// Factors read off the scaled vector and the transaction itself.
pub fn context_factors(
    features: &FeatureVector,
    tx: Option<&Transaction>,
    location_risk: Option<f64>,
) -> Vec<String> {
    let mut factors = Vec::new();

    let moving = ["accelMeanX", "accelMeanY", "accelMeanZ"]
        .iter()
        .any(|n| named(features, n).abs() > MOTION_LIMIT);
    if moving {
        factors.push(UNUSUAL_MOVEMENT.to_string());
    }
    if named(features, "touchPressureMean") > TOUCH_LIMIT
        || named(features, "touchPressureStd") > TOUCH_LIMIT
    {
        factors.push(ATYPICAL_TOUCH.to_string());
    }
    if named(features, "touchDurationMean") > TIMING_LIMIT_MS
        || named(features, "touchDurationStd") > TIMING_LIMIT_MS
    {
        factors.push(UNUSUAL_TIMING.to_string());
    }
    if location_risk.is_some_and(|r| r > LOCATION_FACTOR_RISK) {
        factors.push(UNUSUAL_LOCATION.to_string());
    }
    if let Some(tx) = tx {
        if tx.amount > HIGH_VALUE_AMOUNT {
            factors.push(HIGH_VALUE.to_string());
        }
        let hour = tx.timestamp.hour();
        if !(6..=22).contains(&hour) {
            factors.push(OUTSIDE_HOURS.to_string());
        }
    }
    factors
}

/// Model stand-in built from motion, touch and location magnitudes. Always in [0, 1].
pub fn heuristic_probability(
    features: &FeatureVector,
    tx: Option<&Transaction>,
    location_risk: Option<f64>,
) -> f64 {
    let sum_abs = |names: &[&str]| names.iter().map(|n| named(features, n).abs()).sum::<f64>();
    let motion = sum_abs(&["accelMeanX", "accelMeanY", "accelMeanZ"]);
    let touch = sum_abs(&["touchPressureMean", "touchPressureStd", "touchPressureMax"]);
    let timing = sum_abs(&["touchDurationMean", "touchDurationStd", "touchDurationMax"]);
    let location = sum_abs(&["locationSpeed", "locationDistance", "locationVariance"]);

    let mut risk = (motion + touch + timing + location) / 20.0;
    if let Some(tx) = tx {
        if tx.amount > HIGH_VALUE_AMOUNT {
            risk *= 1.2;
        }
        if let Some(lr) = location_risk {
            risk = risk.max(lr);
        }
    }
    if risk.is_finite() {
        risk.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub fn recommendations(label: RiskLabel, factors: &[String]) -> Vec<String> {
    let mut out: Vec<String> = match label {
        RiskLabel::Low => vec![
            "Transaction appears normal".into(),
            "Continue with standard security measures".into(),
        ],
        RiskLabel::Medium => vec![
            "Additional authentication required".into(),
            "Verify transaction details carefully".into(),
        ],
        RiskLabel::High => vec![
            "Transaction blocked due to high risk".into(),
            "Contact customer support immediately".into(),
            "Review recent account activity".into(),
        ],
    };
    if label == RiskLabel::Medium && factors.iter().any(|f| f == UNUSUAL_LOCATION) {
        out.push("Confirm your current location".into());
    }
    out
}
