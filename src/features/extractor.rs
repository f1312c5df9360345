//! Sensor snapshot + context + optional transaction → canonical feature vector.

use super::layout::{FEATURE_NAMES, MOTION};
use super::FeatureVector;
use crate::baseline::TransactionPatterns;
use crate::sensors::{SensorContext, SensorSnapshot};
use crate::transaction::Transaction;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

const TOUCH_CHANNELS: [&str; 3] = ["Pressure", "Duration", "Area"];
const TOUCH_STATS: [&str; 10] = [
    "Mean", "Std", "Max", "Min", "Median", "Variance", "Skewness", "Kurtosis", "Range", "Iqr",
];

/// Stateless; every call is a pure function of its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(
        &self,
        snapshot: &SensorSnapshot,
        context: &SensorContext,
        tx: Option<&Transaction>,
    ) -> FeatureVector {
        self.extract_with_history(snapshot, context, tx, None)
    }

    /// As [`extract`](Self::extract), filling the historical transaction slots
    /// from the user's learned transaction patterns.
    pub fn extract_with_history(
        &self,
        snapshot: &SensorSnapshot,
        context: &SensorContext,
        tx: Option<&Transaction>,
        history: Option<&TransactionPatterns>,
    ) -> FeatureVector {
        let v = |key: &str| -> f64 {
            snapshot
                .get(key)
                .copied()
                .filter(|x| x.is_finite())
                .unwrap_or(0.0)
        };

        let mut raw = Vec::with_capacity(FEATURE_NAMES.len());

        // motion (30)
        raw.extend(FEATURE_NAMES[MOTION].iter().map(|name| v(*name)));

        // touch (30): variance and range fall back to values derivable from std / extremes
        for channel in TOUCH_CHANNELS {
            let stat = |s: &str| v(format!("touch{channel}{s}").as_str());
            for s in TOUCH_STATS {
                let value = match s {
                    "Variance" if !snapshot.contains_key(&format!("touch{channel}Variance")) => {
                        stat("Std").powi(2)
                    }
                    "Range" if !snapshot.contains_key(&format!("touch{channel}Range")) => {
                        (stat("Max") - stat("Min")).max(0.0)
                    }
                    _ => stat(s),
                };
                raw.push(value);
            }
        }

        // location & time (15)
        let (lat, lng, accuracy) = match context.location {
            Some(loc) => (loc.latitude, loc.longitude, loc.accuracy),
            None => (v("locationLat"), v("locationLng"), v("locationAccuracy")),
        };
        raw.extend([
            lat,
            lng,
            accuracy,
            v("locationSpeed"),
            v("locationAltitude"),
            v("locationDistance"),
            v("locationBearing"),
            v("locationVariance"),
            v("locationConsistency"),
        ]);
        raw.extend(calendar(&context.timestamp));

        // transaction (15)
        let amount = tx.map(|t| t.amount).filter(|a| a.is_finite()).unwrap_or(0.0);
        let when = tx.map(|t| t.timestamp).unwrap_or(context.timestamp);
        let stats = history.map(TransactionPatterns::amount_stats).unwrap_or_default();
        let amount_deviation = if stats.std > 0.0 && amount > 0.0 {
            (amount - stats.mean) / stats.std
        } else {
            0.0
        };
        raw.extend([
            amount,
            if amount > 0.0 { amount.abs().ln_1p() } else { 0.0 },
            tx.map(|t| t.tx_type.code()).unwrap_or(0.0),
            tx.map(|t| t.status.code()).unwrap_or(0.0),
            history.map(|h| h.frequency).unwrap_or(0.0),
            stats.mean,
            stats.std,
            stats.max,
            stats.min,
            when.hour() as f64,
            when.weekday().num_days_from_sunday() as f64,
            history
                .map(|h| h.hour_distance(when.hour()))
                .unwrap_or(0.0),
            amount_deviation,
            v("merchantCategory"),
            v("riskHistory"),
        ]);

        // device usage (5)
        raw.extend([
            if context.battery_level.is_finite() {
                context.battery_level
            } else {
                0.0
            },
            context.network_type.code(),
            context.orientation.code(),
            v("deviceBrightness"),
            v("deviceVolume"),
        ]);

        // behavioral (5)
        raw.extend([
            v("loginAttempts"),
            v("navigationActions"),
            v("keyboardStrokes"),
            v("biometricAttempts"),
            v("biometricFailures"),
        ]);

        FeatureVector::from_padded(raw)
    }
}

fn calendar(ts: &DateTime<Utc>) -> [f64; 6] {
    let weekend = matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
    [
        ts.hour() as f64,
        ts.weekday().num_days_from_sunday() as f64,
        ts.day() as f64,
        ts.month() as f64,
        ts.minute() as f64,
        if weekend { 1.0 } else { 0.0 },
    ]
}
