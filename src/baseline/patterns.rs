//! Bounded pattern histories kept alongside the feature statistics.

use crate::transaction::Transaction;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPattern {
    pub latitude: f64,
    pub longitude: f64,
    pub frequency: u32,
    pub last_seen: DateTime<Utc>,
    pub risk_score: f64,
}

/// Hour-of-day x day-of-week bucket (`day_of_week`: 0 = Sunday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePattern {
    pub hour: u32,
    pub day_of_week: u32,
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionPatterns {
    pub typical_amounts: Vec<f64>,
    pub typical_hours: Vec<u32>,
    pub typical_days: Vec<u32>,
    /// Estimated transactions per day
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AmountStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

/// Great-circle distance in kilometres.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

fn keep_last<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let overflow = items.len() - cap;
        items.drain(..overflow);
    }
}

pub(crate) fn merge_location(
    patterns: &mut Vec<LocationPattern>,
    latitude: f64,
    longitude: f64,
    at: DateTime<Utc>,
    merge_km: f64,
    cap: usize,
) {
    let nearby = patterns
        .iter_mut()
        .find(|p| distance_km(p.latitude, p.longitude, latitude, longitude) < merge_km);
    match nearby {
        Some(p) => {
            p.frequency += 1;
            p.last_seen = at;
        }
        None => patterns.push(LocationPattern {
            latitude,
            longitude,
            frequency: 1,
            last_seen: at,
            risk_score: 0.0,
        }),
    }
    keep_last(patterns, cap);
}

pub(crate) fn merge_time(patterns: &mut Vec<TimePattern>, at: DateTime<Utc>, cap: usize) {
    let hour = at.hour();
    let day_of_week = at.weekday().num_days_from_sunday();
    match patterns
        .iter_mut()
        .find(|p| p.hour == hour && p.day_of_week == day_of_week)
    {
        Some(p) => p.frequency += 1,
        None => patterns.push(TimePattern {
            hour,
            day_of_week,
            frequency: 1,
        }),
    }
    keep_last(patterns, cap);
}

impl TransactionPatterns {
    pub fn record(&mut self, tx: &Transaction, cap: usize) {
        if tx.amount.is_finite() && tx.amount != 0.0 {
            self.typical_amounts.push(tx.amount);
            keep_last(&mut self.typical_amounts, cap);
        }
        self.typical_hours.push(tx.timestamp.hour());
        self.typical_days.push(tx.timestamp.weekday().num_days_from_sunday());
        keep_last(&mut self.typical_hours, cap);
        keep_last(&mut self.typical_days, cap);
        self.frequency = self.typical_amounts.len() as f64 / 30.0;
    }

    pub fn amount_stats(&self) -> AmountStats {
        let amounts = &self.typical_amounts;
        if amounts.is_empty() {
            return AmountStats::default();
        }
        let n = amounts.len() as f64;
        let mean = amounts.iter().sum::<f64>() / n;
        let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        AmountStats {
            mean,
            std: variance.sqrt(),
            max: amounts.iter().copied().fold(f64::MIN, f64::max),
            min: amounts.iter().copied().fold(f64::MAX, f64::min),
        }
    }

    /// Circular distance in hours to the closest typical hour; 0 with no history.
    pub fn hour_distance(&self, hour: u32) -> f64 {
        self.typical_hours
            .iter()
            .map(|h| {
                let d = h.abs_diff(hour) % 24;
                d.min(24 - d)
            })
            .min()
            .unwrap_or(0) as f64
    }
}
