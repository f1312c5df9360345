//! Canonical 100-slot layout. Section offsets are a contract between the
//! extractor, the scaler's `featureOrder` and anything reading by index.

use std::ops::Range;

pub const FEATURE_DIM: usize = 100;

pub const MOTION: Range<usize> = 0..30;
pub const TOUCH: Range<usize> = 30..60;
pub const LOCATION_TIME: Range<usize> = 60..75;
pub const TRANSACTION: Range<usize> = 75..90;
pub const DEVICE: Range<usize> = 90..95;
pub const BEHAVIORAL: Range<usize> = 95..100;

/// Feature sections in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Motion,
    Touch,
    LocationTime,
    Transaction,
    Device,
    Behavioral,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Motion,
        Section::Touch,
        Section::LocationTime,
        Section::Transaction,
        Section::Device,
        Section::Behavioral,
    ];

    pub fn range(self) -> Range<usize> {
        match self {
            Section::Motion => MOTION,
            Section::Touch => TOUCH,
            Section::LocationTime => LOCATION_TIME,
            Section::Transaction => TRANSACTION,
            Section::Device => DEVICE,
            Section::Behavioral => BEHAVIORAL,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Motion => "motion",
            Section::Touch => "touch",
            Section::LocationTime => "location_time",
            Section::Transaction => "transaction",
            Section::Device => "device",
            Section::Behavioral => "behavioral",
        }
    }

    /// Section owning a vector index; indices past the end fall into `Behavioral`.
    pub fn of(index: usize) -> Section {
        Section::ALL
            .into_iter()
            .find(|s| s.range().contains(&index))
            .unwrap_or(Section::Behavioral)
    }
}

/// Human-readable name for an index, e.g. `touch_4`.
pub fn display_name(index: usize) -> String {
    let section = Section::of(index);
    format!("{}_{}", section.label(), index.saturating_sub(section.range().start))
}

/// Named features in vector order. Matches the `featureOrder` shipped with
/// the scaler when no explicit scaler file is configured.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    // motion: accelerometer then gyroscope, stat-major, axis-minor
    "accelMeanX", "accelMeanY", "accelMeanZ",
    "accelStdX", "accelStdY", "accelStdZ",
    "accelMaxX", "accelMaxY", "accelMaxZ",
    "accelMinX", "accelMinY", "accelMinZ",
    "accelMedianX", "accelMedianY", "accelMedianZ",
    "gyroMeanX", "gyroMeanY", "gyroMeanZ",
    "gyroStdX", "gyroStdY", "gyroStdZ",
    "gyroMaxX", "gyroMaxY", "gyroMaxZ",
    "gyroMinX", "gyroMinY", "gyroMinZ",
    "gyroMedianX", "gyroMedianY", "gyroMedianZ",
    // touch: pressure, duration, area x ten statistics
    "touchPressureMean", "touchPressureStd", "touchPressureMax", "touchPressureMin", "touchPressureMedian",
    "touchPressureVariance", "touchPressureSkewness", "touchPressureKurtosis", "touchPressureRange", "touchPressureIqr",
    "touchDurationMean", "touchDurationStd", "touchDurationMax", "touchDurationMin", "touchDurationMedian",
    "touchDurationVariance", "touchDurationSkewness", "touchDurationKurtosis", "touchDurationRange", "touchDurationIqr",
    "touchAreaMean", "touchAreaStd", "touchAreaMax", "touchAreaMin", "touchAreaMedian",
    "touchAreaVariance", "touchAreaSkewness", "touchAreaKurtosis", "touchAreaRange", "touchAreaIqr",
    // location & time
    "locationLat", "locationLng", "locationAccuracy", "locationSpeed", "locationAltitude",
    "locationDistance", "locationBearing", "locationVariance", "locationConsistency",
    "hourOfDay", "dayOfWeek", "dayOfMonth", "monthOfYear", "minuteOfHour", "isWeekend",
    // transaction
    "transactionAmount", "transactionLogAmount", "transactionType", "transactionStatus",
    "transactionFrequency", "amountMean", "amountStd", "amountMax", "amountMin",
    "transactionHour", "transactionDayOfWeek", "typicalHourDistance", "amountDeviation",
    "merchantCategory", "riskHistory",
    // device usage
    "batteryLevel", "networkType", "deviceOrientation", "deviceBrightness", "deviceVolume",
    // behavioral
    "loginAttempts", "navigationActions", "keyboardStrokes", "biometricAttempts", "biometricFailures",
];

pub fn index_of(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_tile_the_vector() {
        let total: usize = Section::ALL.iter().map(|s| s.range().len()).sum();
        assert_eq!(total, FEATURE_DIM);
        assert_eq!(Section::of(0), Section::Motion);
        assert_eq!(Section::of(59), Section::Touch);
        assert_eq!(Section::of(75), Section::Transaction);
        assert_eq!(Section::of(99), Section::Behavioral);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_DIM);
    }

    #[test]
    fn display_name_is_section_relative() {
        assert_eq!(display_name(34), "touch_4");
        assert_eq!(display_name(96), "behavioral_1");
    }
}
