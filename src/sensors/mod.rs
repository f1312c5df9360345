//! Sensor collaborator: a named scalar snapshot plus device context.
//! Acquisition itself lives outside this crate; [`SimulatedSensors`] stands in for it.

mod simulated;

pub use simulated::{SignalProfile, SimulatedSensors};

use crate::error::SensorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named scalar readings (`accelMeanX`, `touchPressureMean`, ...).
pub type SensorSnapshot = HashMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    None,
    #[default]
    #[serde(other)]
    Unknown,
}

impl NetworkType {
    pub fn code(self) -> f64 {
        match self {
            NetworkType::Wifi => 1.0,
            NetworkType::Cellular => 2.0,
            NetworkType::Ethernet => 3.0,
            NetworkType::None => 4.0,
            NetworkType::Unknown => 0.0,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "wifi" => NetworkType::Wifi,
            "cellular" => NetworkType::Cellular,
            "ethernet" => NetworkType::Ethernet,
            "none" => NetworkType::None,
            _ => NetworkType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Portrait,
    Landscape,
    FaceUp,
    FaceDown,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Orientation {
    pub fn code(self) -> f64 {
        match self {
            Orientation::Portrait => 1.0,
            Orientation::Landscape => 2.0,
            Orientation::FaceUp => 3.0,
            Orientation::FaceDown => 4.0,
            Orientation::Unknown => 0.0,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Orientation::Portrait,
            "landscape" => Orientation::Landscape,
            "face-up" | "face_up" => Orientation::FaceUp,
            "face-down" | "face_down" => Orientation::FaceDown,
            _ => Orientation::Unknown,
        }
    }
}

/// Device context captured alongside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorContext {
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub battery_level: f64,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub network_type: NetworkType,
    pub timestamp: DateTime<Utc>,
}

impl SensorContext {
    /// Context with no readings, stamped now.
    pub fn empty() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            location: None,
            battery_level: 0.0,
            orientation: Orientation::Unknown,
            network_type: NetworkType::Unknown,
            timestamp,
        }
    }
}

/// Live sensor feed. `start`/`stop` must be idempotent.
pub trait SensorSource: Send + Sync {
    fn snapshot(&self) -> Result<SensorSnapshot, SensorError>;
    fn context(&self) -> Result<SensorContext, SensorError>;
    fn start(&self) -> Result<(), SensorError>;
    fn stop(&self);
}

/// Snapshot and context with collaborator failures degraded to empty readings.
pub fn read_or_default(source: &dyn SensorSource) -> (SensorSnapshot, SensorContext) {
    let snapshot = source.snapshot().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "sensor snapshot unavailable; using zeros");
        SensorSnapshot::new()
    });
    let context = source.context().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "sensor context unavailable; using empty context");
        SensorContext::empty()
    });
    (snapshot, context)
}
