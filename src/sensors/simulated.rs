//! Seeded synthetic sensor feed. Draws each named reading from a per-feature
//! range and distribution; the fraudulent profile shifts or scales the draw.

use super::{GeoLocation, NetworkType, Orientation, SensorContext, SensorSnapshot, SensorSource};
use crate::error::SensorError;
use crate::features::layout::FEATURE_NAMES;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalProfile {
    #[default]
    Legitimate,
    Fraudulent,
}

#[derive(Debug, Clone, Copy)]
enum Dist {
    Normal,
    LogNormal,
    Beta,
    Uniform,
    Poisson,
    Categorical,
}

#[derive(Debug, Clone, Copy)]
enum Drift {
    Shift(f64),
    Mult(f64),
}

#[derive(Debug, Clone, Copy)]
struct SignalShape {
    min: f64,
    max: f64,
    dist: Dist,
    drift: Drift,
}

const fn shape(min: f64, max: f64, dist: Dist, drift: Drift) -> SignalShape {
    SignalShape { min, max, dist, drift }
}

const HOME_LAT: (f64, f64) = (12.9716, 13.0827);
const HOME_LNG: (f64, f64) = (77.5946, 77.6413);

/// Readings the sensor layer owns. Calendar, transaction and coded device
/// fields come from the context or the transaction instead.
fn shape_for(name: &str) -> Option<SignalShape> {
    use Dist::*;
    use Drift::*;
    let s = match name {
        "accelMeanX" | "accelMeanY" => shape(-2.0, 2.0, Normal, Shift(0.3)),
        "accelMeanZ" | "accelMedianZ" => shape(8.0, 12.0, Normal, Shift(0.5)),
        "accelMaxZ" | "accelMinZ" => shape(7.0, 13.0, Normal, Shift(0.6)),
        n if n.starts_with("accelStd") => shape(0.1, 1.5, LogNormal, Mult(1.5)),
        n if n.starts_with("accel") => shape(-3.0, 3.0, Normal, Shift(0.8)),
        n if n.starts_with("gyroStd") => shape(0.01, 0.3, LogNormal, Mult(2.0)),
        n if n.starts_with("gyro") => shape(-0.5, 0.5, Normal, Shift(0.2)),
        n if n.starts_with("touchPressure") => shape(0.1, 1.0, Beta, Mult(1.8)),
        n if n.starts_with("touchDuration") => shape(50.0, 500.0, LogNormal, Mult(2.5)),
        n if n.starts_with("touchArea") => shape(0.1, 0.8, Beta, Mult(1.6)),
        "locationLat" => shape(HOME_LAT.0, HOME_LAT.1, Uniform, Shift(0.02)),
        "locationLng" => shape(HOME_LNG.0, HOME_LNG.1, Uniform, Shift(0.02)),
        "locationAccuracy" => shape(5.0, 50.0, LogNormal, Mult(2.0)),
        "locationSpeed" => shape(0.0, 30.0, LogNormal, Mult(1.5)),
        "locationAltitude" => shape(880.0, 940.0, Normal, Shift(0.0)),
        "locationDistance" => shape(0.0, 5.0, LogNormal, Mult(3.0)),
        "locationBearing" => shape(0.0, 360.0, Uniform, Shift(45.0)),
        "locationVariance" => shape(0.0, 0.01, LogNormal, Mult(2.0)),
        "locationConsistency" => shape(0.5, 1.0, Beta, Mult(0.5)),
        "merchantCategory" => shape(0.0, 10.0, Categorical, Shift(2.0)),
        "riskHistory" => shape(0.0, 1.0, Beta, Mult(5.0)),
        "deviceBrightness" => shape(0.1, 1.0, Beta, Mult(1.2)),
        "deviceVolume" => shape(0.0, 1.0, Beta, Mult(1.0)),
        "loginAttempts" => shape(1.0, 3.0, Poisson, Mult(2.5)),
        "navigationActions" => shape(5.0, 40.0, Poisson, Mult(0.5)),
        "keyboardStrokes" => shape(10.0, 200.0, Poisson, Mult(1.5)),
        "biometricAttempts" => shape(0.0, 2.0, Poisson, Mult(2.0)),
        "biometricFailures" => shape(0.0, 1.0, Poisson, Mult(3.0)),
        _ => return None,
    };
    Some(s)
}

pub struct SimulatedSensors {
    rng: Mutex<StdRng>,
    fraudulent: AtomicBool,
    active: AtomicBool,
}

impl SimulatedSensors {
    pub fn new(profile: SignalProfile, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            fraudulent: AtomicBool::new(profile == SignalProfile::Fraudulent),
            active: AtomicBool::new(false),
        }
    }

    pub fn set_profile(&self, profile: SignalProfile) {
        self.fraudulent
            .store(profile == SignalProfile::Fraudulent, Ordering::Relaxed);
    }

    pub fn profile(&self) -> SignalProfile {
        if self.fraudulent.load(Ordering::Relaxed) {
            SignalProfile::Fraudulent
        } else {
            SignalProfile::Legitimate
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T, SensorError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SensorError::Unavailable("generator lock poisoned".into()))?;
        Ok(f(&mut rng))
    }
}

impl SensorSource for SimulatedSensors {
    fn snapshot(&self) -> Result<SensorSnapshot, SensorError> {
        let fraud = self.fraudulent.load(Ordering::Relaxed);
        self.with_rng(|rng| {
            FEATURE_NAMES
                .iter()
                .filter_map(|name| shape_for(name).map(|s| (name.to_string(), draw(rng, &s, fraud))))
                .collect()
        })
    }

    fn context(&self) -> Result<SensorContext, SensorError> {
        let fraud = self.fraudulent.load(Ordering::Relaxed);
        self.with_rng(|rng| {
            // a fraudulent session is placed a few hundred km away
            let offset = if fraud { rng.gen_range(2.0..4.0) } else { 0.0 };
            SensorContext {
                location: Some(GeoLocation {
                    latitude: rng.gen_range(HOME_LAT.0..HOME_LAT.1) + offset,
                    longitude: rng.gen_range(HOME_LNG.0..HOME_LNG.1) + offset,
                    accuracy: rng.gen_range(5.0..50.0),
                }),
                battery_level: rng.gen_range(0.1..1.0),
                orientation: Orientation::Portrait,
                network_type: if rng.gen_bool(0.7) {
                    NetworkType::Wifi
                } else {
                    NetworkType::Cellular
                },
                timestamp: Utc::now(),
            }
        })
    }

    fn start(&self) -> Result<(), SensorError> {
        self.active.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::Relaxed);
    }
}

fn draw(rng: &mut StdRng, s: &SignalShape, fraud: bool) -> f64 {
    let mut value = match s.dist {
        Dist::Normal => normal(rng, (s.min + s.max) / 2.0, (s.max - s.min) / 6.0),
        Dist::LogNormal => normal(rng, ((s.min + s.max) / 2.0).max(1e-9).ln(), 0.5).exp(),
        Dist::Beta => {
            let (u1, u2): (f64, f64) = (rng.gen(), rng.gen());
            let b = if u1 + u2 > 0.0 { u1 / (u1 + u2) } else { 0.5 };
            s.min + b * (s.max - s.min)
        }
        Dist::Uniform => rng.gen_range(s.min..=s.max),
        Dist::Poisson => poisson(rng, ((s.min + s.max) / 2.0).max(1.0)),
        Dist::Categorical => rng.gen_range(s.min.floor() as i64..=s.max.floor() as i64) as f64,
    };

    if fraud {
        match s.drift {
            Drift::Shift(shift) => value += shift + normal(rng, 0.0, shift.abs() * 0.3),
            Drift::Mult(mult) => value *= normal(rng, mult, mult * 0.2),
        }
        return value.max(s.min.min(0.0));
    }
    value.clamp(s.min, s.max)
}

/// Box-Muller.
fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    mean + std * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn poisson(rng: &mut StdRng, lambda: f64) -> f64 {
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        k += 1;
        p *= rng.gen::<f64>();
        if p <= limit || k > 1000 {
            break;
        }
    }
    (k - 1) as f64
}
