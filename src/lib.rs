//! Behavior Guard: per-user behavioral risk scoring for mobile banking sessions.
//!
//! Modular structure:
//! - [`features`]: sensor snapshot + context + transaction → 100-slot vector, and its scaler
//! - [`sensors`]: sensor collaborator trait and a simulated source
//! - [`baseline`]: per-user EMA baseline, anomaly scoring, adaptive thresholds
//! - [`model`]: ONNX fraud classifier
//! - [`risk`]: blending, classification, factors and recommendations
//! - [`alerts`]: fraud alerts raised by explicit evaluations
//! - [`storage`]: baseline stores (in-memory, encrypted SQLite)
//! - [`monitor`]: the `BehaviorGuard` context object
//! - [`logging`]: structured JSON logging

pub mod alerts;
pub mod baseline;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod risk;
pub mod sensors;
pub mod storage;
pub mod transaction;

pub use alerts::{AlertManager, FraudAlert};
pub use baseline::{AnomalyScore, BaselineLearner, UserBaseline};
pub use config::GuardConfig;
pub use error::{GuardError, ModelError, SensorError, StorageError};
pub use features::{FeatureExtractor, FeatureScaler, FeatureVector};
pub use logging::StructuredLogger;
pub use model::{FraudModel, RiskModel};
pub use monitor::{BehaviorGuard, FeatureSource, LiveState};
pub use risk::{RiskAssessment, RiskLabel, Thresholds};
pub use sensors::{SensorContext, SensorSource, SimulatedSensors};
pub use storage::{BaselineStore, MemoryStore, SecureStore};
pub use transaction::Transaction;
