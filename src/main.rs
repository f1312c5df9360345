//! Behavior Guard daemon: monitors one user against the simulated sensor feed
//! until Ctrl+C, then prints the final live state as a JSON line.

use behavior_guard::{
    config::GuardConfig,
    features::FeatureScaler,
    logging::{AssessmentEvent, StructuredLogger},
    model::FraudModel,
    monitor::BehaviorGuard,
    sensors::{SignalProfile, SimulatedSensors},
    storage::SecureStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

const DEV_SECRET: &[u8] = b"behavior-guard-dev-secret";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("BEHAVIOR_GUARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("behavior-guard.json"));
    let config = GuardConfig::load(&config_path)?;

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), data_dir = ?config.data_dir, "behavior guard starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let secret = match std::env::var(&config.store_secret_env) {
        Ok(s) if !s.is_empty() => s.into_bytes(),
        _ => {
            tracing::warn!(env = %config.store_secret_env, "store secret not set; using development secret");
            DEV_SECRET.to_vec()
        }
    };
    let store = Arc::new(SecureStore::open(&config.data_dir.join("baselines.db"), &secret)?);

    let scaler = match &config.scaler_path {
        Some(path) => FeatureScaler::load(path)?,
        None => FeatureScaler::identity(),
    };
    let model = match FraudModel::load(&config.model_path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "fraud model failed to load; scoring without model");
            FraudModel::Unavailable
        }
    };
    let sensors = Arc::new(SimulatedSensors::new(SignalProfile::Legitimate, None));

    let user_id = config.monitoring.user_id.clone();
    let guard = BehaviorGuard::new(config, scaler, Arc::new(model), store, sensors);

    let stop = Arc::new(Notify::new());
    let notify = Arc::clone(&stop);
    ctrlc::set_handler(move || notify.notify_one())?;

    guard.start_monitoring(&user_id);
    info!(user_id = %user_id, "monitoring (Ctrl+C to stop)");
    stop.notified().await;

    guard.stop_monitoring(&user_id);
    guard.shutdown().await;

    let state = guard.live_state(&user_id);
    if let Some(event) = AssessmentEvent::from_live(&user_id, &state) {
        StructuredLogger::emit_json(&event, &mut std::io::stdout())?;
    }
    info!("behavior guard stopped");
    Ok(())
}
