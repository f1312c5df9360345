//! `BehaviorGuard`: owns every per-user map and drives both entry points.
//!
//! Background monitoring samples the sensor feed on an interval and only
//! updates live state. Explicit transaction evaluation runs the same pipeline
//! once and raises an alert for MEDIUM/HIGH results.

use crate::alerts::{AlertManager, FraudAlert};
use crate::baseline::{AnomalyScore, BaselineLearner, BaselineTracker, UserBaseline};
use crate::config::GuardConfig;
use crate::error::{ModelError, Result};
use crate::features::{FeatureExtractor, FeatureScaler, FeatureVector};
use crate::model::RiskModel;
use crate::risk::factors::{context_factors, heuristic_probability, location_risk};
use crate::risk::{
    BlendInput, EvaluationPhase, FallbackPolicy, RiskAssessment, RiskBlender, RiskHistory,
    RiskLabel, ThresholdPolicy, Thresholds,
};
use crate::sensors::{read_or_default, SensorContext, SensorSource};
use crate::storage::BaselineStore;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Where an evaluation takes its raw features from.
#[derive(Debug, Clone)]
pub enum FeatureSource {
    /// Live sensor snapshot and context
    Sensors,
    /// Caller-supplied raw vector; must have exactly 100 entries
    RawVector(Vec<f64>),
    /// Named features, ordered by the scaler's feature order
    Named(HashMap<String, f64>),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveState {
    pub phase: EvaluationPhase,
    pub last_assessment: Option<RiskAssessment>,
    /// Completed monitoring ticks
    pub ticks: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    fn signal(&self) {
        self.stopped.store(true, Ordering::Release);
        let _ = self.stop_tx.send(true);
    }
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    config: GuardConfig,
    extractor: FeatureExtractor,
    scaler: FeatureScaler,
    tracker: BaselineTracker,
    blender: RiskBlender,
    model: Arc<dyn RiskModel>,
    /// Caps blocking model calls, including ones abandoned after a timeout
    inference_permits: Arc<Semaphore>,
    sensors: Arc<dyn SensorSource>,
    alerts: AlertManager,
    histories: Mutex<HashMap<String, RiskHistory>>,
    live: Mutex<HashMap<String, LiveState>>,
}

pub struct BehaviorGuard {
    shared: Arc<Shared>,
    monitors: Mutex<HashMap<String, MonitorHandle>>,
}

impl BehaviorGuard {
    pub fn new(
        config: GuardConfig,
        scaler: FeatureScaler,
        model: Arc<dyn RiskModel>,
        store: Arc<dyn BaselineStore>,
        sensors: Arc<dyn SensorSource>,
    ) -> Self {
        let learner = BaselineLearner::new(config.baseline.clone());
        let shared = Shared {
            extractor: FeatureExtractor::new(),
            scaler,
            tracker: BaselineTracker::new(learner, store),
            blender: RiskBlender::new(config.risk.clone()),
            model,
            inference_permits: Arc::new(Semaphore::new(config.monitoring.max_pending_inferences.max(1))),
            sensors,
            alerts: AlertManager::new(),
            histories: Mutex::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            config,
        };
        Self {
            shared: Arc::new(shared),
            monitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.shared.config
    }

    /// Begin periodic sampling for `user_id`. Must be called inside a Tokio
    /// runtime. Starting an already-monitored user is a no-op.
    pub fn start_monitoring(&self, user_id: &str) {
        let mut monitors = locked(&self.monitors);
        if monitors.contains_key(user_id) {
            return;
        }
        if let Err(e) = self.shared.sensors.start() {
            tracing::warn!(user_id, error = %e, "sensor start failed; monitoring with empty readings");
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let shared = Arc::clone(&self.shared);
        let user = user_id.to_string();
        let period = shared.config.monitoring.interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if flag.load(Ordering::Acquire) {
                            break;
                        }
                        shared.tick(&user).await;
                    }
                }
            }
            tracing::debug!(user_id = %user, "monitoring task exited");
        });

        tracing::info!(user_id, interval_ms = period.as_millis() as u64, "monitoring started");
        monitors.insert(
            user_id.to_string(),
            MonitorHandle {
                stop_tx,
                stopped,
                task,
            },
        );
    }

    /// Cancel monitoring for `user_id`. No tick starts after this returns; a
    /// tick already in flight completes. Sensors are released once no user
    /// is monitored.
    pub fn stop_monitoring(&self, user_id: &str) -> bool {
        let mut monitors = locked(&self.monitors);
        let Some(handle) = monitors.remove(user_id) else {
            return false;
        };
        handle.signal();
        if monitors.is_empty() {
            self.shared.sensors.stop();
        }
        tracing::info!(user_id, "monitoring stopped");
        true
    }

    pub fn is_monitoring(&self, user_id: &str) -> bool {
        locked(&self.monitors).contains_key(user_id)
    }

    /// Stop every monitor and wait for in-flight ticks to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<(String, MonitorHandle)> = locked(&self.monitors).drain().collect();
        for (_, handle) in &handles {
            handle.signal();
        }
        self.shared.sensors.stop();
        for (user_id, handle) in handles {
            if let Err(e) = handle.task.await {
                tracing::warn!(user_id = %user_id, error = %e, "monitoring task ended abnormally");
            }
        }
    }

    /// Score `tx` against the live sensor feed.
    pub async fn evaluate_transaction(&self, user_id: &str, tx: &Transaction) -> RiskAssessment {
        self.evaluate_transaction_with(user_id, tx, FeatureSource::Sensors)
            .await
    }

    /// Score `tx` against the given feature source. Never fails: an evaluation
    /// that cannot complete yields [`RiskAssessment::unassessed`].
    pub async fn evaluate_transaction_with(
        &self,
        user_id: &str,
        tx: &Transaction,
        source: FeatureSource,
    ) -> RiskAssessment {
        let policy = self.shared.config.risk.transaction_thresholds;
        match self.shared.assess(user_id, source, Some(tx), policy).await {
            Ok(assessment) => {
                tracing::info!(
                    user_id,
                    tx_id = %tx.id,
                    score = assessment.risk_score,
                    label = assessment.risk_label.as_str(),
                    "transaction evaluated"
                );
                if assessment.risk_label != RiskLabel::Low {
                    self.shared
                        .alerts
                        .record(FraudAlert::from_assessment(user_id, tx, &assessment));
                }
                assessment
            }
            Err(e) => {
                tracing::warn!(user_id, tx_id = %tx.id, error = %e, "evaluation failed; proceeding unassessed");
                let assessment = RiskAssessment::unassessed();
                self.shared.classified(user_id, &assessment);
                assessment
            }
        }
    }

    pub async fn get_baseline(&self, user_id: &str) -> Option<UserBaseline> {
        self.shared.tracker.get_baseline(user_id).await
    }

    pub async fn adaptive_thresholds(&self, user_id: &str) -> Thresholds {
        self.shared.tracker.adaptive_thresholds(user_id).await
    }

    pub fn alerts(&self, user_id: &str) -> Vec<FraudAlert> {
        self.shared.alerts.alerts(user_id)
    }

    pub fn resolve_alert(&self, alert_id: &str) -> bool {
        self.shared.alerts.resolve(alert_id)
    }

    pub fn clear_alerts(&self, user_id: &str) {
        self.shared.alerts.clear_all(user_id);
    }

    pub fn risk_history(&self, user_id: &str) -> Vec<f64> {
        locked(&self.shared.histories)
            .get(user_id)
            .map(RiskHistory::to_vec)
            .unwrap_or_default()
    }

    pub fn live_state(&self, user_id: &str) -> LiveState {
        locked(&self.shared.live)
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget the user: baseline, risk history, alerts and live state.
    pub async fn reset_user(&self, user_id: &str) -> Result<()> {
        self.shared.tracker.reset(user_id).await?;
        locked(&self.shared.histories).remove(user_id);
        locked(&self.shared.live).remove(user_id);
        self.shared.alerts.clear_all(user_id);
        tracing::info!(user_id, "user data reset");
        Ok(())
    }
}

impl Drop for BehaviorGuard {
    fn drop(&mut self) {
        let monitors = locked(&self.monitors);
        for handle in monitors.values() {
            handle.signal();
        }
        if !monitors.is_empty() {
            self.shared.sensors.stop();
        }
    }
}

impl Shared {
    async fn tick(&self, user_id: &str) {
        let policy = self.config.risk.monitoring_thresholds;
        match self.assess(user_id, FeatureSource::Sensors, None, policy).await {
            Ok(assessment) => tracing::debug!(
                user_id,
                score = assessment.risk_score,
                label = assessment.risk_label.as_str(),
                "monitoring tick"
            ),
            Err(e) => tracing::warn!(user_id, error = %e, "monitoring tick failed"),
        }
        if let Some(state) = locked(&self.live).get_mut(user_id) {
            state.ticks += 1;
        }
    }

    fn set_phase(&self, user_id: &str, phase: EvaluationPhase) {
        let mut live = locked(&self.live);
        let state = live.entry(user_id.to_string()).or_default();
        state.phase = phase;
        state.updated_at = Some(Utc::now());
    }

    fn classified(&self, user_id: &str, assessment: &RiskAssessment) {
        let mut live = locked(&self.live);
        let state = live.entry(user_id.to_string()).or_default();
        state.phase = EvaluationPhase::Classified;
        state.last_assessment = Some(assessment.clone());
        state.updated_at = Some(Utc::now());
    }

    /// Raw and scaled vectors plus the observation context for one evaluation.
    async fn features(
        &self,
        user_id: &str,
        source: FeatureSource,
        tx: Option<&Transaction>,
    ) -> Result<(FeatureVector, FeatureVector, SensorContext)> {
        let fallback_context = || {
            tx.map(|t| SensorContext::at(t.timestamp))
                .unwrap_or_else(SensorContext::empty)
        };
        match source {
            FeatureSource::Sensors => {
                let (snapshot, context) = read_or_default(self.sensors.as_ref());
                let prior = self.tracker.get_baseline(user_id).await;
                let raw = self.extractor.extract_with_history(
                    &snapshot,
                    &context,
                    tx,
                    prior.as_ref().map(|b| &b.transaction_patterns),
                );
                let scaled = self.scaler.transform_vector(raw.as_slice())?;
                Ok((raw, scaled, context))
            }
            FeatureSource::RawVector(values) => {
                let raw = FeatureVector::from_exact(&values)?;
                let scaled = self.scaler.transform_vector(raw.as_slice())?;
                Ok((raw, scaled, fallback_context()))
            }
            FeatureSource::Named(named) => {
                let raw = FeatureVector::from_padded(self.scaler.order(&named));
                let scaled = self.scaler.transform(&named);
                Ok((raw, scaled, fallback_context()))
            }
        }
    }

    async fn assess(
        &self,
        user_id: &str,
        source: FeatureSource,
        tx: Option<&Transaction>,
        policy: ThresholdPolicy,
    ) -> Result<RiskAssessment> {
        self.set_phase(user_id, EvaluationPhase::Scoring);
        let result = self.score(user_id, source, tx, policy).await;
        match &result {
            Ok(assessment) => self.classified(user_id, assessment),
            Err(_) => self.set_phase(user_id, EvaluationPhase::Idle),
        }
        result
    }

    async fn score(
        &self,
        user_id: &str,
        source: FeatureSource,
        tx: Option<&Transaction>,
        policy: ThresholdPolicy,
    ) -> Result<RiskAssessment> {
        let (raw, scaled, context) = self.features(user_id, source, tx).await?;

        // anomaly and thresholds are judged against what was known before this sample
        let observation = self.tracker.observe(user_id, &raw, &context, tx).await;
        let previous = observation.previous.as_ref();
        let anomaly = match previous {
            Some(baseline) => self.tracker.anomaly_score(&raw, baseline),
            None => AnomalyScore::insufficient(),
        };
        let thresholds = match policy {
            ThresholdPolicy::Fixed(t) => t,
            ThresholdPolicy::Adaptive => self.tracker.learner().adaptive_thresholds(previous),
        };
        let loc_risk = tx
            .and_then(|t| t.location.as_ref())
            .zip(previous)
            .and_then(|(loc, baseline)| location_risk(baseline, loc.latitude, loc.longitude));

        let model_score = self.model_probability(&scaled, tx, loc_risk).await;

        let history = locked(&self.histories)
            .get(user_id)
            .map(RiskHistory::to_vec)
            .unwrap_or_default();

        let assessment = self.blender.blend(BlendInput {
            model_score,
            anomaly: &anomaly,
            thresholds,
            history: &history,
            features: &scaled,
            context_factors: context_factors(&scaled, tx, loc_risk),
        });

        let capacity = self.config.risk.history_capacity;
        locked(&self.histories)
            .entry(user_id.to_string())
            .or_insert_with(|| RiskHistory::new(capacity))
            .push(assessment.risk_score);

        Ok(assessment)
    }

    /// Model probability, bounded by the configured timeout. Failures degrade
    /// to the fallback policy.
    async fn model_probability(
        &self,
        scaled: &FeatureVector,
        tx: Option<&Transaction>,
        loc_risk: Option<f64>,
    ) -> f64 {
        let result = if self.model.is_available() {
            let timeout = self.config.monitoring.model_timeout();
            let model = Arc::clone(&self.model);
            let permits = Arc::clone(&self.inference_permits);
            let input = scaled.to_f32();
            let call = async move {
                let permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| ModelError::Runtime(e.to_string()))?;
                // the permit is held until the blocking call returns, even after a timeout
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    model.predict(&input)
                })
                .await
                .map_err(|join| ModelError::Runtime(join.to_string()))?
            };
            match tokio::time::timeout(timeout, call).await {
                Ok(prediction) => prediction,
                Err(_) => Err(ModelError::Timeout(timeout.as_millis() as u64)),
            }
        } else {
            Err(ModelError::Unavailable)
        };

        match result {
            Ok(p) => f64::from(p),
            Err(e) => {
                let fallback = match self.config.risk.fallback {
                    FallbackPolicy::Zero => 0.0,
                    FallbackPolicy::Heuristic => heuristic_probability(scaled, tx, loc_risk),
                };
                if matches!(e, ModelError::Unavailable) {
                    tracing::debug!(fallback, "no model loaded; using fallback probability");
                } else {
                    tracing::warn!(error = %e, fallback, "model prediction failed; using fallback probability");
                }
                fallback
            }
        }
    }
}
