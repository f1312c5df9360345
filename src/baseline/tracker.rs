use super::{AnomalyScore, BaselineLearner, UserBaseline};
use crate::error::StorageError;
use crate::features::FeatureVector;
use crate::risk::Thresholds;
use crate::sensors::SensorContext;
use crate::storage::BaselineStore;
use crate::transaction::Transaction;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The baseline before and after one observation was folded in.
#[derive(Debug, Clone)]
pub struct Observation {
    pub previous: Option<UserBaseline>,
    pub current: UserBaseline,
}

/// Store-backed baselines. Load, update and save for one user run under that
/// user's lock so concurrent observations never lose an update.
pub struct BaselineTracker {
    learner: BaselineLearner,
    store: Arc<dyn BaselineStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BaselineTracker {
    pub fn new(learner: BaselineLearner, store: Arc<dyn BaselineStore>) -> Self {
        Self {
            learner,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn learner(&self) -> &BaselineLearner {
        &self.learner
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id.to_string()).or_default().clone()
    }

    async fn load(&self, user_id: &str) -> Option<UserBaseline> {
        match self.store.load(user_id).await {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "baseline load failed; treating user as new");
                None
            }
        }
    }

    /// Current baseline, or `None` for unknown users and unreadable records.
    pub async fn get_baseline(&self, user_id: &str) -> Option<UserBaseline> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.load(user_id).await
    }

    /// Fold one raw observation into the stored baseline and persist it.
    /// A failed save is logged and the updated baseline is still returned.
    pub async fn observe(
        &self,
        user_id: &str,
        raw: &FeatureVector,
        context: &SensorContext,
        tx: Option<&Transaction>,
    ) -> Observation {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let previous = self.load(user_id).await;
        let current = self
            .learner
            .update(previous.as_ref(), user_id, raw, context, tx);
        match self.store.save(user_id, &current).await {
            Ok(()) => tracing::debug!(
                user_id,
                samples = current.sample_count,
                confidence = current.confidence,
                "baseline updated"
            ),
            Err(e) => tracing::warn!(
                user_id,
                error = %e,
                "baseline save failed; continuing with unsaved baseline"
            ),
        }
        Observation { previous, current }
    }

    pub fn anomaly_score(&self, raw: &FeatureVector, baseline: &UserBaseline) -> AnomalyScore {
        self.learner.anomaly_score(raw, baseline)
    }

    pub async fn adaptive_thresholds(&self, user_id: &str) -> Thresholds {
        let baseline = self.get_baseline(user_id).await;
        self.learner.adaptive_thresholds(baseline.as_ref())
    }

    /// Forget everything learned about `user_id`.
    pub async fn reset(&self, user_id: &str) -> Result<(), StorageError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.store.remove(user_id).await
    }
}
