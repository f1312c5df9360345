//! Fraud alerts raised by explicit transaction evaluation.

use crate::risk::{RiskAssessment, RiskLabel};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudAlert {
    pub id: String,
    pub user_id: String,
    pub severity: RiskLabel,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
}

impl FraudAlert {
    pub fn from_assessment(user_id: &str, tx: &Transaction, assessment: &RiskAssessment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            severity: assessment.risk_label,
            description: format!(
                "Fraud risk detected during {} transaction",
                tx.tx_type.as_str()
            ),
            timestamp: Utc::now(),
            resolved: false,
            risk_score: assessment.risk_score,
            recommendations: assessment.recommendations.clone(),
        }
    }
}

/// Per-user alert lists, newest first.
#[derive(Default)]
pub struct AlertManager {
    alerts: Mutex<HashMap<String, Vec<FraudAlert>>>,
}

impl AlertManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, HashMap<String, Vec<FraudAlert>>> {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, alert: FraudAlert) {
        tracing::info!(
            user_id = %alert.user_id,
            alert_id = %alert.id,
            severity = alert.severity.as_str(),
            score = alert.risk_score,
            "fraud alert raised"
        );
        self.inner()
            .entry(alert.user_id.clone())
            .or_default()
            .insert(0, alert);
    }

    /// Mark the alert with exactly this id resolved. Unknown ids change nothing.
    pub fn resolve(&self, alert_id: &str) -> bool {
        let mut alerts = self.inner();
        match alerts
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|a| a.id == alert_id)
        {
            Some(alert) => {
                alert.resolved = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&self, user_id: &str) {
        self.inner().remove(user_id);
    }

    pub fn alerts(&self, user_id: &str) -> Vec<FraudAlert> {
        self.inner().get(user_id).cloned().unwrap_or_default()
    }

    pub fn unresolved(&self, user_id: &str) -> usize {
        self.inner()
            .get(user_id)
            .map(|list| list.iter().filter(|a| !a.resolved).count())
            .unwrap_or(0)
    }
}
