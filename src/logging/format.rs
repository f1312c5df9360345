//! Subscriber setup plus ndjson audit lines written outside of tracing.

use crate::monitor::LiveState;
use crate::risk::RiskAssessment;
use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn no_factors(factors: &&[String]) -> bool {
    factors.is_empty()
}

/// One audit line per classified evaluation.
#[derive(Serialize)]
pub struct AssessmentEvent<'a> {
    pub ts: String,
    pub user_id: &'a str,
    pub kind: &'a str,
    pub risk_score: f64,
    pub risk_label: &'a str,
    pub confidence: f64,
    #[serde(skip_serializing_if = "no_factors")]
    pub factors: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks: Option<u64>,
}

impl<'a> AssessmentEvent<'a> {
    pub fn new(user_id: &'a str, kind: &'a str, assessment: &'a RiskAssessment) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            user_id,
            kind,
            risk_score: assessment.risk_score,
            risk_label: assessment.risk_label.as_str(),
            confidence: assessment.confidence,
            factors: &assessment.factors,
            ticks: None,
        }
    }

    /// Final line for a monitored user; `None` before any classification.
    pub fn from_live(user_id: &'a str, state: &'a LiveState) -> Option<Self> {
        let assessment = state.last_assessment.as_ref()?;
        let mut event = Self::new(user_id, "monitoring", assessment);
        event.ticks = Some(state.ticks);
        Some(event)
    }
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber. `RUST_LOG` overrides `default_level`.
    /// Calling it twice is harmless; the second install is ignored.
    pub fn init(json: bool, default_level: &str) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let installed = if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }

    /// Write `event` as a single JSON line.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        writeln!(w, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_line_per_event() {
        let assessment = RiskAssessment::unassessed();
        let event = AssessmentEvent::new("u1", "transaction", &assessment);
        let mut buf = Vec::new();
        StructuredLogger::emit_json(&event, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["risk_label"], "LOW");
        assert!(v.get("factors").is_none());
    }
}
