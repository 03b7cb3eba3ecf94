//! Fired-run log.
//!
//! The dispatcher records every fire here, keyed by bot and minute, and
//! consults the log before firing so no schedule triggers twice in the
//! same minute. The monitoring view reads the same records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// What kind of schedule produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSource {
    OneTime,
    Recurring,
}

/// One fired run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Run id.
    pub id: String,
    /// Schedule that fired.
    pub schedule_id: String,
    /// Bot the run targets.
    pub bot_instance_id: String,
    /// Phase, when the schedule targets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    /// One-time or recurring.
    pub source: RunSource,
    /// Minute-granularity idempotency key.
    pub minute_key: String,
    /// When the dispatcher fired it.
    pub fired_at: DateTime<Utc>,
}

impl RunRecord {
    /// Record a fire with a fresh run id.
    #[must_use]
    pub fn new(
        schedule_id: impl Into<String>,
        bot_instance_id: impl Into<String>,
        phase_id: Option<String>,
        source: RunSource,
        minute_key: impl Into<String>,
        fired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            schedule_id: schedule_id.into(),
            bot_instance_id: bot_instance_id.into(),
            phase_id,
            source,
            minute_key: minute_key.into(),
            fired_at,
        }
    }
}

/// Append-only log of fired runs.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    records: Arc<RwLock<Vec<RunRecord>>>,
}

impl RunLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a run.
    pub async fn record(&self, run: RunRecord) {
        self.records.write().await.push(run);
    }

    /// Whether a run already fired for this bot in this minute.
    pub async fn has_fired(&self, bot_instance_id: &str, minute_key: &str) -> bool {
        self.records
            .read()
            .await
            .iter()
            .any(|run| run.bot_instance_id == bot_instance_id && run.minute_key == minute_key)
    }

    /// Most recent runs, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<RunRecord> {
        let records = self.records.read().await;
        records.iter().rev().take(limit).cloned().collect()
    }
}
