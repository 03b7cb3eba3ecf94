//! Bot run phases.

use serde::{Deserialize, Serialize};

/// A named, ordered sub-step of a bot's run.
///
/// Phases are created and edited in the bot configuration flow; the
/// scheduling plane reads them so a single phase can be scheduled
/// independently of the full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// Unique phase identifier.
    pub id: String,
    /// Display name (e.g. "Morning Post").
    pub name: String,
    /// Bot instance this phase belongs to.
    pub bot_instance_id: String,
    /// Position within the bot's run.
    pub order_no: u32,
    /// Opaque configuration payload, interpreted by the runner.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Phase {
    /// Create a new phase.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bot_instance_id: impl Into<String>,
        order_no: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot_instance_id: bot_instance_id.into(),
            order_no,
            config: serde_json::Value::Null,
        }
    }

    /// Attach a configuration payload.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}
