//! Bot instance reference data.
//!
//! Bot instances are owned by the bot-lifecycle service; the scheduling
//! plane only reads them to decide what may be dragged onto the calendar
//! and to resolve display names.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a bot instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Inactive,
    Ready,
    Running,
    Error,
}

/// Result of the most recent credential/configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Valid,
    Invalid,
}

/// A configured automation unit belonging to a creator account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInstance {
    /// Unique instance identifier.
    pub id: String,
    /// Short code naming the bot kind (e.g. "fanvue_post").
    pub bot_code: String,
    /// Account that owns this instance.
    pub owner_id: String,
    /// Lifecycle status.
    pub status: BotStatus,
    /// Validation status; only validated bots are schedulable.
    pub validation_status: ValidationStatus,
    /// Optional platform tag (e.g. "fanvue").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl BotInstance {
    /// Create a new instance in the pre-validation state.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        bot_code: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            bot_code: bot_code.into(),
            owner_id: owner_id.into(),
            status: BotStatus::Inactive,
            validation_status: ValidationStatus::Pending,
            platform: None,
        }
    }

    /// Set the lifecycle status.
    #[must_use]
    pub fn with_status(mut self, status: BotStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the validation status.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationStatus) -> Self {
        self.validation_status = validation;
        self
    }

    /// Set the platform tag.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Whether this bot may be scheduled at all.
    ///
    /// Mirrors the console's sidebar filter: only validated bots are
    /// offered as drag sources.
    #[must_use]
    pub fn is_schedulable(&self) -> bool {
        self.validation_status == ValidationStatus::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validated_bots_are_schedulable() {
        let bot = BotInstance::new("bot_1", "fanvue_post", "user_1");
        assert!(!bot.is_schedulable());

        let bot = bot.with_validation(ValidationStatus::Valid);
        assert!(bot.is_schedulable());

        let bot = bot.with_validation(ValidationStatus::Invalid);
        assert!(!bot.is_schedulable());
    }
}
