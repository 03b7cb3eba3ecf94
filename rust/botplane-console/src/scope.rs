//! Console visibility scope.
//!
//! The creator console shows one account's bots; the agency console shows
//! every account the agency manages. Both run the same engine - the scope
//! is the only difference, so it is a parameter instead of a forked view.

use schedule_core::BotInstance;

/// Which bots (and therefore schedules) the console operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleScope {
    /// A single creator account.
    Creator {
        /// The creator's account id.
        owner_id: String,
    },
    /// An agency managing several creator accounts.
    Agency {
        /// Accounts the agency manages.
        owner_ids: Vec<String>,
    },
}

impl ConsoleScope {
    /// Scope for a single creator account.
    #[must_use]
    pub fn creator(owner_id: impl Into<String>) -> Self {
        Self::Creator {
            owner_id: owner_id.into(),
        }
    }

    /// Scope for an agency managing the given accounts.
    #[must_use]
    pub fn agency(owner_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Agency {
            owner_ids: owner_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a bot instance is visible in this scope.
    #[must_use]
    pub fn includes(&self, bot: &BotInstance) -> bool {
        match self {
            Self::Creator { owner_id } => bot.owner_id == *owner_id,
            Self::Agency { owner_ids } => owner_ids.iter().any(|id| *id == bot.owner_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_scope_sees_only_its_own_bots() {
        let scope = ConsoleScope::creator("user_1");
        assert!(scope.includes(&BotInstance::new("bot_1", "fanvue_post", "user_1")));
        assert!(!scope.includes(&BotInstance::new("bot_2", "fanvue_post", "user_2")));
    }

    #[test]
    fn agency_scope_spans_managed_accounts() {
        let scope = ConsoleScope::agency(["user_1", "user_2"]);
        assert!(scope.includes(&BotInstance::new("bot_1", "of_dm", "user_2")));
        assert!(!scope.includes(&BotInstance::new("bot_3", "of_dm", "user_9")));
    }
}
