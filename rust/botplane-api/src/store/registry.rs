//! Bot and phase registry.
//!
//! Read-mostly reference data: the bot-lifecycle service owns these
//! records, the scheduling plane only resolves ids and display names
//! against them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use schedule_core::{BotInstance, BotStatus, Phase, ValidationStatus};

/// Bot and phase lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    bots: Arc<RwLock<HashMap<String, BotInstance>>>,
    phases: Arc<RwLock<HashMap<String, Phase>>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the demo fleet.
    #[must_use]
    pub fn with_demo_data() -> Self {
        let bots = [
            BotInstance::new("bot_1", "f2f_post", "creator_1")
                .with_status(BotStatus::Ready)
                .with_validation(ValidationStatus::Valid)
                .with_platform("f2f"),
            BotInstance::new("bot_2", "f2f_dm", "creator_1")
                .with_status(BotStatus::Ready)
                .with_validation(ValidationStatus::Valid)
                .with_platform("f2f"),
            BotInstance::new("bot_3", "of_post", "creator_1")
                .with_platform("onlyfans"),
            BotInstance::new("bot_4", "of_dm", "creator_1")
                .with_status(BotStatus::Ready)
                .with_validation(ValidationStatus::Valid)
                .with_platform("onlyfans"),
            BotInstance::new("bot_5", "fanvue_post", "creator_2")
                .with_status(BotStatus::Ready)
                .with_validation(ValidationStatus::Valid)
                .with_platform("fanvue"),
            BotInstance::new("bot_6", "fanvue_dm", "creator_2")
                .with_platform("fanvue"),
        ];
        let phases = [
            Phase::new("phase_1", "Morning Post", "bot_1", 1),
            Phase::new("phase_2", "Evening DM", "bot_2", 1),
            Phase::new("phase_3", "Weekend Special", "bot_4", 1),
        ];

        let bots: HashMap<String, BotInstance> =
            bots.into_iter().map(|bot| (bot.id.clone(), bot)).collect();
        let phases: HashMap<String, Phase> = phases
            .into_iter()
            .map(|phase| (phase.id.clone(), phase))
            .collect();

        Self {
            bots: Arc::new(RwLock::new(bots)),
            phases: Arc::new(RwLock::new(phases)),
        }
    }

    /// Insert or replace a bot.
    pub async fn upsert_bot(&self, bot: BotInstance) {
        self.bots.write().await.insert(bot.id.clone(), bot);
    }

    /// Insert or replace a phase.
    pub async fn upsert_phase(&self, phase: Phase) {
        self.phases.write().await.insert(phase.id.clone(), phase);
    }

    /// A bot by id.
    pub async fn bot(&self, id: &str) -> Option<BotInstance> {
        self.bots.read().await.get(id).cloned()
    }

    /// All bots, ordered by code.
    pub async fn list_bots(&self) -> Vec<BotInstance> {
        let mut bots: Vec<BotInstance> = self.bots.read().await.values().cloned().collect();
        bots.sort_by(|a, b| a.bot_code.cmp(&b.bot_code).then_with(|| a.id.cmp(&b.id)));
        bots
    }

    /// A phase by id.
    pub async fn phase(&self, id: &str) -> Option<Phase> {
        self.phases.read().await.get(id).cloned()
    }

    /// A bot's phases, ordered by position.
    pub async fn phases_for(&self, bot_instance_id: &str) -> Vec<Phase> {
        let mut phases: Vec<Phase> = self
            .phases
            .read()
            .await
            .values()
            .filter(|phase| phase.bot_instance_id == bot_instance_id)
            .cloned()
            .collect();
        phases.sort_by_key(|phase| phase.order_no);
        phases
    }

    /// Snapshot of the bot table, for projections.
    pub async fn bot_map(&self) -> HashMap<String, BotInstance> {
        self.bots.read().await.clone()
    }

    /// Snapshot of the phase table, for projections.
    pub async fn phase_map(&self) -> HashMap<String, Phase> {
        self.phases.read().await.clone()
    }
}
