use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collaborators::config::env_override;

use super::machine::DEFAULT_ACKNOWLEDGEMENT;
use super::part::PartPolicyTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wall-clock length of one test second.
    pub tick_interval: Duration,
    pub voice_id: String,
    /// Examiner line used when the dialogue service fails.
    pub fallback_acknowledgement: String,
    pub command_capacity: usize,
    pub event_capacity: usize,
    pub policies: PartPolicyTable,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            voice_id: "alloy".to_string(),
            fallback_acknowledgement: DEFAULT_ACKNOWLEDGEMENT.to_string(),
            command_capacity: 16,
            event_capacity: 64,
            policies: PartPolicyTable::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(voice) = env_override("SPEAKING_COACH_VOICE") {
            config.voice_id = voice;
        }
        if let Some(raw) = env_override("SPEAKING_COACH_TICK_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.tick_interval = Duration::from_millis(ms),
                _ => warn!(
                    target: "session_manager",
                    value = %raw,
                    "ignoring invalid SPEAKING_COACH_TICK_MS"
                ),
            }
        }
        config
    }
}
