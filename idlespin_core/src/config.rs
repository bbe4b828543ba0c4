use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAP;
use crate::offline::DEFAULT_MAX_OFFLINE_HOURS;
use crate::prestige::PrestigeRules;
use crate::tier::TierThresholds;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IDLE_COINS_PER_SECOND: f64 = 0.5;

/// Game-wide tuning shared by every machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameRules {
    pub tiers: TierThresholds,
    pub prestige: PrestigeRules,
    pub idle_coins_per_second: f64,
    pub max_offline_hours: u64,
    pub history_cap: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            tiers: TierThresholds::default(),
            prestige: PrestigeRules::default(),
            idle_coins_per_second: DEFAULT_IDLE_COINS_PER_SECOND,
            max_offline_hours: DEFAULT_MAX_OFFLINE_HOURS,
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }
}

impl GameRules {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let rules: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tiers.is_ascending() {
            return Err(ConfigError::Malformed("tier thresholds must be positive and ascending".into()));
        }
        if !self.prestige.is_well_formed() {
            return Err(ConfigError::Malformed("prestige tiers and milestones must be ascending".into()));
        }
        if !(self.idle_coins_per_second.is_finite() && self.idle_coins_per_second >= 0.0) {
            return Err(ConfigError::Malformed("idle_coins_per_second must be non-negative".into()));
        }
        if self.history_cap == 0 {
            return Err(ConfigError::Malformed("history_cap must be at least 1".into()));
        }
        Ok(())
    }
}
