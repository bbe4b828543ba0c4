use serde::{Deserialize, Serialize};
use std::fmt;

pub const SMALL_WIN_RATIO: f64 = 1.0;
pub const BIG_WIN_RATIO: f64 = 5.0;
pub const MEGA_WIN_RATIO: f64 = 15.0;
pub const JACKPOT_WIN_RATIO: f64 = 50.0;
pub const ULTRA_WIN_RATIO: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Small,
    Big,
    Mega,
    Jackpot,
    Ultra,
}

impl Tier {
    pub const ALL: [Tier; 5] = [Tier::Small, Tier::Big, Tier::Mega, Tier::Jackpot, Tier::Ultra];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Small => "small",
            Tier::Big => "big",
            Tier::Mega => "mega",
            Tier::Jackpot => "jackpot",
            Tier::Ultra => "ultra",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Ascending win/bet ratios at which each tier starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierThresholds {
    pub small: f64,
    pub big: f64,
    pub mega: f64,
    pub jackpot: f64,
    pub ultra: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            small: SMALL_WIN_RATIO,
            big: BIG_WIN_RATIO,
            mega: MEGA_WIN_RATIO,
            jackpot: JACKPOT_WIN_RATIO,
            ultra: ULTRA_WIN_RATIO,
        }
    }
}

impl TierThresholds {
    fn ordered(&self) -> [(Tier, f64); 5] {
        [
            (Tier::Small, self.small),
            (Tier::Big, self.big),
            (Tier::Mega, self.mega),
            (Tier::Jackpot, self.jackpot),
            (Tier::Ultra, self.ultra),
        ]
    }

    pub fn is_ascending(&self) -> bool {
        let t = self.ordered();
        t.windows(2).all(|w| w[0].1 < w[1].1) && t[0].1 > 0.0
    }

    /// Highest tier whose threshold `multiplier` meets, or `None` below small.
    pub fn classify(&self, multiplier: f64) -> Option<Tier> {
        self.ordered()
            .iter()
            .rev()
            .find(|(_, threshold)| multiplier >= *threshold)
            .map(|(tier, _)| *tier)
    }
}

/// Classifies against the default thresholds.
pub fn classify(multiplier: f64) -> Option<Tier> {
    TierThresholds::default().classify(multiplier)
}
