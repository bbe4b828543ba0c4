use crate::error::PrestigeError;
use crate::progression::{record_achievement_event, EventKind, PlayerProgressState, Totals};
use crate::Amount;
use serde::{Deserialize, Serialize};
use tracing::info;

// Prestige arithmetic is total over non-negative points and earnings.
pub const MULTIPLIER_PER_POINT: f64 = 0.1;
pub const BASE_STARTING_COINS: Amount = 1_000;
pub const STARTING_COINS_PER_POINT: Amount = 100;
pub const MIN_EARNINGS_TO_PRESTIGE: Amount = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarningsTier {
    pub threshold: Amount,
    pub points: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: String,
    pub points: u64,
    pub bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrestigeRules {
    pub multiplier_per_point: f64,
    pub base_starting_coins: Amount,
    pub starting_coins_per_point: Amount,
    pub min_earnings_to_prestige: Amount,
    /// Ascending by threshold.
    pub earnings_tiers: Vec<EarningsTier>,
    /// Ascending by points.
    pub milestones: Vec<Milestone>,
}

impl Default for PrestigeRules {
    fn default() -> Self {
        let tier = |threshold, points| EarningsTier { threshold, points };
        let milestone = |id: &str, points, bonus| Milestone {
            id: id.to_string(),
            points,
            bonus,
        };
        Self {
            multiplier_per_point: MULTIPLIER_PER_POINT,
            base_starting_coins: BASE_STARTING_COINS,
            starting_coins_per_point: STARTING_COINS_PER_POINT,
            min_earnings_to_prestige: MIN_EARNINGS_TO_PRESTIGE,
            earnings_tiers: vec![
                tier(10_000, 1),
                tier(100_000, 3),
                tier(1_000_000, 10),
                tier(10_000_000, 30),
                tier(100_000_000, 100),
            ],
            milestones: vec![
                milestone("bronze", 5, 0.25),
                milestone("silver", 15, 0.5),
                milestone("gold", 30, 1.0),
                milestone("platinum", 50, 2.0),
                milestone("diamond", 100, 5.0),
            ],
        }
    }
}

impl PrestigeRules {
    /// Checks the orderings the lookups rely on.
    pub fn is_well_formed(&self) -> bool {
        self.multiplier_per_point >= 0.0
            && self.earnings_tiers.windows(2).all(|w| w[0].threshold < w[1].threshold)
            && self.milestones.windows(2).all(|w| w[0].points < w[1].points)
            && self.milestones.iter().all(|m| m.bonus >= 0.0)
    }

    /// Points for the highest earnings tier reached. Always at least 1.
    pub fn reward_for_earnings(&self, total_earnings: Amount) -> u64 {
        self.earnings_tiers
            .iter()
            .rev()
            .find(|t| t.threshold <= total_earnings)
            .map(|t| t.points)
            .unwrap_or(1)
            .max(1)
    }

    /// `1 + points × rate` plus the single largest milestone bonus reached.
    pub fn multiplier_for_points(&self, points: u64) -> f64 {
        let base = 1.0 + points as f64 * self.multiplier_per_point;
        let milestone_bonus = self
            .unlocked_milestones(points)
            .iter()
            .map(|m| m.bonus)
            .fold(0.0, f64::max);
        base + milestone_bonus
    }

    pub fn starting_coins_for_points(&self, points: u64, base_coins: Amount) -> Amount {
        base_coins.saturating_add(points.saturating_mul(self.starting_coins_per_point))
    }

    pub fn next_milestone(&self, points: u64) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.points > points)
    }

    pub fn unlocked_milestones(&self, points: u64) -> Vec<&Milestone> {
        self.milestones.iter().filter(|m| m.points <= points).collect()
    }
}

/// Derived view of a player's prestige standing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrestigeState {
    pub points: u64,
    pub multiplier: f64,
    pub unlocked_milestones: Vec<String>,
    pub next_milestone: Option<Milestone>,
}

impl PrestigeState {
    pub fn from_points(points: u64, rules: &PrestigeRules) -> Self {
        Self {
            points,
            multiplier: rules.multiplier_for_points(points),
            unlocked_milestones: rules
                .unlocked_milestones(points)
                .into_iter()
                .map(|m| m.id.clone())
                .collect(),
            next_milestone: rules.next_milestone(points).cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrestigeOutcome {
    pub points_awarded: u64,
    pub total_points: u64,
    pub multiplier: f64,
    pub starting_coins: Amount,
    pub new_milestones: Vec<String>,
    pub newly_claimable: Vec<String>,
}

/// Points a reset would award right now, if the player is eligible.
pub fn preview(state: &PlayerProgressState, rules: &PrestigeRules) -> Result<u64, PrestigeError> {
    if state.run.earnings < rules.min_earnings_to_prestige {
        return Err(PrestigeError::NotEligible {
            earnings: state.run.earnings,
            required: rules.min_earnings_to_prestige,
        });
    }
    Ok(rules.reward_for_earnings(state.run.earnings))
}

/// Trades the current run for prestige points. Lifetime totals, achievements,
/// the daily challenge and history survive; coins, run totals and the current
/// streak are reset.
pub fn reset(
    mut state: PlayerProgressState,
    rules: &PrestigeRules,
) -> Result<(PlayerProgressState, PrestigeOutcome), PrestigeError> {
    let outcome = reset_in_place(&mut state, rules)?;
    Ok((state, outcome))
}

/// [`reset`] on a borrowed state. A rejected reset leaves `state` untouched.
pub fn reset_in_place(
    state: &mut PlayerProgressState,
    rules: &PrestigeRules,
) -> Result<PrestigeOutcome, PrestigeError> {
    let awarded = preview(state, rules)?;
    let before: Vec<String> = rules
        .unlocked_milestones(state.prestige_points)
        .into_iter()
        .map(|m| m.id.clone())
        .collect();

    state.prestige_points = state.prestige_points.saturating_add(awarded);
    state.prestige_count += 1;
    state.coins = rules.starting_coins_for_points(state.prestige_points, rules.base_starting_coins);
    state.run = Totals::default();
    state.current_win_streak = 0;
    let count = state.prestige_count;
    let newly_claimable = record_achievement_event(state, EventKind::Prestiges, count);

    let new_milestones: Vec<String> = rules
        .unlocked_milestones(state.prestige_points)
        .into_iter()
        .filter(|m| !before.contains(&m.id))
        .map(|m| m.id.clone())
        .collect();
    info!(
        points = awarded,
        total = state.prestige_points,
        milestones = ?new_milestones,
        "prestige reset"
    );
    Ok(PrestigeOutcome {
        points_awarded: awarded,
        total_points: state.prestige_points,
        multiplier: rules.multiplier_for_points(state.prestige_points),
        starting_coins: state.coins,
        new_milestones,
        newly_claimable,
    })
}
