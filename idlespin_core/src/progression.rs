use crate::achievements::AchievementBook;
pub use crate::achievements::EventKind;
use crate::daily::DailyChallengeState;
use crate::engine::SpinOutcome;
use crate::error::ClaimError;
use crate::history::SpinHistory;
use crate::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Totals {
    pub spins: u64,
    pub wins: u64,
    pub earnings: Amount,
    pub biggest_win: Amount,
    pub jackpots: u64,
}

impl Totals {
    fn record_spin(&mut self, credited: Amount, jackpot: bool) {
        self.spins += 1;
        if credited > 0 {
            self.wins += 1;
        }
        self.earnings = self.earnings.saturating_add(credited);
        self.biggest_win = self.biggest_win.max(credited);
        if jackpot {
            self.jackpots += 1;
        }
    }
}

/// Everything persisted per player. Only changed through this crate's update
/// functions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlayerProgressState {
    pub coins: Amount,
    #[serde(default)]
    pub prestige_points: u64,
    #[serde(default)]
    pub prestige_count: u64,
    #[serde(default)]
    pub lifetime: Totals,
    /// Reset on prestige.
    #[serde(default)]
    pub run: Totals,
    #[serde(default)]
    pub current_win_streak: u64,
    #[serde(default)]
    pub max_win_streak: u64,
    #[serde(default)]
    pub achievements: AchievementBook,
    #[serde(default)]
    pub daily: DailyChallengeState,
    #[serde(default)]
    pub history: SpinHistory,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

impl PlayerProgressState {
    pub fn new(starting_coins: Amount) -> Self {
        Self {
            coins: starting_coins,
            ..Default::default()
        }
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history = SpinHistory::with_cap(cap);
        self
    }
}

pub struct SpinEvent<'a> {
    pub outcome: &'a SpinOutcome,
    pub bet: Amount,
    /// Coins actually paid out, after the prestige multiplier.
    pub credited: Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub state: PlayerProgressState,
    pub newly_claimable: Vec<String>,
    pub daily_completed: bool,
}

pub fn record_achievement_event(
    state: &mut PlayerProgressState,
    kind: EventKind,
    value: u64,
) -> Vec<String> {
    state.achievements.record(kind, value)
}

fn record_lifetime_achievements(state: &mut PlayerProgressState) -> Vec<String> {
    let events = [
        (EventKind::Spins, state.lifetime.spins),
        (EventKind::Wins, state.lifetime.wins),
        (EventKind::Earnings, state.lifetime.earnings),
        (EventKind::BiggestWin, state.lifetime.biggest_win),
        (EventKind::WinStreak, state.max_win_streak),
        (EventKind::Jackpots, state.lifetime.jackpots),
    ];
    events
        .into_iter()
        .flat_map(|(kind, value)| state.achievements.record(kind, value))
        .collect()
}

/// Applies one accepted spin: debits the bet, credits the payout, bumps
/// totals, streaks, achievement progress and the daily challenge.
pub fn apply_spin(
    mut state: PlayerProgressState,
    event: &SpinEvent<'_>,
    today: NaiveDate,
) -> ProgressUpdate {
    let credited = event.credited;
    let jackpot = event.outcome.jackpot || event.outcome.ultra_jackpot;

    state.coins = state.coins.saturating_sub(event.bet).saturating_add(credited);
    state.lifetime.record_spin(credited, jackpot);
    state.run.record_spin(credited, jackpot);

    if credited > 0 {
        state.current_win_streak += 1;
        state.max_win_streak = state.max_win_streak.max(state.current_win_streak);
    } else {
        state.current_win_streak = 0;
    }

    let newly_claimable = record_lifetime_achievements(&mut state);

    state.daily.refresh(today);
    let mut daily_completed = state.daily.record(EventKind::Spins, 1);
    if credited > 0 {
        daily_completed |= state.daily.record(EventKind::Wins, 1);
        daily_completed |= state.daily.record(EventKind::Earnings, credited);
        daily_completed |= state.daily.record(EventKind::BiggestWin, credited);
    }

    ProgressUpdate {
        state,
        newly_claimable,
        daily_completed,
    }
}

/// Credits passive income (offline catch-up). Counts toward earnings only.
pub fn apply_income(mut state: PlayerProgressState, amount: Amount, today: NaiveDate) -> ProgressUpdate {
    state.coins = state.coins.saturating_add(amount);
    state.lifetime.earnings = state.lifetime.earnings.saturating_add(amount);
    state.run.earnings = state.run.earnings.saturating_add(amount);
    let lifetime_earnings = state.lifetime.earnings;
    let newly_claimable = record_achievement_event(&mut state, EventKind::Earnings, lifetime_earnings);
    state.daily.refresh(today);
    let daily_completed = amount > 0 && state.daily.record(EventKind::Earnings, amount);
    ProgressUpdate {
        state,
        newly_claimable,
        daily_completed,
    }
}

/// Claimable → Unlocked. Grants the reward once; rejected claims change nothing.
pub fn claim_achievement(state: &mut PlayerProgressState, id: &str) -> Result<Amount, ClaimError> {
    let reward = state.achievements.claim(id)?;
    state.coins = state.coins.saturating_add(reward);
    info!(achievement = id, reward, "achievement claimed");
    Ok(reward)
}

pub fn claim_daily(state: &mut PlayerProgressState, today: NaiveDate) -> Result<Amount, ClaimError> {
    let reward = state.daily.claim(today)?;
    state.coins = state.coins.saturating_add(reward);
    info!(challenge = %state.daily.challenge_id, reward, "daily challenge claimed");
    Ok(reward)
}
