use crate::error::ClaimError;
use crate::Amount;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Counter an achievement or daily challenge tracks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Spins,
    Wins,
    Earnings,
    BiggestWin,
    WinStreak,
    Jackpots,
    Prestiges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: EventKind,
    pub requirement: u64,
    pub reward: Amount,
}

const fn def(
    id: &'static str,
    name: &'static str,
    kind: EventKind,
    requirement: u64,
    reward: Amount,
) -> AchievementDef {
    AchievementDef {
        id,
        name,
        kind,
        requirement,
        reward,
    }
}

pub const ACHIEVEMENTS: &[AchievementDef] = &[
    def("first_spin", "First Pull", EventKind::Spins, 1, 50),
    def("spins_100", "Regular", EventKind::Spins, 100, 500),
    def("spins_1000", "High Roller", EventKind::Spins, 1_000, 5_000),
    def("first_win", "Beginner's Luck", EventKind::Wins, 1, 50),
    def("wins_100", "Lucky Streak", EventKind::Wins, 100, 1_000),
    def("earn_10k", "Pocket Money", EventKind::Earnings, 10_000, 1_000),
    def("earn_1m", "Millionaire", EventKind::Earnings, 1_000_000, 50_000),
    def("big_win_1k", "Big Hit", EventKind::BiggestWin, 1_000, 2_000),
    def("streak_5", "Hot Hand", EventKind::WinStreak, 5, 500),
    def("streak_10", "On Fire", EventKind::WinStreak, 10, 2_500),
    def("first_jackpot", "Jackpot!", EventKind::Jackpots, 1, 5_000),
    def("first_prestige", "Born Again", EventKind::Prestiges, 1, 1_000),
];

pub fn find(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementStatus {
    Locked,
    Claimable,
    Unlocked,
}

/// Per-achievement progress plus the claimable and unlocked sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AchievementBook {
    #[serde(default)]
    pub progress: BTreeMap<String, u64>,
    #[serde(default)]
    pub claimable: BTreeSet<String>,
    #[serde(default)]
    pub unlocked: BTreeSet<String>,
}

impl AchievementBook {
    pub fn progress_of(&self, id: &str) -> u64 {
        self.progress.get(id).copied().unwrap_or(0)
    }

    pub fn status(&self, def: &AchievementDef) -> AchievementStatus {
        if self.unlocked.contains(def.id) {
            AchievementStatus::Unlocked
        } else if self.progress_of(def.id) >= def.requirement {
            AchievementStatus::Claimable
        } else {
            AchievementStatus::Locked
        }
    }

    /// Raises progress of every achievement tracking `kind` to `value` (never
    /// lowers it). Returns ids that became claimable with this update.
    pub fn record(&mut self, kind: EventKind, value: u64) -> Vec<String> {
        let mut newly = Vec::new();
        for def in ACHIEVEMENTS.iter().filter(|a| a.kind == kind) {
            let slot = self.progress.entry(def.id.to_string()).or_insert(0);
            *slot = (*slot).max(value);
            if *slot >= def.requirement
                && !self.unlocked.contains(def.id)
                && self.claimable.insert(def.id.to_string())
            {
                newly.push(def.id.to_string());
            }
        }
        newly
    }

    /// Marks a claimable achievement unlocked and returns its reward.
    /// Leaves the book untouched on rejection.
    pub fn claim(&mut self, id: &str) -> Result<Amount, ClaimError> {
        let def = find(id).ok_or_else(|| ClaimError::UnknownAchievement(id.to_string()))?;
        match self.status(def) {
            AchievementStatus::Unlocked => Err(ClaimError::AlreadyClaimed),
            AchievementStatus::Locked => Err(ClaimError::NotReady {
                progress: self.progress_of(id),
                requirement: def.requirement,
            }),
            AchievementStatus::Claimable => {
                self.claimable.remove(id);
                self.unlocked.insert(id.to_string());
                Ok(def.reward)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let ids: BTreeSet<&str> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn progress_never_decreases() {
        let mut book = AchievementBook::default();
        book.record(EventKind::WinStreak, 4);
        book.record(EventKind::WinStreak, 1);
        assert_eq!(book.progress_of("streak_5"), 4);
    }

    #[test]
    fn locked_claimable_unlocked() {
        let mut book = AchievementBook::default();
        book.record(EventKind::WinStreak, 4);
        assert_eq!(
            book.claim("streak_5"),
            Err(ClaimError::NotReady { progress: 4, requirement: 5 })
        );
        let newly = book.record(EventKind::WinStreak, 5);
        assert_eq!(newly, vec!["streak_5".to_string()]);
        assert_eq!(book.status(find("streak_5").unwrap()), AchievementStatus::Claimable);
        // already claimable: not reported twice
        assert!(book.record(EventKind::WinStreak, 6).is_empty());

        assert_eq!(book.claim("streak_5"), Ok(500));
        assert_eq!(book.claim("streak_5"), Err(ClaimError::AlreadyClaimed));
        assert!(book.record(EventKind::WinStreak, 7).is_empty());
        assert!(!book.claimable.contains("streak_5"));
    }

    #[test]
    fn unknown_id() {
        let mut book = AchievementBook::default();
        assert_eq!(
            book.claim("nope"),
            Err(ClaimError::UnknownAchievement("nope".into()))
        );
    }
}
