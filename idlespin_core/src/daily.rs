use crate::achievements::EventKind;
use crate::error::ClaimError;
use crate::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyChallengeDef {
    pub id: &'static str,
    pub description: &'static str,
    pub kind: EventKind,
    pub target: u64,
    pub reward: Amount,
}

pub const DAILY_CHALLENGES: &[DailyChallengeDef] = &[
    DailyChallengeDef {
        id: "spin_50",
        description: "Spin 50 times",
        kind: EventKind::Spins,
        target: 50,
        reward: 500,
    },
    DailyChallengeDef {
        id: "win_20",
        description: "Win 20 spins",
        kind: EventKind::Wins,
        target: 20,
        reward: 750,
    },
    DailyChallengeDef {
        id: "earn_5000",
        description: "Earn 5,000 coins",
        kind: EventKind::Earnings,
        target: 5_000,
        reward: 1_000,
    },
    DailyChallengeDef {
        id: "big_win_500",
        description: "Land a single win of 500 coins",
        kind: EventKind::BiggestWin,
        target: 500,
        reward: 1_000,
    },
    DailyChallengeDef {
        id: "spin_150",
        description: "Spin 150 times",
        kind: EventKind::Spins,
        target: 150,
        reward: 1_500,
    },
];

/// Deterministic date → challenge mapping: first four bytes of
/// SHA-256("YYYY-MM-DD"), big-endian, modulo the pool size.
pub fn challenge_for_date(date: NaiveDate) -> &'static DailyChallengeDef {
    let digest = Sha256::digest(date.format("%Y-%m-%d").to_string().as_bytes());
    let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize;
    &DAILY_CHALLENGES[n % DAILY_CHALLENGES.len()]
}

pub fn find(id: &str) -> Option<&'static DailyChallengeDef> {
    DAILY_CHALLENGES.iter().find(|c| c.id == id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DailyChallengeState {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub challenge_id: String,
    #[serde(default)]
    pub progress: u64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub claimed: bool,
}

impl DailyChallengeState {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            challenge_id: challenge_for_date(date).id.to_string(),
            progress: 0,
            completed: false,
            claimed: false,
        }
    }

    pub fn definition(&self) -> Option<&'static DailyChallengeDef> {
        find(&self.challenge_id)
    }

    /// Starts a fresh challenge when the stored date is not `today`.
    pub fn refresh(&mut self, today: NaiveDate) {
        if self.date != Some(today) {
            *self = Self::for_date(today);
        }
    }

    /// Additive for counters, max-based for `BiggestWin`. Returns true when
    /// this update completed the challenge.
    pub fn record(&mut self, kind: EventKind, amount: u64) -> bool {
        let Some(def) = self.definition() else {
            return false;
        };
        if def.kind != kind || self.completed {
            return false;
        }
        self.progress = match kind {
            EventKind::BiggestWin => self.progress.max(amount),
            _ => self.progress.saturating_add(amount),
        };
        if self.progress >= def.target {
            self.completed = true;
            return true;
        }
        false
    }

    /// Grants the reward once per day. A claim on a new day checks a fresh
    /// challenge; a rejected claim leaves the state as it was.
    pub fn claim(&mut self, today: NaiveDate) -> Result<Amount, ClaimError> {
        let mut current = self.clone();
        current.refresh(today);
        let def = current
            .definition()
            .ok_or_else(|| ClaimError::UnknownChallenge(current.challenge_id.clone()))?;
        if current.claimed {
            return Err(ClaimError::AlreadyClaimed);
        }
        if !current.completed {
            return Err(ClaimError::NotReady {
                progress: current.progress,
                requirement: def.target,
            });
        }
        current.claimed = true;
        *self = current;
        Ok(def.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn mapping_is_stable() {
        for d in 1..=28 {
            assert_eq!(challenge_for_date(day(d)).id, challenge_for_date(day(d)).id);
        }
        let distinct: std::collections::HashSet<&str> =
            (1..=28).map(|d| challenge_for_date(day(d)).id).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn resets_on_new_day() {
        let mut s = DailyChallengeState::for_date(day(1));
        s.progress = 3;
        s.refresh(day(1));
        assert_eq!(s.progress, 3);
        s.refresh(day(2));
        assert_eq!(s.progress, 0);
        assert_eq!(s.date, Some(day(2)));
        assert_eq!(s.challenge_id, challenge_for_date(day(2)).id);
    }

    fn state_with(id: &str) -> DailyChallengeState {
        DailyChallengeState {
            date: Some(day(1)),
            challenge_id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn biggest_win_is_max_based() {
        let mut s = state_with("big_win_500");
        assert!(!s.record(EventKind::BiggestWin, 200));
        assert!(!s.record(EventKind::BiggestWin, 100));
        assert_eq!(s.progress, 200);
        assert!(s.record(EventKind::BiggestWin, 600));
    }

    #[test]
    fn other_kinds_are_ignored_and_counters_add() {
        let mut s = state_with("earn_5000");
        s.record(EventKind::Spins, 10);
        assert_eq!(s.progress, 0);
        s.record(EventKind::Earnings, 3_000);
        s.record(EventKind::Earnings, 2_000);
        assert!(s.completed);
    }

    #[test]
    fn claim_flow() {
        let mut s = state_with("spin_50");
        assert_eq!(
            s.claim(day(1)),
            Err(ClaimError::NotReady { progress: 0, requirement: 50 })
        );
        s.record(EventKind::Spins, 50);
        assert_eq!(s.claim(day(1)), Ok(500));
        assert_eq!(s.claim(day(1)), Err(ClaimError::AlreadyClaimed));
    }

    #[test]
    fn rejected_claim_on_new_day_changes_nothing() {
        let mut s = state_with("spin_50");
        s.record(EventKind::Spins, 20);
        let before = s.clone();
        assert!(matches!(s.claim(day(2)), Err(ClaimError::NotReady { progress: 0, .. })));
        assert_eq!(s, before);
    }

    #[test]
    fn unknown_challenge_id() {
        let mut s = state_with("retired_challenge");
        assert_eq!(
            s.claim(day(1)),
            Err(ClaimError::UnknownChallenge("retired_challenge".into()))
        );
    }
}
