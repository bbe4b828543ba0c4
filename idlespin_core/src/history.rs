use crate::engine::SpinOutcome;
use crate::symbols::Symbol;
use crate::tier::Tier;
use crate::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAP: usize = 200;

fn default_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

// Stored states may carry a zero cap; a ring needs room for one entry.
fn cap_at_least_one<'de, D: serde::Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    Ok(usize::deserialize(d)?.max(1))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub machine_id: String,
    pub bet: Amount,
    pub symbols: Vec<Symbol>,
    pub win: Amount,
    pub credited: Amount,
    pub tier: Option<Tier>,
}

impl HistoryEntry {
    pub fn from_outcome(
        at: DateTime<Utc>,
        machine_id: &str,
        bet: Amount,
        outcome: &SpinOutcome,
        credited: Amount,
    ) -> Self {
        Self {
            at,
            machine_id: machine_id.to_string(),
            bet,
            symbols: outcome.symbols.clone(),
            win: outcome.win,
            credited,
            tier: outcome.tier,
        }
    }
}

/// Recent spins, newest last. Oldest entries are evicted beyond `cap`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpinHistory {
    #[serde(default = "default_cap", deserialize_with = "cap_at_least_one")]
    cap: usize,
    #[serde(default)]
    entries: VecDeque<HistoryEntry>,
}

impl Default for SpinHistory {
    fn default() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }
}

impl SpinHistory {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.cap.max(1) {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Up to `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(win: Amount) -> HistoryEntry {
        HistoryEntry {
            at: Utc::now(),
            machine_id: "classic".into(),
            bet: 1,
            symbols: vec![Symbol::from("bar")],
            win,
            credited: win,
            tier: None,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut h = SpinHistory::with_cap(3);
        for win in 0..5 {
            h.push(entry(win));
        }
        assert_eq!(h.len(), 3);
        let wins: Vec<Amount> = h.iter().map(|e| e.win).collect();
        assert_eq!(wins, vec![2, 3, 4]);
        assert_eq!(h.recent(1)[0].win, 4);
    }

    #[test]
    fn zero_cap_from_storage_still_accepts_pushes() {
        let mut h: SpinHistory = serde_json::from_str(r#"{"cap":0,"entries":[]}"#).unwrap();
        assert_eq!(h.cap(), 1);
        h.push(entry(1));
        h.push(entry(2));
        assert_eq!(h.len(), 1);
        assert_eq!(h.recent(1)[0].win, 2);
    }

    #[test]
    fn round_trips_json() {
        let mut h = SpinHistory::default();
        h.push(entry(7));
        let json = serde_json::to_string(&h).unwrap();
        let back: SpinHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert_eq!(back.cap(), DEFAULT_HISTORY_CAP);
    }
}
