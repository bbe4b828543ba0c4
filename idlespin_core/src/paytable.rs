use crate::symbols::Symbol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaytableEntry {
    pub symbol: Symbol,
    pub count: u8,
    pub payout_multiplier: f64,
}

impl PaytableEntry {
    pub fn new(symbol: &str, count: u8, payout_multiplier: f64) -> Self {
        Self {
            symbol: Symbol::from(symbol),
            count,
            payout_multiplier,
        }
    }
}

/// Per-symbol match-count → multiplier table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Paytable(pub Vec<PaytableEntry>);

impl Paytable {
    pub fn has_symbol(&self, symbol: &Symbol) -> bool {
        self.0.iter().any(|e| &e.symbol == symbol)
    }

    /// Entry with the largest match count that does not exceed `occurrences`.
    pub fn best_for(&self, symbol: &Symbol, occurrences: usize) -> Option<&PaytableEntry> {
        self.0
            .iter()
            .filter(|e| &e.symbol == symbol && (e.count as usize) <= occurrences && e.count > 0)
            .max_by_key(|e| e.count)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PaytableEntry> {
        self.0.iter()
    }
}
