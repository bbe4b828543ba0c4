use serde::{Deserialize, Serialize};
use std::fmt;

/// A reel symbol, identified by its configured name (e.g. `"seven"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ordered symbol set of a machine. Order is the evaluation order used for
/// tie-breaks and for locating consolation pairs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct SymbolSet(pub Vec<Symbol>);

impl SymbolSet {
    pub fn from_names(names: &[&str]) -> Self {
        Self(names.iter().map(|n| Symbol::from(*n)).collect())
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains(symbol)
    }

    pub fn index_of(&self, symbol: &Symbol) -> Option<usize> {
        self.0.iter().position(|s| s == symbol)
    }

    pub fn first(&self) -> Option<&Symbol> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Occurrence count of every symbol on the drawn reels, in symbol-set order.
/// Symbols outside the set are appended in draw order.
pub fn tally(drawn: &[Symbol], set: &SymbolSet) -> Vec<(Symbol, usize)> {
    let mut counts: Vec<(Symbol, usize)> = set.iter().map(|s| (s.clone(), 0)).collect();
    for sym in drawn {
        match counts.iter_mut().find(|(s, _)| s == sym) {
            Some((_, n)) => *n += 1,
            None => counts.push((sym.clone(), 1)),
        }
    }
    counts.retain(|(_, n)| *n > 0);
    counts
}

/// Reel positions holding `symbol`, in ascending order.
pub fn positions_of(drawn: &[Symbol], symbol: &Symbol) -> Vec<usize> {
    drawn
        .iter()
        .enumerate()
        .filter(|(_, s)| *s == symbol)
        .map(|(i, _)| i)
        .collect()
}
