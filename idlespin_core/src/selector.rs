use crate::rng::RandomSource;
use crate::symbols::Symbol;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolWeight {
    pub symbol: Symbol,
    pub weight: f64,
}

impl SymbolWeight {
    pub fn new(symbol: &str, weight: f64) -> Self {
        Self {
            symbol: Symbol::from(symbol),
            weight,
        }
    }
}

fn is_drawable(w: &SymbolWeight) -> bool {
    w.weight.is_finite() && w.weight > 0.0
}

/// Draws one symbol with probability proportional to its weight.
///
/// Non-positive weights are ignored. When nothing is drawable the fallback is
/// returned, or the first listed symbol when there is no fallback. Returns
/// `None` only for an empty list without fallback.
pub fn draw(
    weights: &[SymbolWeight],
    fallback: Option<&Symbol>,
    rng: &mut dyn RandomSource,
) -> Option<Symbol> {
    let total: f64 = weights.iter().filter(|w| is_drawable(w)).map(|w| w.weight).sum();
    if total <= 0.0 {
        return fallback
            .cloned()
            .or_else(|| weights.first().map(|w| w.symbol.clone()));
    }

    let mut remainder = rng.next_f64() * total;
    let mut last = None;
    for entry in weights.iter().filter(|w| is_drawable(w)) {
        remainder -= entry.weight;
        if remainder <= 0.0 {
            return Some(entry.symbol.clone());
        }
        last = Some(&entry.symbol);
    }
    // Float residue can leave a sliver above zero after the last entry.
    last.cloned()
}

/// Draws `reels` symbols independently (with replacement).
pub fn draw_reels(
    weights: &[SymbolWeight],
    fallback: Option<&Symbol>,
    reels: usize,
    rng: &mut dyn RandomSource,
) -> Vec<Symbol> {
    (0..reels)
        .filter_map(|_| draw(weights, fallback, &mut *rng))
        .collect()
}
