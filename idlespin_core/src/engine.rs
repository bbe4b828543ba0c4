use crate::{
    machine::{MachineConfig, PayoutProfile},
    rng::RandomSource,
    selector::draw_reels,
    symbols::{positions_of, tally, Symbol, SymbolSet},
    tier::{Tier, TierThresholds},
    Amount,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpinOutcome {
    pub symbols: Vec<Symbol>,
    pub win: Amount,
    /// win / bet rounded to two decimals, 0 when nothing was won.
    pub multiplier: f64,
    pub tier: Option<Tier>,
    pub winning_indices: Vec<usize>,
    pub jackpot: bool,
    pub ultra_jackpot: bool,
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        self.win > 0
    }

    fn losing(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            win: 0,
            multiplier: 0.0,
            tier: None,
            winning_indices: Vec::new(),
            jackpot: false,
            ultra_jackpot: false,
        }
    }
}

/// `round(bet × multiplier)`, saturating on overflow.
pub fn scaled(bet: Amount, multiplier: f64) -> Amount {
    let v = (bet as f64 * multiplier).round();
    if v <= 0.0 {
        0
    } else if v >= Amount::MAX as f64 {
        Amount::MAX
    } else {
        v as Amount
    }
}

fn ratio(win: Amount, bet: Amount) -> f64 {
    if bet == 0 || win == 0 {
        return 0.0;
    }
    ((win as f64 / bet as f64) * 100.0).round() / 100.0
}

/// Draws one symbol per reel. A new random value is consumed for every reel.
pub fn draw_symbols(machine: &MachineConfig, rng: &mut dyn RandomSource) -> Vec<Symbol> {
    draw_reels(
        &machine.profile.weights,
        machine.fallback_symbol(),
        machine.reels,
        rng,
    )
}

/// Paytable and consolation evaluation for a fixed draw. Pure: no randomness.
///
/// Among symbols with a qualifying line the highest multiplier wins; equal
/// multipliers go to the symbol listed first in the machine's symbol set.
pub fn evaluate_symbols(
    symbols: &SymbolSet,
    profile: &PayoutProfile,
    drawn: &[Symbol],
    bet: Amount,
    thresholds: &TierThresholds,
) -> SpinOutcome {
    let counts = tally(drawn, symbols);

    let mut best: Option<(&Symbol, u8, f64)> = None;
    for (symbol, occurrences) in &counts {
        if let Some(entry) = profile.paytable.best_for(symbol, *occurrences) {
            let better = match best {
                None => true,
                Some((_, _, m)) => entry.payout_multiplier > m,
            };
            if better {
                best = Some((symbol, entry.count, entry.payout_multiplier));
            }
        }
    }

    if let Some((symbol, count, multiplier)) = best {
        let win = scaled(bet, multiplier);
        let mut winning_indices = positions_of(drawn, symbol);
        winning_indices.truncate(count as usize);
        let multiplier = ratio(win, bet);
        return SpinOutcome {
            symbols: drawn.to_vec(),
            win,
            multiplier,
            tier: if win > 0 { thresholds.classify(multiplier) } else { None },
            winning_indices,
            jackpot: false,
            ultra_jackpot: false,
        };
    }

    if profile.consolation_multiplier > 0.0 {
        if let Some((pair, _)) = counts.iter().find(|(_, n)| *n == 2) {
            let win = scaled(bet, profile.consolation_multiplier);
            let multiplier = ratio(win, bet);
            return SpinOutcome {
                symbols: drawn.to_vec(),
                win,
                multiplier,
                tier: if win > 0 { thresholds.classify(multiplier) } else { None },
                winning_indices: positions_of(drawn, pair),
                jackpot: false,
                ultra_jackpot: false,
            };
        }
    }

    SpinOutcome::losing(drawn.to_vec())
}

/// Jackpot rolls followed by paytable evaluation of an already drawn set of
/// reels. Consumes exactly one random value for the ultra roll and, if that
/// misses, one more for the jackpot roll.
pub fn evaluate_drawn(
    machine: &MachineConfig,
    drawn: Vec<Symbol>,
    bet: Amount,
    thresholds: &TierThresholds,
    rng: &mut dyn RandomSource,
) -> SpinOutcome {
    let profile = &machine.profile;
    let all: Vec<usize> = (0..drawn.len()).collect();

    if rng.next_f64() < profile.ultra_jackpot_chance {
        let win = scaled(bet, profile.ultra_jackpot_multiplier);
        return SpinOutcome {
            multiplier: ratio(win, bet),
            win,
            symbols: drawn,
            tier: Some(Tier::Ultra),
            winning_indices: all,
            jackpot: false,
            ultra_jackpot: true,
        };
    }

    if rng.next_f64() < profile.jackpot_chance {
        let win = scaled(bet, profile.jackpot_multiplier);
        return SpinOutcome {
            multiplier: ratio(win, bet),
            win,
            symbols: drawn,
            tier: Some(Tier::Jackpot),
            winning_indices: all,
            jackpot: true,
            ultra_jackpot: false,
        };
    }

    evaluate_symbols(&machine.symbols, profile, &drawn, bet, thresholds)
}

/// Full spin: draw every reel, then evaluate. `bet` must be positive; callers
/// validate it against the machine's options first.
pub fn spin_once(
    machine: &MachineConfig,
    bet: Amount,
    thresholds: &TierThresholds,
    rng: &mut dyn RandomSource,
) -> SpinOutcome {
    let drawn = draw_symbols(machine, rng);
    let outcome = evaluate_drawn(machine, drawn, bet, thresholds, rng);
    debug!(
        machine = %machine.id,
        bet,
        win = outcome.win,
        tier = ?outcome.tier,
        "spin evaluated"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineCatalog;
    use crate::rng::SeededRandom;

    #[test]
    fn test_spin_deterministic() {
        let catalog = MachineCatalog::builtin();
        let machine = catalog.get("classic").unwrap();
        let thresholds = TierThresholds::default();
        let out1 = spin_once(machine, 5, &thresholds, &mut SeededRandom::new("server", "client", 1));
        let out2 = spin_once(machine, 5, &thresholds, &mut SeededRandom::new("server", "client", 1));
        assert_eq!(out1, out2);
        assert_eq!(out1.symbols.len(), 3);
    }

    #[test]
    fn scaled_rounds_half_away_from_zero() {
        assert_eq!(scaled(10, 0.5), 5);
        assert_eq!(scaled(3, 0.5), 2);
        assert_eq!(scaled(1, 0.49), 0);
        assert_eq!(scaled(u64::MAX, 10.0), u64::MAX);
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        assert_eq!(ratio(1, 3), 0.33);
        assert_eq!(ratio(2, 3), 0.67);
        assert_eq!(ratio(0, 3), 0.0);
    }
}
