use crate::error::ConfigError;
use crate::paytable::{Paytable, PaytableEntry};
use crate::selector::SymbolWeight;
use crate::symbols::{Symbol, SymbolSet};
use crate::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayoutProfile {
    pub weights: Vec<SymbolWeight>,
    pub paytable: Paytable,
    pub jackpot_chance: f64,
    pub ultra_jackpot_chance: f64,
    pub jackpot_multiplier: f64,
    pub ultra_jackpot_multiplier: f64,
    /// Paid on an exact pair of a symbol with no qualifying paytable line. 0 disables.
    #[serde(default)]
    pub consolation_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineConfig {
    pub id: String,
    pub name: String,
    pub reels: usize,
    pub rows: usize,
    pub symbols: SymbolSet,
    pub profile: PayoutProfile,
    pub bet_options: Vec<Amount>,
}

fn check_chance(machine: &str, field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidChance {
            machine: machine.to_string(),
            field,
            value,
        })
    }
}

fn check_multiplier(machine: &str, field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidMultiplier {
            machine: machine.to_string(),
            field,
            value,
        })
    }
}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let machine = self.id.clone();
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptySymbolSet { machine });
        }
        if self.reels == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyGrid { machine });
        }
        let p = &self.profile;
        if let Some(w) = p.weights.iter().find(|w| !self.symbols.contains(&w.symbol)) {
            return Err(ConfigError::UnknownWeightSymbol {
                machine,
                symbol: w.symbol.clone(),
            });
        }
        if !p.weights.iter().any(|w| w.weight.is_finite() && w.weight > 0.0) {
            return Err(ConfigError::NoPositiveWeight { machine });
        }
        for entry in p.paytable.entries() {
            if !self.symbols.contains(&entry.symbol) {
                return Err(ConfigError::UnknownPaytableSymbol {
                    machine,
                    symbol: entry.symbol.clone(),
                });
            }
            if entry.count == 0 || entry.count as usize > self.reels {
                return Err(ConfigError::MatchCountOutOfRange {
                    machine,
                    symbol: entry.symbol.clone(),
                    count: entry.count,
                    reels: self.reels,
                });
            }
            check_multiplier(&self.id, "payout_multiplier", entry.payout_multiplier)?;
        }
        check_chance(&self.id, "jackpot_chance", p.jackpot_chance)?;
        check_chance(&self.id, "ultra_jackpot_chance", p.ultra_jackpot_chance)?;
        check_multiplier(&self.id, "jackpot_multiplier", p.jackpot_multiplier)?;
        check_multiplier(&self.id, "ultra_jackpot_multiplier", p.ultra_jackpot_multiplier)?;
        check_multiplier(&self.id, "consolation_multiplier", p.consolation_multiplier)?;
        if self.bet_options.is_empty() || self.bet_options.contains(&0) {
            return Err(ConfigError::InvalidBetOptions { machine });
        }
        Ok(())
    }

    pub fn accepts_bet(&self, bet: Amount) -> bool {
        bet > 0 && self.bet_options.contains(&bet)
    }

    /// Nearest configured bet option; ties go to the lower option.
    pub fn resolve_bet(&self, requested: Amount) -> Amount {
        let mut best: Option<Amount> = None;
        for &option in &self.bet_options {
            best = match best {
                None => Some(option),
                Some(b) => {
                    let (db, dopt) = (b.abs_diff(requested), option.abs_diff(requested));
                    if dopt < db || (dopt == db && option < b) {
                        Some(option)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        best.unwrap_or(requested)
    }

    /// Symbol used when every weight is non-positive.
    pub fn fallback_symbol(&self) -> Option<&Symbol> {
        self.symbols.first()
    }
}

/// The set of machines a host offers, validated as a whole at load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MachineCatalog(pub Vec<MachineConfig>);

impl MachineCatalog {
    pub fn new(machines: Vec<MachineConfig>) -> Result<Self, ConfigError> {
        let catalog = Self(machines);
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let machines: Vec<MachineConfig> =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        Self::new(machines)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for machine in &self.0 {
            if !seen.insert(machine.id.as_str()) {
                return Err(ConfigError::DuplicateMachine(machine.id.clone()));
            }
            machine.validate()?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&MachineConfig> {
        self.0.iter().find(|m| m.id == id)
    }

    pub fn machines(&self) -> &[MachineConfig] {
        &self.0
    }

    pub fn builtin() -> Self {
        Self(vec![classic_three(), golden_three(), diamond_five()])
    }
}

fn classic_three() -> MachineConfig {
    MachineConfig {
        id: "classic".into(),
        name: "Classic Cherry".into(),
        reels: 3,
        rows: 3,
        symbols: SymbolSet::from_names(&["cherry", "lemon", "bell", "bar", "seven"]),
        profile: PayoutProfile {
            weights: vec![
                SymbolWeight::new("cherry", 30.0),
                SymbolWeight::new("lemon", 25.0),
                SymbolWeight::new("bell", 20.0),
                SymbolWeight::new("bar", 15.0),
                SymbolWeight::new("seven", 10.0),
            ],
            paytable: Paytable(vec![
                PaytableEntry::new("cherry", 3, 2.0),
                PaytableEntry::new("lemon", 3, 3.0),
                PaytableEntry::new("bell", 3, 5.0),
                PaytableEntry::new("bar", 3, 8.0),
                PaytableEntry::new("seven", 2, 1.5),
                PaytableEntry::new("seven", 3, 20.0),
            ]),
            jackpot_chance: 0.001,
            ultra_jackpot_chance: 0.0001,
            jackpot_multiplier: 50.0,
            ultra_jackpot_multiplier: 200.0,
            consolation_multiplier: 0.5,
        },
        bet_options: vec![1, 5, 10, 25],
    }
}

fn golden_three() -> MachineConfig {
    MachineConfig {
        id: "golden".into(),
        name: "Golden Bells".into(),
        reels: 3,
        rows: 3,
        symbols: SymbolSet::from_names(&["coin", "bell", "crown", "gem", "seven"]),
        profile: PayoutProfile {
            weights: vec![
                SymbolWeight::new("coin", 28.0),
                SymbolWeight::new("bell", 24.0),
                SymbolWeight::new("crown", 20.0),
                SymbolWeight::new("gem", 16.0),
                SymbolWeight::new("seven", 12.0),
            ],
            paytable: Paytable(vec![
                PaytableEntry::new("coin", 3, 3.0),
                PaytableEntry::new("bell", 3, 5.0),
                PaytableEntry::new("crown", 3, 10.0),
                PaytableEntry::new("gem", 3, 15.0),
                PaytableEntry::new("seven", 3, 30.0),
            ]),
            jackpot_chance: 0.002,
            ultra_jackpot_chance: 0.0002,
            jackpot_multiplier: 75.0,
            ultra_jackpot_multiplier: 300.0,
            consolation_multiplier: 0.5,
        },
        bet_options: vec![10, 50, 100, 250],
    }
}

fn diamond_five() -> MachineConfig {
    MachineConfig {
        id: "diamond".into(),
        name: "Diamond Deluxe".into(),
        reels: 5,
        rows: 3,
        symbols: SymbolSet::from_names(&["cherry", "bell", "bar", "seven", "diamond"]),
        profile: PayoutProfile {
            weights: vec![
                SymbolWeight::new("cherry", 30.0),
                SymbolWeight::new("bell", 25.0),
                SymbolWeight::new("bar", 20.0),
                SymbolWeight::new("seven", 15.0),
                SymbolWeight::new("diamond", 10.0),
            ],
            paytable: Paytable(vec![
                PaytableEntry::new("cherry", 3, 1.0),
                PaytableEntry::new("cherry", 4, 3.0),
                PaytableEntry::new("cherry", 5, 8.0),
                PaytableEntry::new("bell", 3, 2.0),
                PaytableEntry::new("bell", 4, 5.0),
                PaytableEntry::new("bell", 5, 12.0),
                PaytableEntry::new("bar", 3, 3.0),
                PaytableEntry::new("bar", 4, 8.0),
                PaytableEntry::new("bar", 5, 20.0),
                PaytableEntry::new("seven", 3, 5.0),
                PaytableEntry::new("seven", 4, 15.0),
                PaytableEntry::new("seven", 5, 40.0),
                PaytableEntry::new("diamond", 3, 10.0),
                PaytableEntry::new("diamond", 4, 30.0),
                PaytableEntry::new("diamond", 5, 80.0),
            ]),
            jackpot_chance: 0.003,
            ultra_jackpot_chance: 0.0003,
            jackpot_multiplier: 100.0,
            ultra_jackpot_multiplier: 500.0,
            consolation_multiplier: 0.0,
        },
        bet_options: vec![100, 500, 1_000, 5_000],
    }
}
