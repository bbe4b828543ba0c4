pub mod achievements;
pub mod config;
pub mod daily;
pub mod engine;
pub mod error;
pub mod history;
pub mod machine;
pub mod offline;
pub mod paytable;
pub mod prestige;
pub mod progression;
pub mod rng;
pub mod selector;
pub mod session;
pub mod symbols;
pub mod tier;

/// Coin amounts: bets, wins, balances.
pub type Amount = u64;

pub use crate::config::GameRules;
pub use crate::engine::{evaluate_drawn, evaluate_symbols, spin_once, SpinOutcome};
pub use crate::error::{ClaimError, ConfigError, PrestigeError, SessionError, SinkError, SpinError};
pub use crate::history::{HistoryEntry, SpinHistory};
pub use crate::machine::{MachineCatalog, MachineConfig, PayoutProfile};
pub use crate::paytable::{Paytable, PaytableEntry};
pub use crate::prestige::{PrestigeOutcome, PrestigeRules, PrestigeState};
pub use crate::progression::{PlayerProgressState, Totals};
pub use crate::rng::{RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
pub use crate::selector::SymbolWeight;
pub use crate::session::{
    MemorySink, NullSink, OfflineReport, PlayerSession, ProgressSink, SessionContext,
    SessionRegistry, SpinReport,
};
pub use crate::symbols::{Symbol, SymbolSet};
pub use crate::tier::{classify, Tier, TierThresholds};
