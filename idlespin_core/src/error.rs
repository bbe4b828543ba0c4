use crate::symbols::Symbol;
use crate::Amount;

/// Raised while loading a machine catalog. Never raised mid-spin.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("machine {machine}: symbol set is empty")]
    EmptySymbolSet { machine: String },
    #[error("machine {machine}: reel count and row count must be at least 1")]
    EmptyGrid { machine: String },
    #[error("machine {machine}: weight references unknown symbol {symbol}")]
    UnknownWeightSymbol { machine: String, symbol: Symbol },
    #[error("machine {machine}: no symbol has a positive weight")]
    NoPositiveWeight { machine: String },
    #[error("machine {machine}: paytable references unknown symbol {symbol}")]
    UnknownPaytableSymbol { machine: String, symbol: Symbol },
    #[error("machine {machine}: match count {count} for {symbol} outside 1..={reels}")]
    MatchCountOutOfRange {
        machine: String,
        symbol: Symbol,
        count: u8,
        reels: usize,
    },
    #[error("machine {machine}: {field} = {value} is not a probability")]
    InvalidChance {
        machine: String,
        field: &'static str,
        value: f64,
    },
    #[error("machine {machine}: {field} = {value} must be finite and non-negative")]
    InvalidMultiplier {
        machine: String,
        field: &'static str,
        value: f64,
    },
    #[error("machine {machine}: bet options must be non-empty and positive")]
    InvalidBetOptions { machine: String },
    #[error("duplicate machine id {0}")]
    DuplicateMachine(String),
    #[error("catalog is empty")]
    EmptyCatalog,
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// A spin request that was declined before any randomness was consumed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpinError {
    #[error("bet {bet} is not offered by machine {machine}")]
    InvalidBet { machine: String, bet: Amount },
    #[error("insufficient funds: {coins} coins, bet {bet}")]
    InsufficientFunds { coins: Amount, bet: Amount },
    #[error("unknown machine {0}")]
    UnknownMachine(String),
}

/// Raised by the session registry before a session is handed out.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a spin is already in progress for this session")]
    SpinInProgress,
    #[error("unknown player {0}")]
    UnknownPlayer(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("unknown achievement {0}")]
    UnknownAchievement(String),
    #[error("unknown daily challenge {0}")]
    UnknownChallenge(String),
    #[error("not ready: progress {progress} of {requirement}")]
    NotReady { progress: u64, requirement: u64 },
    #[error("already claimed")]
    AlreadyClaimed,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrestigeError {
    #[error("not eligible: run earnings {earnings} below {required}")]
    NotEligible { earnings: Amount, required: Amount },
}

/// Reported by a persistence collaborator. Logged by the session, never
/// propagated into a spin result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}
