use idlespin_core::{
    ClaimError, ConfigError, PlayerProgressState, PrestigeError, PrestigeState, SessionError,
    SpinError,
};
use serde::{Deserialize, Serialize};

pub use idlespin_core::{MachineConfig, OfflineReport, PrestigeOutcome, SpinReport};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinRequest {
    pub player_id: String,
    pub machine_id: String,
    pub bet: u64,
}

pub type SpinResponse = SpinReport;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerRequest {
    pub player_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimAchievementRequest {
    pub player_id: String,
    pub achievement_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimResponse {
    pub reward: u64,
    pub coins: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerResponse {
    pub player_id: String,
    pub state: PlayerProgressState,
    pub prestige: PrestigeState,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("declined: {0}")]
    Declined(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl From<SpinError> for ApiError {
    fn from(e: SpinError) -> Self {
        match e {
            SpinError::InvalidBet { .. } => ApiError::Invalid(e.to_string()),
            SpinError::InsufficientFunds { .. } => ApiError::Declined(e.to_string()),
            SpinError::UnknownMachine(_) => ApiError::NotFound(e.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::SpinInProgress => ApiError::Conflict(e.to_string()),
            SessionError::UnknownPlayer(_) => ApiError::NotFound(e.to_string()),
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(e: ClaimError) -> Self {
        match e {
            ClaimError::UnknownAchievement(_) | ClaimError::UnknownChallenge(_) => {
                ApiError::NotFound(e.to_string())
            }
            ClaimError::NotReady { .. } | ClaimError::AlreadyClaimed => {
                ApiError::Conflict(e.to_string())
            }
        }
    }
}

impl From<PrestigeError> for ApiError {
    fn from(e: PrestigeError) -> Self {
        ApiError::Conflict(e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::Invalid(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
