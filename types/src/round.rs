use crate::outcome::{classify, ClassifyError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Round identifier, unique across all game modes.
pub type RoundId = u64;

/// Duration variants of the WinGo lottery. Static configuration, never
/// mutated at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    ThirtySec,
    OneMin,
    ThreeMin,
    FiveMin,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::ThirtySec,
        GameMode::OneMin,
        GameMode::ThreeMin,
        GameMode::FiveMin,
    ];

    /// Length of one betting round.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(match self {
            GameMode::ThirtySec => 30,
            GameMode::OneMin => 60,
            GameMode::ThreeMin => 180,
            GameMode::FiveMin => 300,
        })
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    /// Path segment identifying the mode in API routes.
    pub fn game_code(&self) -> &'static str {
        match self {
            GameMode::ThirtySec => "wingo-30s",
            GameMode::OneMin => "wingo-1m",
            GameMode::ThreeMin => "wingo-3m",
            GameMode::FiveMin => "wingo-5m",
        }
    }

    pub fn from_code(code: &str) -> Option<GameMode> {
        GameMode::ALL.into_iter().find(|mode| mode.game_code() == code)
    }
}

/// Observed status of a betting round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Open,
    Locked,
    Settled,
}

/// One betting cycle of a game mode. Created by the backend at fixed
/// cadence; clients only observe rounds, never create them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    /// Display label, e.g. "20250826-000123".
    pub period: String,
    pub game_mode: GameMode,
    /// Window start, unix milliseconds.
    pub starts_at: u64,
    /// Window end, unix milliseconds.
    pub ends_at: u64,
    pub status: RoundStatus,
    /// Drawn number, present iff status is Settled.
    pub outcome: Option<u8>,
}

/// Error type for round invariant violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    #[error("round {id}: window [{starts_at}, {ends_at}) does not span {expected_ms}ms")]
    InvalidWindow {
        id: RoundId,
        starts_at: u64,
        ends_at: u64,
        expected_ms: u64,
    },
    #[error("round {id}: outcome present iff settled (status {status:?}, outcome {outcome:?})")]
    OutcomeMismatch {
        id: RoundId,
        status: RoundStatus,
        outcome: Option<u8>,
    },
    #[error("round {id}: {source}")]
    InvalidOutcome {
        id: RoundId,
        source: ClassifyError,
    },
}

impl Round {
    /// Check the structural invariants of a round as received off the wire.
    pub fn validate(&self) -> Result<(), RoundError> {
        let expected_ms = self.game_mode.duration_ms();
        if self.starts_at >= self.ends_at || self.ends_at - self.starts_at != expected_ms {
            return Err(RoundError::InvalidWindow {
                id: self.id,
                starts_at: self.starts_at,
                ends_at: self.ends_at,
                expected_ms,
            });
        }
        if self.outcome.is_some() != (self.status == RoundStatus::Settled) {
            return Err(RoundError::OutcomeMismatch {
                id: self.id,
                status: self.status,
                outcome: self.outcome,
            });
        }
        if let Some(number) = self.outcome {
            classify(number).map_err(|source| RoundError::InvalidOutcome {
                id: self.id,
                source,
            })?;
        }
        Ok(())
    }
}
