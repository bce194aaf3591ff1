pub mod client;
pub mod clock;
pub mod controller;

pub use client::{Client, RetryPolicy};
pub use clock::{RoundClock, DEFAULT_LOCK_BUFFER};
pub use controller::{Command, Controller, ControllerConfig, Event, Handle, Phase};

use jalwa_types::BetError;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("submission rejected: {message}")]
    Rejected { message: String },
    #[error("round locked")]
    RoundLocked,
    #[error("no game mode selected")]
    NoModeSelected,
    #[error("controller stopped")]
    ControllerStopped,
    #[error(transparent)]
    Bet(#[from] BetError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
