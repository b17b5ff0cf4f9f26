//! Shared error type across lobbyline crates.

use thiserror::Error;

use crate::lobby::{GameStatus, LobbyId};

/// Stable error codes (for logs, metrics labels and UI mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Host-only mutation attempted by a non-host.
    NotAuthorized,
    /// Session identity unknown to the directory.
    NotFound,
    /// Display name longer than the published limit.
    NameTooLong,
    /// Roster already holds the configured maximum.
    RosterFull,
    /// Operation on a closed service.
    Closed,
    /// Directory backend missing or failing.
    DirectoryUnavailable,
    /// Status moved backwards.
    InvalidTransition,
    /// Operation not valid in the current service state.
    InvalidState,
    /// Directory call exceeded its deadline.
    Timeout,
    /// Invalid input / config.
    BadRequest,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotAuthorized => "NOT_AUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::NameTooLong => "NAME_TOO_LONG",
            ErrorCode::RosterFull => "ROSTER_FULL",
            ErrorCode::Closed => "CLOSED",
            ErrorCode::DirectoryUnavailable => "DIRECTORY_UNAVAILABLE",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, LobbyError>;

/// Unified error type used by core and directory layers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("lobby not found: {0}")]
    NotFound(LobbyId),
    #[error("display name too long ({len} > {max} characters)")]
    NameTooLong { len: usize, max: usize },
    #[error("roster full (max {max})")]
    RosterFull { max: usize },
    #[error("service closed")]
    Closed,
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition { from: GameStatus, to: GameStatus },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("directory call timed out")]
    Timeout,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LobbyError {
    /// Map to the stable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            LobbyError::NotAuthorized(_) => ErrorCode::NotAuthorized,
            LobbyError::NotFound(_) => ErrorCode::NotFound,
            LobbyError::NameTooLong { .. } => ErrorCode::NameTooLong,
            LobbyError::RosterFull { .. } => ErrorCode::RosterFull,
            LobbyError::Closed => ErrorCode::Closed,
            LobbyError::DirectoryUnavailable(_) => ErrorCode::DirectoryUnavailable,
            LobbyError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            LobbyError::InvalidState(_) => ErrorCode::InvalidState,
            LobbyError::Timeout => ErrorCode::Timeout,
            LobbyError::BadRequest(_) => ErrorCode::BadRequest,
            LobbyError::Internal(_) => ErrorCode::Internal,
        }
    }
}
