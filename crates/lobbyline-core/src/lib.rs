//! lobbyline core: lobby metadata model, codec, and error types.
//!
//! This crate defines the record a host publishes into the session directory,
//! the string codec used for every field, and the error surface shared with
//! the runtime layer. It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Directory contents are written by other clients; decoding them must never
//! take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod lobby;
pub mod player;
pub mod protocol;
pub mod region;

/// Shared result type.
pub use error::{ErrorCode, LobbyError, Result};
pub use lobby::{GameCategory, GameMode, GameStatus, HostEndpoint, Lobby, LobbyId};
pub use player::{Player, PlayerId, MAX_NAME_LENGTH};
pub use protocol::{LobbyFilter, MetadataKey};
