//! Session participants and display-name validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LobbyError, Result};

/// Maximum display name length, in Unicode scalar values.
pub const MAX_NAME_LENGTH: usize = 30;

/// Opaque participant identity (directory account id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One participant inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub identity: PlayerId,
    /// Dense 0-based slot, stable while the player stays in the roster.
    pub local_index: u8,
    pub display_name: String,
}

/// Reject empty names and names over [`MAX_NAME_LENGTH`] characters.
/// Names are never truncated.
pub fn validate_display_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 {
        return Err(LobbyError::BadRequest("display name must not be empty".into()));
    }
    if len > MAX_NAME_LENGTH {
        return Err(LobbyError::NameTooLong { len, max: MAX_NAME_LENGTH });
    }
    Ok(())
}
