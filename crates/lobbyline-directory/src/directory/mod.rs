//! Directory backend seam.
//!
//! The session directory is an external key-value store keyed by lobby
//! identity. Everything lobbyline does goes through [`DirectoryClient`];
//! backends that only offer completion callbacks are adapted through
//! [`callback::CallbackDirectory`].

pub mod callback;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::{Lobby, LobbyFilter, LobbyId, MetadataKey};

pub use callback::{BackendError, CallbackBackend, CallbackDirectory};
pub use memory::{DirectoryStats, InMemoryDirectory};

/// Async directory operations. Each call completes exactly once.
///
/// Error contract:
/// - unknown session identity -> `LobbyError::NotFound`
/// - backend not reachable / not initialised -> `LobbyError::DirectoryUnavailable`
/// - `get_field` on a known session but unset key -> `Ok(None)`
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn create_session(&self, max_players: u16) -> Result<LobbyId>;
    async fn set_field(&self, id: LobbyId, key: &str, value: &str) -> Result<()>;
    async fn get_field(&self, id: LobbyId, key: &str) -> Result<Option<String>>;
    async fn list_sessions(&self, filter: &LobbyFilter) -> Result<Vec<LobbyId>>;
    async fn enter_session(&self, id: LobbyId) -> Result<()>;
    async fn leave_session(&self, id: LobbyId) -> Result<()>;
}

/// Run a directory call under a deadline.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(deadline, fut).await {
        Ok(res) => res,
        Err(_) => Err(LobbyError::Timeout),
    }
}

/// Read a whole lobby record field by field.
///
/// The first key decides existence: an error there (e.g. `NotFound`) fails
/// the read. Later failures or absent fields leave defaults in place, since
/// the host may still be publishing.
pub async fn read_lobby(client: &dyn DirectoryClient, id: LobbyId, deadline: Duration) -> Result<Lobby> {
    let mut lobby = Lobby::new(Some(id));

    for (i, key) in MetadataKey::ALL.iter().copied().enumerate() {
        match with_deadline(deadline, client.get_field(id, key.as_str())).await {
            Ok(Some(value)) => lobby.apply_field(key, &value),
            Ok(None) => {}
            Err(e) if i == 0 => return Err(e),
            Err(e) => {
                debug!(lobby = %id, key = %key, error = %e, "field read failed, keeping default");
            }
        }
    }

    lobby.normalize();
    Ok(lobby)
}
