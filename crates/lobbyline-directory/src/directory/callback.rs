//! Adapter for callback-style directory SDKs.
//!
//! Platform matchmaking SDKs usually expose lobby creation, listing and
//! joining as "call now, get a completion callback later", while metadata
//! reads/writes and leaving are plain synchronous calls. [`CallbackDirectory`]
//! turns such a backend into a [`DirectoryClient`] by parking each request on
//! a oneshot channel. A completion that is dropped without being invoked
//! surfaces as `DirectoryUnavailable`, never as a hang.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::{LobbyFilter, LobbyId};

use super::DirectoryClient;

/// Errors reported by a callback backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend not initialised")]
    Uninitialised,
    #[error("no such lobby: {0}")]
    NoSuchLobby(u64),
    #[error("request failed: {0}")]
    Failed(String),
    #[error("completion callback dropped")]
    CallbackDropped,
}

impl From<BackendError> for LobbyError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NoSuchLobby(raw) => LobbyError::NotFound(LobbyId::new(raw)),
            other => LobbyError::DirectoryUnavailable(other.to_string()),
        }
    }
}

/// Completion invoked once by the backend, from any thread.
pub type Completion<T> = Box<dyn FnOnce(std::result::Result<T, BackendError>) + Send + 'static>;

/// Raw SDK surface. Lobby identities are the SDK's raw `u64`.
pub trait CallbackBackend: Send + Sync + 'static {
    fn create_lobby(&self, max_members: u16, done: Completion<u64>);
    fn request_lobby_list(&self, filter: Vec<(String, String)>, done: Completion<Vec<u64>>);
    fn join_lobby(&self, lobby: u64, done: Completion<()>);

    fn set_lobby_data(&self, lobby: u64, key: &str, value: &str) -> std::result::Result<(), BackendError>;
    fn lobby_data(&self, lobby: u64, key: &str) -> std::result::Result<Option<String>, BackendError>;
    fn leave_lobby(&self, lobby: u64) -> std::result::Result<(), BackendError>;
}

pub struct CallbackDirectory<B: CallbackBackend> {
    backend: Arc<B>,
}

impl<B: CallbackBackend> CallbackDirectory<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

/// Start a callback request and wait for its single completion.
async fn complete<T, F>(start: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(Completion<T>),
{
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |res| {
        // receiver gone means the caller timed out; nothing to report to
        let _ = tx.send(res);
    }));
    match rx.await {
        Ok(res) => res.map_err(LobbyError::from),
        Err(_) => Err(BackendError::CallbackDropped.into()),
    }
}

#[async_trait]
impl<B: CallbackBackend> DirectoryClient for CallbackDirectory<B> {
    async fn create_session(&self, max_players: u16) -> Result<LobbyId> {
        let raw = complete(|done| self.backend.create_lobby(max_players, done)).await?;
        Ok(LobbyId::new(raw))
    }

    async fn set_field(&self, id: LobbyId, key: &str, value: &str) -> Result<()> {
        self.backend.set_lobby_data(id.get(), key, value)?;
        Ok(())
    }

    async fn get_field(&self, id: LobbyId, key: &str) -> Result<Option<String>> {
        Ok(self.backend.lobby_data(id.get(), key)?)
    }

    async fn list_sessions(&self, filter: &LobbyFilter) -> Result<Vec<LobbyId>> {
        let pairs: Vec<(String, String)> = filter
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let raw = complete(|done| self.backend.request_lobby_list(pairs, done)).await?;
        Ok(raw.into_iter().map(LobbyId::new).collect())
    }

    async fn enter_session(&self, id: LobbyId) -> Result<()> {
        complete(|done| self.backend.join_lobby(id.get(), done)).await
    }

    async fn leave_session(&self, id: LobbyId) -> Result<()> {
        self.backend.leave_lobby(id.get())?;
        Ok(())
    }
}
