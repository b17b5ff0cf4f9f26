//! SessionDirectoryService: host, join, and keep published metadata in sync.
//!
//! State machine: `Idle -> Creating -> Hosting | Idle -> JoinedAsClient`,
//! any state `-> Closed`. A hosting service is the only writer of its
//! lobby's fields; every mutation updates the local record immediately and
//! queues the directory write behind the create request, so a
//! [`SessionHandle`] is usable before the directory has assigned an id.

mod handle;
pub mod ledger;
mod publisher;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::player::validate_display_name;
use lobbyline_core::{Lobby, LobbyId, MetadataKey, Player, PlayerId};

use crate::config::{LobbySettings, LobbylineConfig};
use crate::directory::{read_lobby, with_deadline, DirectoryClient};
use crate::obs::metrics::LobbyMetrics;
use crate::roster::RosterManager;

pub use handle::SessionHandle;
pub use ledger::{FieldLedger, FieldStatus};

use publisher::{CreateState, FieldWrite};

/// Construction-time knobs. Replaces any process-wide player/lobby globals.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline applied to every directory call.
    pub request_timeout: Duration,
    pub identity: PlayerId,
    pub nickname: String,
}

impl ServiceConfig {
    pub fn new(identity: PlayerId, nickname: impl Into<String>) -> Self {
        Self {
            request_timeout: Duration::from_millis(5000),
            identity,
            nickname: nickname.into(),
        }
    }

    pub fn from_config(cfg: &LobbylineConfig) -> Self {
        Self {
            request_timeout: cfg.directory.request_timeout(),
            identity: cfg.player.identity,
            nickname: cfg.player.nickname.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    /// Host requested; the directory has not assigned an id yet.
    Creating,
    Hosting(LobbyId),
    JoinedAsClient(LobbyId),
    Closed,
}

pub(crate) struct Session {
    /// Bumped on every host() so stale handles cannot touch a newer lobby.
    pub epoch: u64,
    pub state: ServiceState,
    /// Authoritative copy when hosting, read replica when joined.
    pub lobby: Option<Lobby>,
    pub roster: Option<RosterManager>,
    writes: Option<mpsc::UnboundedSender<FieldWrite>>,
    publisher: Option<JoinHandle<()>>,
}

impl Session {
    /// Back to `Idle`, dropping any hosted or joined lobby.
    pub fn reset(&mut self) {
        self.state = ServiceState::Idle;
        self.lobby = None;
        self.roster = None;
        self.writes = None;
        self.publisher = None;
    }

    fn is_host(&self) -> bool {
        matches!(self.state, ServiceState::Creating | ServiceState::Hosting(_))
    }

    fn check_host(&self, epoch: u64) -> Result<()> {
        match self.state {
            ServiceState::Closed => Err(LobbyError::Closed),
            ServiceState::Creating | ServiceState::Hosting(_) if self.epoch == epoch => Ok(()),
            _ => Err(LobbyError::NotAuthorized("not the host of this lobby".into())),
        }
    }
}

pub(crate) struct Inner {
    pub directory: Arc<dyn DirectoryClient>,
    pub timeout: Duration,
    identity: PlayerId,
    nickname: Mutex<String>,
    pub session: Mutex<Session>,
    pub ledger: FieldLedger,
    seq: AtomicU64,
    pub metrics: Arc<LobbyMetrics>,
    /// Signalled whenever a queued write settles or is skipped.
    pub settled: tokio::sync::Notify,
}

impl Inner {
    pub fn lock_session(&self) -> Result<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| LobbyError::Internal("session lock poisoned".into()))
    }

    fn enqueue(&self, session: &Session, key: MetadataKey, value: String) -> Result<()> {
        let tx = session.writes.as_ref().ok_or(LobbyError::Closed)?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.ledger.begin(key, seq);
        tx.send(FieldWrite { seq, key, value })
            .map_err(|_| LobbyError::Internal("publish worker stopped".into()))
    }

    /// Apply `f` to the hosted record and queue a write for every key it
    /// reports as changed.
    pub fn mutate<F>(&self, epoch: u64, f: F) -> Result<()>
    where
        F: FnOnce(&mut Lobby) -> Result<Vec<MetadataKey>>,
    {
        let mut session = self.lock_session()?;
        session.check_host(epoch)?;
        let lobby = session
            .lobby
            .as_mut()
            .ok_or_else(|| LobbyError::Internal("hosting without a lobby".into()))?;

        let keys = f(lobby)?;
        let writes: Vec<(MetadataKey, String)> = keys
            .into_iter()
            .filter_map(|k| lobby.field(k).map(|v| (k, v)))
            .collect();
        for (key, value) in writes {
            self.enqueue(&session, key, value)?;
        }
        Ok(())
    }

    /// Re-queue the cached value of every key whose last write failed.
    pub fn retry_failed(&self, epoch: u64) -> Result<usize> {
        let session = self.lock_session()?;
        session.check_host(epoch)?;
        let lobby = session
            .lobby
            .as_ref()
            .ok_or_else(|| LobbyError::Internal("hosting without a lobby".into()))?;

        let retries: Vec<(MetadataKey, String)> = self
            .ledger
            .failed()
            .into_iter()
            .filter_map(|(k, _)| lobby.field(k).map(|v| (k, v)))
            .collect();
        let n = retries.len();
        for (key, value) in retries {
            debug!(key = %key, "retrying failed field");
            self.enqueue(&session, key, value)?;
        }
        Ok(n)
    }

    /// Republish `current_player_count` if the roster size moved.
    fn sync_player_count(&self, session: &mut Session) -> Result<()> {
        if !session.is_host() {
            return Ok(());
        }
        let count = match &session.roster {
            Some(r) => u16::try_from(r.len()?).unwrap_or(u16::MAX),
            None => return Ok(()),
        };
        let changed = match session.lobby.as_mut() {
            Some(lobby) if lobby.current_players != count => {
                lobby.current_players = count;
                true
            }
            _ => false,
        };
        if changed {
            self.enqueue(session, MetadataKey::CurrentPlayerCount, count.to_string())?;
        }
        Ok(())
    }

    async fn leave(&self, id: LobbyId) {
        let res = with_deadline(self.timeout, self.directory.leave_session(id)).await;
        self.metrics.record_call("leave_session", &res);
        if let Err(e) = res {
            warn!(lobby = %id, error = %e, "leave failed");
        }
    }
}

pub struct SessionDirectoryService {
    inner: Arc<Inner>,
}

impl SessionDirectoryService {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        config: ServiceConfig,
        metrics: Arc<LobbyMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory,
                timeout: config.request_timeout,
                identity: config.identity,
                nickname: Mutex::new(config.nickname),
                session: Mutex::new(Session {
                    epoch: 0,
                    state: ServiceState::Idle,
                    lobby: None,
                    roster: None,
                    writes: None,
                    publisher: None,
                }),
                ledger: FieldLedger::new(),
                seq: AtomicU64::new(1),
                metrics,
                settled: tokio::sync::Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> Result<ServiceState> {
        Ok(self.inner.lock_session()?.state)
    }

    /// Snapshot of the hosted or joined record.
    pub fn lobby(&self) -> Result<Option<Lobby>> {
        Ok(self.inner.lock_session()?.lobby.clone())
    }

    pub fn nickname(&self) -> Result<String> {
        self.inner
            .nickname
            .lock()
            .map(|n| n.clone())
            .map_err(|_| LobbyError::Internal("nickname lock poisoned".into()))
    }

    /// Takes effect on the next host/join.
    pub fn set_nickname(&self, nickname: impl Into<String>) -> Result<()> {
        let nickname = nickname.into();
        validate_display_name(&nickname)?;
        let mut slot = self
            .inner
            .nickname
            .lock()
            .map_err(|_| LobbyError::Internal("nickname lock poisoned".into()))?;
        *slot = nickname;
        Ok(())
    }

    /// Open a lobby. Returns at once; the create request and every field
    /// write run on the publish worker. Use [`SessionHandle::wait_created`]
    /// to observe the outcome of the create.
    ///
    /// Nickname and settings are validated first: nothing reaches the
    /// directory if either is invalid.
    pub fn host(&self, settings: &LobbySettings) -> Result<SessionHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| LobbyError::Internal("host requires a tokio runtime".into()))?;
        let nickname = self.nickname()?;
        validate_display_name(&nickname)?;
        settings.validate()?;

        let inner = &self.inner;
        let mut session = inner.lock_session()?;
        match session.state {
            ServiceState::Idle => {}
            ServiceState::Closed => return Err(LobbyError::Closed),
            _ => {
                return Err(LobbyError::InvalidState(
                    "already hosting or joined a lobby".into(),
                ))
            }
        }

        let roster = RosterManager::new(settings.max_players);
        roster.add_player(inner.identity, &nickname)?;
        let mut lobby = settings.to_lobby();
        lobby.current_players = u16::try_from(roster.len()?).unwrap_or(u16::MAX);

        let (tx, rx) = mpsc::unbounded_channel();
        let (created_tx, created_rx) = watch::channel(CreateState::Pending);

        session.epoch += 1;
        let epoch = session.epoch;
        inner.ledger.clear();
        session.writes = Some(tx);
        for (key, value) in lobby.metadata() {
            inner.enqueue(&session, key, value)?;
        }
        session.lobby = Some(lobby);
        session.roster = Some(roster);
        session.state = ServiceState::Creating;
        session.publisher = Some(runtime.spawn(publisher::run(
            Arc::downgrade(inner),
            epoch,
            settings.max_players,
            rx,
            created_tx,
        )));

        info!(name = %settings.name, region = %settings.region, "hosting lobby");
        Ok(SessionHandle::new(Arc::clone(inner), epoch, created_rx))
    }

    /// Join a lobby and read its full record.
    ///
    /// Entering the lobby this service hosts returns the local copy without
    /// touching the directory.
    pub async fn enter_session(&self, id: LobbyId) -> Result<Lobby> {
        let inner = &self.inner;
        let previous = {
            let session = inner.lock_session()?;
            match session.state {
                ServiceState::Closed => return Err(LobbyError::Closed),
                ServiceState::Hosting(own) if own == id => {
                    debug!(lobby = %id, "entering own lobby, serving local copy");
                    return session
                        .lobby
                        .clone()
                        .ok_or_else(|| LobbyError::Internal("hosting without a lobby".into()));
                }
                ServiceState::Creating | ServiceState::Hosting(_) => {
                    return Err(LobbyError::InvalidState("cannot join while hosting".into()))
                }
                ServiceState::JoinedAsClient(current) if current != id => Some(current),
                _ => None,
            }
        };

        let nickname = self.nickname()?;
        validate_display_name(&nickname)?;

        if let Some(old) = previous {
            inner.leave(old).await;
            let mut session = inner.lock_session()?;
            if session.state == ServiceState::JoinedAsClient(old) {
                session.reset();
            }
        }

        let res = with_deadline(inner.timeout, inner.directory.enter_session(id)).await;
        inner.metrics.record_call("enter_session", &res);
        res?;

        let res = read_lobby(inner.directory.as_ref(), id, inner.timeout).await;
        inner.metrics.record_call("read_lobby", &res);
        let lobby = match res {
            Ok(lobby) => lobby,
            Err(e) => {
                inner.leave(id).await;
                return Err(e);
            }
        };

        let roster = RosterManager::new(lobby.max_players.max(1));
        roster.add_player(inner.identity, &nickname)?;

        let closed = {
            let mut session = inner.lock_session()?;
            if session.state == ServiceState::Closed {
                true
            } else {
                session.state = ServiceState::JoinedAsClient(id);
                session.lobby = Some(lobby.clone());
                session.roster = Some(roster);
                false
            }
        };
        if closed {
            inner.leave(id).await;
            return Err(LobbyError::Closed);
        }

        info!(lobby = %id, name = %lobby.name, "joined lobby");
        Ok(lobby)
    }

    /// Add a participant. When hosting, the new player count is republished.
    pub fn add_player(&self, identity: PlayerId, display_name: &str) -> Result<u8> {
        let mut session = self.inner.lock_session()?;
        if session.state == ServiceState::Closed {
            return Err(LobbyError::Closed);
        }
        let idx = session
            .roster
            .as_ref()
            .ok_or_else(|| LobbyError::InvalidState("not in a lobby".into()))?
            .add_player(identity, display_name)?;
        self.inner.sync_player_count(&mut session)?;
        Ok(idx)
    }

    pub fn remove_player(&self, identity: PlayerId) -> Result<Option<Player>> {
        let mut session = self.inner.lock_session()?;
        if session.state == ServiceState::Closed {
            return Err(LobbyError::Closed);
        }
        let removed = session
            .roster
            .as_ref()
            .ok_or_else(|| LobbyError::InvalidState("not in a lobby".into()))?
            .remove_player(identity)?;
        if removed.is_some() {
            self.inner.sync_player_count(&mut session)?;
        }
        Ok(removed)
    }

    /// Players ordered by local index; empty outside a lobby.
    pub fn players(&self) -> Result<Vec<Player>> {
        let session = self.inner.lock_session()?;
        match &session.roster {
            Some(r) => r.players(),
            None => Ok(Vec::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<LobbyMetrics> {
        &self.inner.metrics
    }

    /// Leave the current lobby and stop the publish worker. Idempotent;
    /// every later operation fails with `Closed`.
    pub async fn close(&self) -> Result<()> {
        let (publisher, leave_id, creating) = {
            let mut session = self.inner.lock_session()?;
            if session.state == ServiceState::Closed {
                return Ok(());
            }
            let leave_id = match session.state {
                ServiceState::Hosting(id) | ServiceState::JoinedAsClient(id) => Some(id),
                _ => None,
            };
            let creating = session.state == ServiceState::Creating;
            let publisher = session.publisher.take();
            session.reset();
            session.state = ServiceState::Closed;
            (publisher, leave_id, creating)
        };

        if let Some(handle) = publisher {
            // mid-create: the worker sees `Closed` once the id arrives and
            // leaves that session itself; bounded by the request timeout
            if !creating {
                handle.abort();
            }
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!("publish worker panicked");
                }
            }
        }
        if let Some(id) = leave_id {
            self.inner.leave(id).await;
        }
        self.inner.settled.notify_waiters();

        debug!("session directory service closed");
        Ok(())
    }
}

impl Drop for SessionDirectoryService {
    fn drop(&mut self) {
        if let Ok(mut session) = self.inner.session.lock() {
            if let Some(handle) = session.publisher.take() {
                handle.abort();
            }
        }
    }
}
