use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::protocol::codec::{self, MetadataEnum};
use lobbyline_core::region::is_known_region;
use lobbyline_core::{GameCategory, GameMode, GameStatus, HostEndpoint, Lobby, LobbyId, MetadataKey};

use super::ledger::FieldStatus;
use super::publisher::CreateState;
use super::{Inner, ServiceState};
use crate::directory::with_deadline;

/// Host-side handle returned by [`super::SessionDirectoryService::host`].
///
/// Valid from the moment `host` returns: mutations made before the directory
/// assigns an id are queued and published in issue order once it does. A
/// handle stops working (`NotAuthorized`) once its lobby is gone, even if the
/// service later hosts another one.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
    epoch: u64,
    created: watch::Receiver<CreateState>,
}

impl SessionHandle {
    pub(crate) fn new(inner: Arc<Inner>, epoch: u64, created: watch::Receiver<CreateState>) -> Self {
        Self { inner, epoch, created }
    }

    /// Directory id, once assigned.
    pub fn id(&self) -> Option<LobbyId> {
        match &*self.created.borrow() {
            CreateState::Created(id) => Some(*id),
            _ => None,
        }
    }

    /// Wait for the create request to complete.
    pub async fn wait_created(&self) -> Result<LobbyId> {
        let mut rx = self.created.clone();
        let state: CreateState = {
            let seen = rx
                .wait_for(|s| !matches!(s, CreateState::Pending))
                .await
                .map_err(|_| LobbyError::Closed)?;
            (*seen).clone()
        };
        match state {
            CreateState::Created(id) => Ok(id),
            CreateState::Failed(e) => Err(e),
            CreateState::Pending => Err(LobbyError::Internal("create still pending".into())),
        }
    }

    /// Wait until no write is pending, or `deadline` passes (`Timeout`).
    /// Failed writes count as settled; check [`Self::failed_fields`].
    pub async fn wait_published(&self, deadline: Duration) -> Result<()> {
        with_deadline(deadline, async {
            loop {
                let settled = self.inner.settled.notified();
                let failed = match &*self.created.borrow() {
                    CreateState::Failed(e) => Some(e.clone()),
                    _ => None,
                };
                if let Some(e) = failed {
                    return Err(e);
                }
                let closed = self.inner.lock_session()?.state == ServiceState::Closed;
                if closed {
                    return Err(LobbyError::Closed);
                }
                if self.inner.ledger.pending() == 0 {
                    return Ok(());
                }
                settled.await;
            }
        })
        .await
    }

    /// Local authoritative copy.
    pub fn lobby(&self) -> Result<Lobby> {
        let session = self.inner.lock_session()?;
        session.check_host(self.epoch)?;
        session
            .lobby
            .clone()
            .ok_or_else(|| LobbyError::Internal("hosting without a lobby".into()))
    }

    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.inner.mutate(self.epoch, |lobby| {
            apply_text(lobby, MetadataKey::Name, name)
        })
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        self.inner.mutate(self.epoch, |lobby| {
            apply_text(lobby, MetadataKey::Description, description)
        })
    }

    pub fn set_region(&self, region: impl Into<String>) -> Result<()> {
        let region = region.into();
        self.inner.mutate(self.epoch, |lobby| {
            apply_text(lobby, MetadataKey::Region, region)
        })
    }

    pub fn set_game_mode(&self, mode: GameMode) -> Result<()> {
        self.inner.mutate(self.epoch, |lobby| {
            lobby.game_mode = publishable(mode)?;
            Ok(vec![MetadataKey::GameMode])
        })
    }

    pub fn set_game_category(&self, category: GameCategory) -> Result<()> {
        self.inner.mutate(self.epoch, |lobby| {
            lobby.game_category = publishable(category)?;
            Ok(vec![MetadataKey::GameCategory])
        })
    }

    /// Forward-only; setting the current status again writes nothing.
    pub fn set_status(&self, status: GameStatus) -> Result<()> {
        self.inner.mutate(self.epoch, |lobby| advance_status(lobby, status))
    }

    /// `None` or empty clears the password. Writes both halves.
    pub fn set_password(&self, password: Option<String>) -> Result<()> {
        self.inner.mutate(self.epoch, |lobby| {
            lobby.set_password(password);
            Ok(vec![MetadataKey::HasPassword, MetadataKey::Password])
        })
    }

    /// Reachability mode and address always change together.
    pub fn set_endpoint(&self, endpoint: HostEndpoint) -> Result<()> {
        if endpoint.direct && endpoint.address.is_empty() {
            return Err(LobbyError::BadRequest("direct endpoint needs an address".into()));
        }
        self.inner.mutate(self.epoch, |lobby| {
            lobby.set_endpoint(endpoint);
            Ok(vec![MetadataKey::NetworkMode, MetadataKey::HostCode, MetadataKey::HostPort])
        })
    }

    pub fn set_rom_id(&self, rom_id: impl Into<String>) -> Result<()> {
        let rom_id = rom_id.into();
        self.inner.mutate(self.epoch, |lobby| {
            apply_text(lobby, MetadataKey::RomId, rom_id)
        })
    }

    pub fn set_build_version(&self, build_version: impl Into<String>) -> Result<()> {
        let build_version = build_version.into();
        self.inner.mutate(self.epoch, |lobby| {
            apply_text(lobby, MetadataKey::BuildVersion, build_version)
        })
    }

    /// Set one field from its wire text.
    ///
    /// Paired keys (password, endpoint) and the player counts are rejected
    /// with `BadRequest`; use the dedicated setters or the roster instead.
    /// Enum text must decode to a publishable variant.
    pub fn set_field(&self, key: MetadataKey, value: &str) -> Result<()> {
        if key.is_paired() {
            return Err(LobbyError::BadRequest(format!(
                "{key} must be set together with its pair"
            )));
        }
        self.inner.mutate(self.epoch, |lobby| match key {
            MetadataKey::GameMode => {
                lobby.game_mode = publishable(codec::decode_enum::<GameMode>(value))?;
                Ok(vec![key])
            }
            MetadataKey::GameCategory => {
                lobby.game_category = publishable(codec::decode_enum::<GameCategory>(value))?;
                Ok(vec![key])
            }
            MetadataKey::GameStatus => {
                advance_status(lobby, codec::decode_enum::<GameStatus>(value))
            }
            MetadataKey::MaxPlayerCount | MetadataKey::CurrentPlayerCount => Err(
                LobbyError::BadRequest(format!("{key} is managed by the service")),
            ),
            _ => apply_text(lobby, key, value.to_string()),
        })
    }

    pub fn field_status(&self, key: MetadataKey) -> Option<FieldStatus> {
        self.inner.ledger.status(key)
    }

    /// Keys whose latest write failed, with the failure reason.
    pub fn failed_fields(&self) -> Vec<(MetadataKey, String)> {
        self.inner.ledger.failed()
    }

    /// Re-publish the cached value of every failed key; returns how many.
    pub fn retry_failed(&self) -> Result<usize> {
        self.inner.retry_failed(self.epoch)
    }
}

fn publishable<E: MetadataEnum + std::fmt::Debug>(value: E) -> Result<E> {
    if value == E::UNKNOWN {
        return Err(LobbyError::BadRequest(format!("{value:?} cannot be published")));
    }
    Ok(value)
}

fn advance_status(lobby: &mut Lobby, next: GameStatus) -> Result<Vec<MetadataKey>> {
    let next = publishable(next)?;
    if next == lobby.status {
        return Ok(Vec::new());
    }
    if !lobby.status.can_advance_to(next) {
        return Err(LobbyError::InvalidTransition { from: lobby.status, to: next });
    }
    lobby.status = next;
    Ok(vec![MetadataKey::GameStatus])
}

fn apply_text(lobby: &mut Lobby, key: MetadataKey, value: String) -> Result<Vec<MetadataKey>> {
    match key {
        MetadataKey::Name if value.trim().is_empty() => {
            return Err(LobbyError::BadRequest("lobby name must not be empty".into()));
        }
        MetadataKey::Region if !is_known_region(&value) => {
            return Err(LobbyError::BadRequest(format!("unknown region {value:?}")));
        }
        _ => {}
    }
    lobby.apply_field(key, &value);
    Ok(vec![key])
}
