use std::time::Duration;

use serde::Deserialize;

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::player::validate_display_name;
use lobbyline_core::region::is_known_region;
use lobbyline_core::{GameCategory, GameMode, GameStatus, HostEndpoint, Lobby, PlayerId};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LobbylineConfig {
    pub version: u32,

    #[serde(default)]
    pub directory: DirectorySection,

    #[serde(default)]
    pub discovery: DiscoverySection,

    pub player: PlayerSection,

    /// Absent for browse-only clients.
    #[serde(default)]
    pub lobby: Option<LobbySettings>,
}

impl LobbylineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(LobbyError::BadRequest(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.directory.validate()?;
        self.discovery.validate()?;
        self.player.validate()?;
        if let Some(lobby) = &self.lobby {
            lobby.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectorySection {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self { request_timeout_ms: default_request_timeout_ms() }
    }
}

impl DirectorySection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.request_timeout_ms) {
            return Err(LobbyError::BadRequest(
                "directory.request_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoverySection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self { poll_interval_ms: default_poll_interval_ms() }
    }
}

impl DiscoverySection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.poll_interval_ms) {
            return Err(LobbyError::BadRequest(
                "discovery.poll_interval_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_poll_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSection {
    pub nickname: String,
    pub identity: PlayerId,
}

impl PlayerSection {
    /// Over-long nicknames are `NameTooLong`, not `BadRequest`.
    pub fn validate(&self) -> Result<()> {
        validate_display_name(&self.nickname)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    Direct,
    Traversal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    #[serde(default = "default_network_mode")]
    pub mode: NetworkMode,
    /// Literal address for `direct`, host code for `traversal`.
    #[serde(default)]
    pub host_code: String,
    #[serde(default)]
    pub port: u16,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self { mode: default_network_mode(), host_code: String::new(), port: 0 }
    }
}

impl NetworkSection {
    pub fn endpoint(&self) -> HostEndpoint {
        match self.mode {
            NetworkMode::Direct => HostEndpoint::direct(self.host_code.clone(), self.port),
            NetworkMode::Traversal => HostEndpoint::traversal(self.host_code.clone(), self.port),
        }
    }
}

fn default_network_mode() -> NetworkMode {
    NetworkMode::Traversal
}

/// What a host publishes when it opens a lobby.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LobbySettings {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub region: String,
    #[serde(default = "default_max_players")]
    pub max_players: u16,
    #[serde(default = "default_game_mode")]
    pub game_mode: GameMode,
    #[serde(default = "default_game_category")]
    pub game_category: GameCategory,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub rom_id: String,
    #[serde(default)]
    pub build_version: String,
    #[serde(default)]
    pub network: NetworkSection,
}

impl LobbySettings {
    /// Minimal settings; everything else takes its default.
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            region: region.into(),
            max_players: default_max_players(),
            game_mode: default_game_mode(),
            game_category: default_game_category(),
            password: None,
            rom_id: String::new(),
            build_version: String::new(),
            network: NetworkSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LobbyError::BadRequest("lobby.name must not be empty".into()));
        }
        if !is_known_region(&self.region) {
            return Err(LobbyError::BadRequest(format!(
                "lobby.region {:?} is not a known region",
                self.region
            )));
        }
        if !(1..=16).contains(&self.max_players) {
            return Err(LobbyError::BadRequest(
                "lobby.max_players must be between 1 and 16".into(),
            ));
        }
        if self.network.mode == NetworkMode::Direct && self.network.host_code.is_empty() {
            return Err(LobbyError::BadRequest(
                "lobby.network.host_code is required for direct mode".into(),
            ));
        }
        Ok(())
    }

    /// The record a freshly hosted lobby starts from.
    pub fn to_lobby(&self) -> Lobby {
        let mut lobby = Lobby::new(None);
        lobby.name = self.name.clone();
        lobby.description = self.description.clone();
        lobby.region = self.region.clone();
        lobby.game_mode = self.game_mode;
        lobby.game_category = self.game_category;
        lobby.status = GameStatus::Waiting;
        lobby.max_players = self.max_players;
        lobby.rom_id = self.rom_id.clone();
        lobby.build_version = self.build_version.clone();
        lobby.set_password(self.password.clone());
        lobby.set_endpoint(self.network.endpoint());
        lobby
    }
}

fn default_max_players() -> u16 {
    4
}
fn default_game_mode() -> GameMode {
    GameMode::CityTrial
}
fn default_game_category() -> GameCategory {
    GameCategory::Casual
}
