//! Lobby record (one discoverable session) and its metadata enums.
//!
//! A `Lobby` is what a host publishes and what browsers/joiners decode. It
//! round-trips through the flat metadata map via [`Lobby::field`] and
//! [`Lobby::apply_field`]. Readers must tolerate partially published
//! records: fields that are not there yet keep their defaults (`Unknown`
//! enums, empty strings, zero counts).
//!
//! Note: the password is published in clear text like every other field.
//! Anyone who can read the directory can read it; this layer does not gate
//! access to it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::protocol::codec::{self, MetadataEnum};
use crate::protocol::MetadataKey;

/// Opaque directory identity, assigned by the backend at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LobbyId(pub u64);

impl LobbyId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    CityTrial,
    AirRide,
    TopRide,
    /// Decode-only sentinel.
    #[serde(skip)]
    Unknown,
}

impl MetadataEnum for GameMode {
    const VARIANTS: &'static [Self] = &[GameMode::CityTrial, GameMode::AirRide, GameMode::TopRide];
    const UNKNOWN: Self = GameMode::Unknown;

    fn wire_str(self) -> Option<&'static str> {
        match self {
            GameMode::CityTrial => Some("City Trial"),
            GameMode::AirRide => Some("Air Ride"),
            GameMode::TopRide => Some("Top Ride"),
            GameMode::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameCategory {
    Ranked,
    Casual,
    Other,
    /// Decode-only sentinel.
    #[serde(skip)]
    Unknown,
}

impl MetadataEnum for GameCategory {
    const VARIANTS: &'static [Self] = &[GameCategory::Ranked, GameCategory::Casual, GameCategory::Other];
    const UNKNOWN: Self = GameCategory::Unknown;

    fn wire_str(self) -> Option<&'static str> {
        match self {
            GameCategory::Ranked => Some("Rank"),
            GameCategory::Casual => Some("Casual"),
            GameCategory::Other => Some("Other"),
            GameCategory::Unknown => None,
        }
    }
}

/// Lobby lifecycle: `Waiting -> TweakingMods -> Ready -> InGame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    TweakingMods,
    Ready,
    InGame,
    /// Decode-only sentinel.
    #[serde(skip)]
    Unknown,
}

impl GameStatus {
    fn rank(self) -> Option<u8> {
        match self {
            GameStatus::Waiting => Some(0),
            GameStatus::TweakingMods => Some(1),
            GameStatus::Ready => Some(2),
            GameStatus::InGame => Some(3),
            GameStatus::Unknown => None,
        }
    }

    /// Forward-only check. Staying put is allowed, going back is not; from
    /// `Unknown` anything publishable is accepted.
    pub fn can_advance_to(self, next: GameStatus) -> bool {
        match (self.rank(), next.rank()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(cur), Some(nxt)) => nxt >= cur,
        }
    }
}

impl MetadataEnum for GameStatus {
    const VARIANTS: &'static [Self] = &[
        GameStatus::Waiting,
        GameStatus::TweakingMods,
        GameStatus::Ready,
        GameStatus::InGame,
    ];
    const UNKNOWN: Self = GameStatus::Unknown;

    fn wire_str(self) -> Option<&'static str> {
        match self {
            GameStatus::Waiting => Some("Waiting"),
            // legacy spelling, kept for wire compatibility
            GameStatus::TweakingMods => Some("Tweaking Status"),
            GameStatus::Ready => Some("Ready"),
            GameStatus::InGame => Some("In Game"),
            GameStatus::Unknown => None,
        }
    }
}

/// Where joiners connect: a literal address (direct) or an opaque
/// traversal/host code. The flag and the address only mean something
/// together, so they travel as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEndpoint {
    pub direct: bool,
    pub address: String,
    pub port: u16,
}

impl HostEndpoint {
    pub fn direct(address: impl Into<String>, port: u16) -> Self {
        Self { direct: true, address: address.into(), port }
    }

    pub fn traversal(host_code: impl Into<String>, port: u16) -> Self {
        Self { direct: false, address: host_code.into(), port }
    }
}

/// The session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    id: Option<LobbyId>,
    pub name: String,
    pub description: String,
    pub region: String,
    pub game_category: GameCategory,
    pub game_mode: GameMode,
    pub status: GameStatus,
    pub max_players: u16,
    pub current_players: u16,
    pub rom_id: String,
    pub build_version: String,
    has_password: bool,
    password: String,
    endpoint: HostEndpoint,
}

impl Default for Lobby {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            region: String::new(),
            game_category: GameCategory::Unknown,
            game_mode: GameMode::Unknown,
            status: GameStatus::Unknown,
            max_players: 0,
            current_players: 0,
            rom_id: String::new(),
            build_version: String::new(),
            has_password: false,
            password: String::new(),
            endpoint: HostEndpoint::default(),
        }
    }
}

impl Lobby {
    /// Empty record, optionally bound to a directory identity.
    pub fn new(id: Option<LobbyId>) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn id(&self) -> Option<LobbyId> {
        self.id
    }

    /// Bind the directory identity. Returns `false` (and changes nothing) if
    /// an identity is already set.
    pub fn assign_id(&mut self, id: LobbyId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }

    pub fn has_password(&self) -> bool {
        self.has_password
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// `None` or an empty string clears the password.
    pub fn set_password(&mut self, password: Option<String>) {
        match password.filter(|p| !p.is_empty()) {
            Some(p) => {
                self.has_password = true;
                self.password = p;
            }
            None => {
                self.has_password = false;
                self.password.clear();
            }
        }
    }

    pub fn endpoint(&self) -> &HostEndpoint {
        &self.endpoint
    }

    pub fn is_direct_connect(&self) -> bool {
        self.endpoint.direct
    }

    pub fn set_endpoint(&mut self, endpoint: HostEndpoint) {
        self.endpoint = endpoint;
    }

    /// True when both ROM and build match the given local content.
    pub fn is_compatible_with(&self, rom_id: &str, build_version: &str) -> bool {
        self.rom_id == rom_id && self.build_version == build_version
    }

    /// Encode one field. `None` for an enum still holding its sentinel.
    pub fn field(&self, key: MetadataKey) -> Option<String> {
        let value = match key {
            MetadataKey::Name => self.name.clone(),
            MetadataKey::Description => self.description.clone(),
            MetadataKey::Region => self.region.clone(),
            MetadataKey::GameCategory => codec::encode_enum(self.game_category)?.to_string(),
            MetadataKey::GameMode => codec::encode_enum(self.game_mode)?.to_string(),
            MetadataKey::GameStatus => codec::encode_enum(self.status)?.to_string(),
            MetadataKey::MaxPlayerCount => codec::encode_u16(self.max_players),
            MetadataKey::CurrentPlayerCount => codec::encode_u16(self.current_players),
            MetadataKey::HasPassword => codec::encode_bool(self.has_password).to_string(),
            MetadataKey::Password => self.password.clone(),
            MetadataKey::NetworkMode => codec::encode_network_mode(self.endpoint.direct).to_string(),
            MetadataKey::HostPort => codec::encode_u16(self.endpoint.port),
            MetadataKey::HostCode => self.endpoint.address.clone(),
            MetadataKey::BuildVersion => self.build_version.clone(),
            MetadataKey::RomId => self.rom_id.clone(),
        };
        Some(value)
    }

    /// All publishable fields, in publish order.
    pub fn metadata(&self) -> Vec<(MetadataKey, String)> {
        MetadataKey::ALL
            .iter()
            .filter_map(|&k| self.field(k).map(|v| (k, v)))
            .collect()
    }

    /// Decode one field into the record. Never fails.
    pub fn apply_field(&mut self, key: MetadataKey, value: &str) {
        match key {
            MetadataKey::Name => self.name = value.to_string(),
            MetadataKey::Description => self.description = value.to_string(),
            MetadataKey::Region => self.region = value.to_string(),
            MetadataKey::GameCategory => self.game_category = codec::decode_enum(value),
            MetadataKey::GameMode => self.game_mode = codec::decode_enum(value),
            MetadataKey::GameStatus => self.status = codec::decode_enum(value),
            MetadataKey::MaxPlayerCount => self.max_players = codec::decode_u16(value),
            MetadataKey::CurrentPlayerCount => self.current_players = codec::decode_u16(value),
            MetadataKey::HasPassword => self.has_password = codec::decode_bool(value),
            MetadataKey::Password => self.password = value.to_string(),
            MetadataKey::NetworkMode => self.endpoint.direct = codec::decode_network_mode(value),
            MetadataKey::HostPort => self.endpoint.port = codec::decode_u16(value),
            MetadataKey::HostCode => self.endpoint.address = value.to_string(),
            MetadataKey::BuildVersion => self.build_version = value.to_string(),
            MetadataKey::RomId => self.rom_id = value.to_string(),
        }
    }

    /// Build a record from raw directory pairs. Unknown keys are ignored.
    pub fn from_metadata<'a, I>(id: Option<LobbyId>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut lobby = Lobby::new(id);
        for (k, v) in pairs {
            match MetadataKey::parse(k) {
                Some(key) => lobby.apply_field(key, v),
                None => trace!(key = %k, "ignoring unknown lobby metadata key"),
            }
        }
        lobby.normalize();
        lobby
    }

    /// Reconcile fields decoded independently of each other: a password is
    /// only kept when `has_password` says there is one.
    pub fn normalize(&mut self) {
        if !self.has_password {
            self.password.clear();
        }
    }
}
