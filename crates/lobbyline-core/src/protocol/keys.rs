//! Metadata key table.
//!
//! These strings are the wire contract with every other client reading the
//! directory; publish and read side must agree byte for byte.

use std::fmt;

/// A lobby metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    Name,
    Description,
    Region,
    GameCategory,
    GameMode,
    GameStatus,
    MaxPlayerCount,
    CurrentPlayerCount,
    HasPassword,
    Password,
    NetworkMode,
    HostPort,
    HostCode,
    BuildVersion,
    RomId,
}

impl MetadataKey {
    /// Every key, in publish order. `Name` comes first: readers use it to
    /// detect whether a session exists at all.
    pub const ALL: [MetadataKey; 15] = [
        MetadataKey::Name,
        MetadataKey::Description,
        MetadataKey::Region,
        MetadataKey::GameCategory,
        MetadataKey::GameMode,
        MetadataKey::GameStatus,
        MetadataKey::MaxPlayerCount,
        MetadataKey::CurrentPlayerCount,
        MetadataKey::HasPassword,
        MetadataKey::Password,
        MetadataKey::NetworkMode,
        MetadataKey::HostPort,
        MetadataKey::HostCode,
        MetadataKey::BuildVersion,
        MetadataKey::RomId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKey::Name => "name",
            MetadataKey::Description => "desc",
            MetadataKey::Region => "region",
            MetadataKey::GameCategory => "game_category",
            MetadataKey::GameMode => "game_mode",
            MetadataKey::GameStatus => "game_status",
            MetadataKey::MaxPlayerCount => "max_player_count",
            MetadataKey::CurrentPlayerCount => "current_player_count",
            MetadataKey::HasPassword => "has_password",
            MetadataKey::Password => "password",
            MetadataKey::NetworkMode => "network_mode",
            MetadataKey::HostPort => "host_port",
            MetadataKey::HostCode => "host_code",
            MetadataKey::BuildVersion => "build_version",
            MetadataKey::RomId => "rom_id",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Keys that only make sense written together with a partner key.
    pub fn is_paired(self) -> bool {
        matches!(
            self,
            MetadataKey::HasPassword
                | MetadataKey::Password
                | MetadataKey::NetworkMode
                | MetadataKey::HostCode
                | MetadataKey::HostPort
        )
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value published under `network_mode` for direct connections.
pub const NETWORK_MODE_DIRECT: &str = "direct";
/// Value published under `network_mode` for traversal/relay connections.
pub const NETWORK_MODE_TRAVERSAL: &str = "traversal";
