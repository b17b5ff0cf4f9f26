//! `lobbyline.yaml` loading.
//!
//! One document describes the local player, the directory request deadline,
//! the discovery cadence and, for hosts, the lobby to publish. Unknown keys
//! are rejected and every section is range-checked before the config is
//! handed to [`crate::app_state::AppState`].

pub mod schema;

use std::fs;
use std::path::Path;

use tracing::debug;

use lobbyline_core::error::{LobbyError, Result};

pub use schema::{
    DirectorySection, DiscoverySection, LobbySettings, LobbylineConfig, NetworkMode,
    NetworkSection, PlayerSection,
};

/// Read and validate a config file. An unreadable file is `Internal`;
/// bad content is `BadRequest`, naming the file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<LobbylineConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| LobbyError::Internal(format!("cannot read {}: {e}", path.display())))?;
    let cfg = load_from_str(&text).map_err(|e| match e {
        LobbyError::BadRequest(msg) => LobbyError::BadRequest(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    debug!(
        path = %path.display(),
        hosting = cfg.lobby.is_some(),
        "lobbyline config loaded"
    );
    Ok(cfg)
}

pub fn load_from_str(text: &str) -> Result<LobbylineConfig> {
    let cfg: LobbylineConfig = serde_yaml::from_str(text)
        .map_err(|e| LobbyError::BadRequest(format!("invalid lobbyline config: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
