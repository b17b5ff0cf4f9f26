//! lobbyline demo
//!
//! Hosts the configured lobby on an in-process directory next to two seeded
//! foreign lobbies, runs one discovery pass, and logs what a browser would
//! see plus the metrics it produced.
//!
//! Usage: `lobbyline [config.yaml]` (default `lobbyline.yaml`).

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::MetadataKey;
use lobbyline_directory::{app_state, config, BrowseFilter, DiscoveryEvent, InMemoryDirectory};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "lobbyline.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let directory = Arc::new(InMemoryDirectory::new());
    directory.insert_raw([
        ("name", "Sunday Trial"),
        ("region", "EU"),
        ("game_mode", "City Trial"),
        ("game_status", "Waiting"),
        ("max_player_count", "4"),
        ("current_player_count", "2"),
    ]);
    directory.insert_raw([
        ("name", "???"),
        ("region", "EU"),
        ("game_mode", "Moon Ride"),
        ("max_player_count", "lots"),
    ]);

    let state = app_state::AppState::new(cfg, directory)?;
    let service = state.session_service();
    let settings = state.lobby_settings()?.clone();

    let handle = service.host(&settings)?;
    let id = handle.wait_created().await?;
    handle
        .wait_published(state.cfg().directory.request_timeout())
        .await?;
    info!(lobby = %id, name = %settings.name, "lobby published");

    let (discovery, mut events) = state.discovery();
    discovery.set_filter(BrowseFilter::new().require(MetadataKey::Region, settings.region.clone()))?;
    discovery.start()?;

    let first = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .map_err(|_| LobbyError::Timeout)?;
    discovery.stop().await?;

    match first {
        Some(DiscoveryEvent::Snapshot(snapshot)) => {
            info!(generation = snapshot.generation, soft_errors = snapshot.soft_errors, "snapshot");
            for lobby in &snapshot.lobbies {
                info!(
                    id = ?lobby.id(),
                    name = %lobby.name,
                    mode = ?lobby.game_mode,
                    players = lobby.current_players,
                    max = lobby.max_players,
                    "lobby"
                );
            }
        }
        Some(DiscoveryEvent::Failed { generation, error }) => {
            warn!(generation, error = %error, "discovery failed");
        }
        None => warn!("discovery stopped without a result"),
    }

    service.close().await?;
    info!("metrics\n{}", state.metrics().render());
    Ok(())
}
