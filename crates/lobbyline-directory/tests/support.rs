//! Shared fixtures for directory runtime tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lobbyline_core::PlayerId;
use lobbyline_directory::config::LobbySettings;
use lobbyline_directory::obs::metrics::LobbyMetrics;
use lobbyline_directory::{
    DirectoryClient, InMemoryDirectory, ServiceConfig, SessionDirectoryService,
};

pub const HOST_ID: PlayerId = PlayerId(1);
pub const WAIT: Duration = Duration::from_secs(2);

pub fn service_with(directory: Arc<InMemoryDirectory>, nickname: &str) -> SessionDirectoryService {
    service_on(directory, nickname)
}

/// Service over any directory client, for wrappers that add latency or faults.
pub fn service_on(directory: Arc<dyn DirectoryClient>, nickname: &str) -> SessionDirectoryService {
    let mut cfg = ServiceConfig::new(HOST_ID, nickname);
    cfg.request_timeout = Duration::from_millis(500);
    SessionDirectoryService::new(directory, cfg, Arc::new(LobbyMetrics::default()))
}

pub fn service(directory: Arc<InMemoryDirectory>) -> SessionDirectoryService {
    service_with(directory, "kirby")
}

pub fn settings() -> LobbySettings {
    let mut s = LobbySettings::new("Friday City Trial", "EU");
    s.description = "all welcome".into();
    s.rom_id = "KAR-NTSC-1.0".into();
    s.build_version = "0.9.3".into();
    s
}
