//! Shared application state: config, directory backend and metrics.
//!
//! Builds the service and discovery loop from one validated config so every
//! component sees the same timeouts and the same metrics registry.

use std::sync::Arc;

use tokio::sync::mpsc;

use lobbyline_core::error::{LobbyError, Result};

use crate::config::{LobbySettings, LobbylineConfig};
use crate::directory::DirectoryClient;
use crate::discovery::{DiscoveryEvent, DiscoveryLoop};
use crate::obs::metrics::LobbyMetrics;
use crate::service::{ServiceConfig, SessionDirectoryService};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: LobbylineConfig,
    directory: Arc<dyn DirectoryClient>,
    metrics: Arc<LobbyMetrics>,
}

impl AppState {
    /// Returns `Result` so main can report a bad config instead of panicking.
    pub fn new(cfg: LobbylineConfig, directory: Arc<dyn DirectoryClient>) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                directory,
                metrics: Arc::new(LobbyMetrics::default()),
            }),
        })
    }

    pub fn cfg(&self) -> &LobbylineConfig {
        &self.inner.cfg
    }

    pub fn directory(&self) -> Arc<dyn DirectoryClient> {
        Arc::clone(&self.inner.directory)
    }

    pub fn metrics(&self) -> Arc<LobbyMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Lobby settings from the config, for hosting.
    pub fn lobby_settings(&self) -> Result<&LobbySettings> {
        self.inner
            .cfg
            .lobby
            .as_ref()
            .ok_or_else(|| LobbyError::BadRequest("config has no lobby section".into()))
    }

    pub fn session_service(&self) -> SessionDirectoryService {
        SessionDirectoryService::new(
            self.directory(),
            ServiceConfig::from_config(&self.inner.cfg),
            self.metrics(),
        )
    }

    pub fn discovery(&self) -> (DiscoveryLoop, mpsc::UnboundedReceiver<DiscoveryEvent>) {
        let cfg = &self.inner.cfg;
        DiscoveryLoop::new(
            self.directory(),
            cfg.discovery.poll_interval(),
            cfg.directory.request_timeout(),
            self.metrics(),
        )
    }
}
