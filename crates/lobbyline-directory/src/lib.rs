//! lobbyline directory runtime.
//!
//! Wires a [`directory::DirectoryClient`] backend into the host/join service,
//! the background discovery loop and the session roster. It is intended to be
//! consumed by the demo binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod directory;
pub mod discovery;
pub mod obs;
pub mod roster;
pub mod service;

pub use directory::{DirectoryClient, InMemoryDirectory};
pub use discovery::{BrowseFilter, DiscoveryEvent, DiscoveryLoop, Snapshot};
pub use roster::RosterManager;
pub use service::{FieldStatus, ServiceConfig, ServiceState, SessionDirectoryService, SessionHandle};
