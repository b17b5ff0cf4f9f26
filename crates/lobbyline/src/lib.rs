//! Top-level facade crate for lobbyline.
//!
//! Re-exports the metadata model and the directory runtime so users can
//! depend on a single crate.

pub mod core {
    pub use lobbyline_core::*;
}

pub mod directory {
    pub use lobbyline_directory::*;
}
