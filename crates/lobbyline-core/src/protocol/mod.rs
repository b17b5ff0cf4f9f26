//! Directory metadata protocol.
//!
//! The directory stores nothing but flat `key -> string` maps. This module
//! holds the key table, the typed codec and the listing filter. Every decoder
//! here is total: the directory is written by other clients and is treated as
//! untrusted, so malformed text resolves to documented fallback values
//! instead of errors.

pub mod codec;
pub mod filter;
pub mod keys;

pub use codec::MetadataEnum;
pub use filter::LobbyFilter;
pub use keys::MetadataKey;
