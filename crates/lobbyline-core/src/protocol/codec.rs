//! MetadataCodec: typed values <-> the directory's string-only values.
//!
//! Decoding rules:
//! - Total functions: every input string produces a value, nothing panics.
//! - Enums match exactly (case-sensitive) against their table; anything else
//!   decodes to the type's `Unknown` sentinel.
//! - Bools are `true` only for the exact text `"true"`.
//! - `u16` values that are not plain decimal in range decode to `0`.

use super::keys::{NETWORK_MODE_DIRECT, NETWORK_MODE_TRAVERSAL};

/// A closed enum published as fixed text, with a decode-only sentinel.
pub trait MetadataEnum: Copy + Eq + 'static {
    /// Publishable variants (the sentinel is not listed).
    const VARIANTS: &'static [Self];
    /// Decode target for unknown or missing text.
    const UNKNOWN: Self;

    /// Wire text for a publishable variant, `None` for the sentinel.
    fn wire_str(self) -> Option<&'static str>;
}

/// Encode an enum variant. Returns `None` for the sentinel, which is never
/// written to the directory.
pub fn encode_enum<E: MetadataEnum>(value: E) -> Option<&'static str> {
    value.wire_str()
}

/// Decode enum text; unknown text yields `E::UNKNOWN`.
pub fn decode_enum<E: MetadataEnum>(s: &str) -> E {
    E::VARIANTS
        .iter()
        .copied()
        .find(|v| v.wire_str() == Some(s))
        .unwrap_or(E::UNKNOWN)
}

pub fn encode_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Exact `"true"` only; missing or corrupt text is quietly `false`.
pub fn decode_bool(s: &str) -> bool {
    s == "true"
}

pub fn encode_u16(value: u16) -> String {
    value.to_string()
}

/// Non-numeric or out-of-range text yields `0`.
pub fn decode_u16(s: &str) -> u16 {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    s.parse().unwrap_or(0)
}

pub fn encode_network_mode(direct: bool) -> &'static str {
    if direct {
        NETWORK_MODE_DIRECT
    } else {
        NETWORK_MODE_TRAVERSAL
    }
}

/// Anything other than exact `"direct"` means traversal.
pub fn decode_network_mode(s: &str) -> bool {
    s == NETWORK_MODE_DIRECT
}
