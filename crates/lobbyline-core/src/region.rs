//! Region tags a host may advertise.

/// `(tag, display name)` pairs.
pub const REGIONS: &[(&str, &str)] = &[
    ("EA", "East Asia"),
    ("CN", "China"),
    ("EU", "Europe"),
    ("NA", "North America"),
    ("SA", "South America"),
    ("OC", "Oceania"),
    ("AF", "Africa"),
];

pub fn is_known_region(tag: &str) -> bool {
    REGIONS.iter().any(|(t, _)| *t == tag)
}

pub fn region_name(tag: &str) -> Option<&'static str> {
    REGIONS.iter().find(|(t, _)| *t == tag).map(|(_, name)| *name)
}
