#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use lobbyline_core::player::validate_display_name;
use lobbyline_core::region::{is_known_region, region_name};
use lobbyline_core::{ErrorCode, LobbyFilter, MetadataKey, MAX_NAME_LENGTH};

#[test]
fn name_at_limit_is_accepted() {
    let name = "a".repeat(MAX_NAME_LENGTH);
    validate_display_name(&name).expect("30 chars must pass");
}

#[test]
fn name_over_limit_is_rejected_not_truncated() {
    let name = "a".repeat(MAX_NAME_LENGTH + 1);
    let err = validate_display_name(&name).expect_err("31 chars must fail");
    assert_eq!(err.code(), ErrorCode::NameTooLong);
}

#[test]
fn name_limit_counts_characters_not_bytes() {
    // 30 three-byte characters
    let name = "カ".repeat(MAX_NAME_LENGTH);
    assert!(name.len() > MAX_NAME_LENGTH);
    validate_display_name(&name).expect("multibyte name within limit");
}

#[test]
fn empty_name_is_bad_request() {
    let err = validate_display_name("").expect_err("empty must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn filter_is_exact_and_conjunctive() {
    let filter = LobbyFilter::new()
        .with(MetadataKey::Region, "NA")
        .with(MetadataKey::GameMode, "City Trial");

    let mut meta: HashMap<&str, &str> = HashMap::new();
    meta.insert("region", "NA");
    meta.insert("game_mode", "City Trial");
    assert!(filter.matches(|k| meta.get(k).copied()));

    meta.insert("game_mode", "city trial");
    assert!(!filter.matches(|k| meta.get(k).copied()));

    meta.remove("game_mode");
    assert!(!filter.matches(|k| meta.get(k).copied()));

    assert!(LobbyFilter::new().matches(|_| None));
}

#[test]
fn filter_insert_replaces_previous_value() {
    let mut filter = LobbyFilter::new().with(MetadataKey::Region, "EU");
    filter.insert(MetadataKey::Region, "OC");
    assert_eq!(filter.len(), 1);
    assert_eq!(filter.get(MetadataKey::Region), Some("OC"));
}

#[test]
fn key_table_round_trips() {
    for key in MetadataKey::ALL {
        assert_eq!(MetadataKey::parse(key.as_str()), Some(key));
    }
    assert_eq!(MetadataKey::parse("game_catagory"), None);
    assert_eq!(MetadataKey::Description.as_str(), "desc");
}

#[test]
fn regions() {
    assert!(is_known_region("NA"));
    assert!(!is_known_region("na"));
    assert_eq!(region_name("OC"), Some("Oceania"));
}
