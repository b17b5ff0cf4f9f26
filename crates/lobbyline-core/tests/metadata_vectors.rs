//! Directory metadata decode vectors.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use lobbyline_core::{Lobby, LobbyId};

use vector_loader::load;

fn check(lobby: &Lobby, field: &str, expected: &serde_json::Value, desc: &str) {
    let ctx = format!("vector={desc} field={field}");
    match field {
        "name" => assert_eq!(lobby.name, expected.as_str().unwrap(), "{ctx}"),
        "description" => assert_eq!(lobby.description, expected.as_str().unwrap(), "{ctx}"),
        "region" => assert_eq!(lobby.region, expected.as_str().unwrap(), "{ctx}"),
        "game_category" => assert_eq!(format!("{:?}", lobby.game_category), expected.as_str().unwrap(), "{ctx}"),
        "game_mode" => assert_eq!(format!("{:?}", lobby.game_mode), expected.as_str().unwrap(), "{ctx}"),
        "status" => assert_eq!(format!("{:?}", lobby.status), expected.as_str().unwrap(), "{ctx}"),
        "max_players" => assert_eq!(lobby.max_players as u64, expected.as_u64().unwrap(), "{ctx}"),
        "current_players" => assert_eq!(lobby.current_players as u64, expected.as_u64().unwrap(), "{ctx}"),
        "has_password" => assert_eq!(lobby.has_password(), expected.as_bool().unwrap(), "{ctx}"),
        "password" => assert_eq!(lobby.password(), expected.as_str().unwrap(), "{ctx}"),
        "direct" => assert_eq!(lobby.is_direct_connect(), expected.as_bool().unwrap(), "{ctx}"),
        "port" => assert_eq!(lobby.endpoint().port as u64, expected.as_u64().unwrap(), "{ctx}"),
        "address" => assert_eq!(lobby.endpoint().address, expected.as_str().unwrap(), "{ctx}"),
        "build_version" => assert_eq!(lobby.build_version, expected.as_str().unwrap(), "{ctx}"),
        "rom_id" => assert_eq!(lobby.rom_id, expected.as_str().unwrap(), "{ctx}"),
        other => panic!("unknown expect field {other} in {desc}"),
    }
}

#[test]
fn metadata_vectors() {
    let files = [
        "full_record.json",
        "garbage_values.json",
        "partial_record.json",
        "foreign_keys.json",
        "hostile_strings.json",
    ];

    for f in files {
        let v = load(f);
        let lobby = Lobby::from_metadata(Some(LobbyId::new(7)), v.pairs());

        assert_eq!(lobby.id(), Some(LobbyId::new(7)), "vector={}", v.description);
        for (field, expected) in &v.expect {
            check(&lobby, field, expected, &v.description);
        }
    }
}

#[test]
fn published_record_reads_back_identically() {
    let v = load("full_record.json");
    let original = Lobby::from_metadata(Some(LobbyId::new(1)), v.pairs());

    let published = original.metadata();
    let reread = Lobby::from_metadata(
        Some(LobbyId::new(1)),
        published.iter().map(|(k, val)| (k.as_str(), val.as_str())),
    );

    assert_eq!(reread, original);
}
