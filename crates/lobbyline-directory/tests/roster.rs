#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use lobbyline_core::{ErrorCode, PlayerId};
use lobbyline_directory::RosterManager;

#[test]
fn indices_are_dense_from_zero() {
    let roster = RosterManager::new(4);
    assert_eq!(roster.add_player(PlayerId(10), "kirby").unwrap(), 0);
    assert_eq!(roster.add_player(PlayerId(11), "dedede").unwrap(), 1);
    assert_eq!(roster.add_player(PlayerId(12), "meta knight").unwrap(), 2);
    assert_eq!(roster.len().unwrap(), 3);
}

#[test]
fn full_roster_rejects_and_keeps_size() {
    let roster = RosterManager::new(2);
    roster.add_player(PlayerId(1), "a").unwrap();
    roster.add_player(PlayerId(2), "b").unwrap();

    let err = roster.add_player(PlayerId(3), "c").unwrap_err();
    assert_eq!(err.code(), ErrorCode::RosterFull);
    assert_eq!(roster.len().unwrap(), 2);
    assert!(roster.get(PlayerId(3)).unwrap().is_none());
}

#[test]
fn removal_leaves_a_gap_that_is_reused_lowest_first() {
    let roster = RosterManager::new(4);
    for (i, id) in [1, 2, 3, 4].into_iter().enumerate() {
        assert_eq!(roster.add_player(PlayerId(id), "p").unwrap() as usize, i);
    }

    roster.remove_player(PlayerId(2)).unwrap().expect("present");
    roster.remove_player(PlayerId(1)).unwrap().expect("present");
    // survivors keep their slots
    assert_eq!(roster.get(PlayerId(3)).unwrap().unwrap().local_index, 2);
    assert_eq!(roster.get(PlayerId(4)).unwrap().unwrap().local_index, 3);

    assert_eq!(roster.add_player(PlayerId(5), "p").unwrap(), 0);
    assert_eq!(roster.add_player(PlayerId(6), "p").unwrap(), 1);

    let order: Vec<u8> = roster.players().unwrap().iter().map(|p| p.local_index).collect();
    assert_eq!(order, [0u8, 1, 2, 3]);
}

#[test]
fn re_adding_an_identity_is_idempotent() {
    let roster = RosterManager::new(2);
    assert_eq!(roster.add_player(PlayerId(7), "kirby").unwrap(), 0);
    assert_eq!(roster.add_player(PlayerId(7), "renamed").unwrap(), 0);
    assert_eq!(roster.len().unwrap(), 1);
    assert_eq!(roster.get(PlayerId(7)).unwrap().unwrap().display_name, "kirby");
}

#[test]
fn names_are_validated_not_truncated() {
    let roster = RosterManager::new(4);
    let err = roster.add_player(PlayerId(1), &"x".repeat(31)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NameTooLong);
    assert!(roster.is_empty().unwrap());

    let err = roster.add_player(PlayerId(1), "").unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadRequest);
}

#[test]
fn removing_an_absent_player_is_a_no_op() {
    let roster = RosterManager::new(4);
    assert!(roster.remove_player(PlayerId(99)).unwrap().is_none());
}

#[test]
fn concurrent_adds_get_unique_indices() {
    let roster = Arc::new(RosterManager::new(16));
    let handles: Vec<_> = (0..16u64)
        .map(|i| {
            let roster = Arc::clone(&roster);
            std::thread::spawn(move || roster.add_player(PlayerId(i), "p").unwrap())
        })
        .collect();

    let mut indices: Vec<u8> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..16u8).collect::<Vec<_>>());
    assert!(roster.add_player(PlayerId(100), "late").is_err());
}
