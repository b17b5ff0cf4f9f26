//! Hosting: create, publish, mutate, close.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use lobbyline_core::error::Result;
use lobbyline_core::{
    ErrorCode, GameMode, GameStatus, HostEndpoint, LobbyFilter, LobbyId, MetadataKey, PlayerId,
};
use lobbyline_directory::{DirectoryClient, FieldStatus, InMemoryDirectory, ServiceState};

mod support;
use support::{service, service_on, service_with, settings, WAIT};

#[tokio::test]
async fn host_publishes_every_field() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));

    let handle = svc.host(&settings()).expect("host");
    let id = handle.wait_created().await.expect("created");
    handle.wait_published(WAIT).await.expect("published");

    assert_eq!(svc.state().unwrap(), ServiceState::Hosting(id));
    assert_eq!(handle.id(), Some(id));
    assert_eq!(dir.max_players(id), Some(4));

    let raw = dir.raw_fields(id).expect("session exists");
    assert_eq!(raw["name"], "Friday City Trial");
    assert_eq!(raw["desc"], "all welcome");
    assert_eq!(raw["region"], "EU");
    assert_eq!(raw["game_mode"], "City Trial");
    assert_eq!(raw["game_category"], "Casual");
    assert_eq!(raw["game_status"], "Waiting");
    assert_eq!(raw["current_player_count"], "1");
    assert_eq!(raw["has_password"], "false");
    assert_eq!(raw["network_mode"], "traversal");
    assert_eq!(raw["rom_id"], "KAR-NTSC-1.0");
    assert_eq!(raw.len(), MetadataKey::ALL.len());

    assert!(handle.failed_fields().is_empty());
    assert_eq!(handle.field_status(MetadataKey::Name), Some(FieldStatus::Published));
}

#[tokio::test]
async fn long_nickname_fails_before_any_directory_call() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service_with(Arc::clone(&dir), &"a".repeat(31));

    let err = svc.host(&settings()).err().expect("must fail");
    assert_eq!(err.code(), ErrorCode::NameTooLong);

    tokio::task::yield_now().await;
    assert_eq!(dir.stats().create_calls(), 0);
    assert_eq!(dir.stats().set_field_calls(), 0);
    assert_eq!(svc.state().unwrap(), ServiceState::Idle);
}

#[tokio::test]
async fn entering_own_lobby_skips_the_directory() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));

    let handle = svc.host(&settings()).unwrap();
    let id = handle.wait_created().await.unwrap();

    let lobby = svc.enter_session(id).await.expect("enter own");
    assert_eq!(lobby.id(), Some(id));
    assert_eq!(lobby, handle.lobby().unwrap());
    assert_eq!(dir.stats().get_field_calls(), 0);
    assert_eq!(dir.stats().enter_calls(), 0);
}

// current-thread runtime: the publish worker cannot run until the test yields,
// so these writes are all queued before the create completes
#[tokio::test(flavor = "current_thread")]
async fn writes_before_create_are_flushed_in_order() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));

    let handle = svc.host(&settings()).unwrap();
    assert_eq!(handle.id(), None);
    assert_eq!(svc.state().unwrap(), ServiceState::Creating);

    handle.set_name("first rename").unwrap();
    handle.set_name("second rename").unwrap();
    handle.set_status(GameStatus::Ready).unwrap();
    assert_eq!(handle.lobby().unwrap().name, "second rename");

    let id = handle.wait_created().await.unwrap();
    handle.wait_published(WAIT).await.unwrap();

    let raw = dir.raw_fields(id).unwrap();
    assert_eq!(raw["name"], "second rename");
    assert_eq!(raw["game_status"], "Ready");

    let superseded = svc
        .metrics()
        .field_writes
        .get(&[("key", "name"), ("outcome", "superseded")]);
    assert_eq!(superseded, 2);
}

#[tokio::test]
async fn status_only_moves_forward() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));
    let handle = svc.host(&settings()).unwrap();
    handle.wait_created().await.unwrap();

    handle.set_status(GameStatus::InGame).unwrap();
    let err = handle.set_status(GameStatus::Waiting).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert_eq!(handle.lobby().unwrap().status, GameStatus::InGame);

    handle.wait_published(WAIT).await.unwrap();
    let writes = dir.stats().set_field_calls();
    handle.set_status(GameStatus::InGame).unwrap();
    handle.wait_published(WAIT).await.unwrap();
    assert_eq!(dir.stats().set_field_calls(), writes, "same status writes nothing");

    let err = handle.set_status(GameStatus::Unknown).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadRequest);
}

#[tokio::test]
async fn generic_set_field_rules() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));
    let handle = svc.host(&settings()).unwrap();
    let id = handle.wait_created().await.unwrap();

    for key in [MetadataKey::Password, MetadataKey::HostCode, MetadataKey::NetworkMode] {
        let err = handle.set_field(key, "x").unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest, "{key}");
    }
    assert_eq!(
        handle.set_field(MetadataKey::CurrentPlayerCount, "9").unwrap_err().code(),
        ErrorCode::BadRequest
    );
    assert_eq!(
        handle.set_field(MetadataKey::GameMode, "Moon Ride").unwrap_err().code(),
        ErrorCode::BadRequest
    );
    assert_eq!(
        handle.set_field(MetadataKey::Region, "Mars").unwrap_err().code(),
        ErrorCode::BadRequest
    );

    handle.set_field(MetadataKey::GameMode, "Air Ride").unwrap();
    handle.set_field(MetadataKey::GameStatus, "In Game").unwrap();
    assert_eq!(
        handle.set_field(MetadataKey::GameStatus, "Waiting").unwrap_err().code(),
        ErrorCode::InvalidTransition
    );

    handle.wait_published(WAIT).await.unwrap();
    let lobby = handle.lobby().unwrap();
    assert_eq!(lobby.game_mode, GameMode::AirRide);
    let raw = dir.raw_fields(id).unwrap();
    assert_eq!(raw["game_mode"], "Air Ride");
    assert_eq!(raw["game_status"], "In Game");
}

#[tokio::test]
async fn paired_fields_change_together() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));
    let handle = svc.host(&settings()).unwrap();
    let id = handle.wait_created().await.unwrap();

    handle.set_password(Some("hunter2".into())).unwrap();
    handle.set_endpoint(HostEndpoint::direct("192.168.1.20", 2626)).unwrap();
    handle.wait_published(WAIT).await.unwrap();

    let raw = dir.raw_fields(id).unwrap();
    assert_eq!(raw["has_password"], "true");
    assert_eq!(raw["password"], "hunter2");
    assert_eq!(raw["network_mode"], "direct");
    assert_eq!(raw["host_code"], "192.168.1.20");
    assert_eq!(raw["host_port"], "2626");

    handle.set_password(Some(String::new())).unwrap();
    handle.wait_published(WAIT).await.unwrap();
    let raw = dir.raw_fields(id).unwrap();
    assert_eq!(raw["has_password"], "false");
    assert_eq!(raw["password"], "");

    let err = handle.set_endpoint(HostEndpoint::direct("", 1)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadRequest);
}

#[tokio::test]
async fn failed_field_is_reported_and_retried() {
    let dir = Arc::new(InMemoryDirectory::new());
    dir.fail_writes_for("desc");
    let svc = service(Arc::clone(&dir));

    let handle = svc.host(&settings()).unwrap();
    let id = handle.wait_created().await.unwrap();
    handle.wait_published(WAIT).await.unwrap();

    let failed = handle.failed_fields();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, MetadataKey::Description);
    // the rest of the record still went out
    assert_eq!(dir.raw_fields(id).unwrap()["name"], "Friday City Trial");
    assert!(!dir.raw_fields(id).unwrap().contains_key("desc"));
    assert_eq!(svc.state().unwrap(), ServiceState::Hosting(id));

    dir.clear_write_failures();
    assert_eq!(handle.retry_failed().unwrap(), 1);
    handle.wait_published(WAIT).await.unwrap();

    assert!(handle.failed_fields().is_empty());
    assert_eq!(handle.field_status(MetadataKey::Description), Some(FieldStatus::Published));
    assert_eq!(dir.raw_fields(id).unwrap()["desc"], "all welcome");
}

#[tokio::test]
async fn roster_changes_republish_player_count() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));
    let handle = svc.host(&settings()).unwrap();
    let id = handle.wait_created().await.unwrap();

    assert_eq!(svc.add_player(PlayerId(2), "waddle dee").unwrap(), 1);
    handle.wait_published(WAIT).await.unwrap();
    assert_eq!(dir.raw_fields(id).unwrap()["current_player_count"], "2");

    svc.remove_player(PlayerId(2)).unwrap().expect("was present");
    handle.wait_published(WAIT).await.unwrap();
    assert_eq!(dir.raw_fields(id).unwrap()["current_player_count"], "1");
    assert_eq!(handle.lobby().unwrap().current_players, 1);
}

#[tokio::test]
async fn unavailable_directory_fails_create_and_revokes_handle() {
    let dir = Arc::new(InMemoryDirectory::unavailable());
    let svc = service(Arc::clone(&dir));

    let handle = svc.host(&settings()).unwrap();
    let err = handle.wait_created().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::DirectoryUnavailable);
    assert_eq!(svc.state().unwrap(), ServiceState::Idle);

    let err = handle.set_name("too late").unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotAuthorized);

    // the service is still usable once the backend is back
    dir.set_available(true);
    let handle = svc.host(&settings()).unwrap();
    handle.wait_created().await.unwrap();
}

#[tokio::test]
async fn hosting_twice_is_invalid() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(dir);
    let _handle = svc.host(&settings()).unwrap();
    let err = svc.host(&settings()).err().expect("second host must fail");
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[tokio::test]
async fn close_leaves_and_blocks_further_use() {
    let dir = Arc::new(InMemoryDirectory::new());
    let svc = service(Arc::clone(&dir));
    let handle = svc.host(&settings()).unwrap();
    let id = handle.wait_created().await.unwrap();
    handle.wait_published(WAIT).await.unwrap();

    svc.close().await.unwrap();
    svc.close().await.unwrap();
    assert_eq!(svc.state().unwrap(), ServiceState::Closed);
    assert_eq!(dir.stats().leave_calls(), 1);
    assert_eq!(dir.member_count(id), Some(0));

    assert_eq!(handle.set_name("x").unwrap_err().code(), ErrorCode::Closed);
    assert_eq!(svc.host(&settings()).err().unwrap().code(), ErrorCode::Closed);
    assert_eq!(svc.enter_session(id).await.unwrap_err().code(), ErrorCode::Closed);
    assert_eq!(
        svc.add_player(PlayerId(3), "meta knight").unwrap_err().code(),
        ErrorCode::Closed
    );
}

/// Registers the session at once but reports the id late, like an SDK whose
/// completion callback arrives after the lobby already exists.
struct LateCreate {
    inner: Arc<InMemoryDirectory>,
    delay: Duration,
}

#[async_trait]
impl DirectoryClient for LateCreate {
    async fn create_session(&self, max_players: u16) -> Result<LobbyId> {
        let id = self.inner.create_session(max_players).await?;
        tokio::time::sleep(self.delay).await;
        Ok(id)
    }
    async fn set_field(&self, id: LobbyId, key: &str, value: &str) -> Result<()> {
        self.inner.set_field(id, key, value).await
    }
    async fn get_field(&self, id: LobbyId, key: &str) -> Result<Option<String>> {
        self.inner.get_field(id, key).await
    }
    async fn list_sessions(&self, filter: &LobbyFilter) -> Result<Vec<LobbyId>> {
        self.inner.list_sessions(filter).await
    }
    async fn enter_session(&self, id: LobbyId) -> Result<()> {
        self.inner.enter_session(id).await
    }
    async fn leave_session(&self, id: LobbyId) -> Result<()> {
        self.inner.leave_session(id).await
    }
}

#[tokio::test]
async fn close_while_creating_leaves_the_late_session() {
    let dir = Arc::new(InMemoryDirectory::new());
    let late = Arc::new(LateCreate { inner: Arc::clone(&dir), delay: Duration::from_millis(50) });
    let svc = service_on(late, "kirby");

    let handle = svc.host(&settings()).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(svc.state().unwrap(), ServiceState::Creating);

    svc.close().await.unwrap();
    assert_eq!(svc.state().unwrap(), ServiceState::Closed);

    // the lobby came into existence and was left before close returned
    assert_eq!(dir.session_count(), 1);
    assert_eq!(dir.stats().leave_calls(), 1);
    assert_eq!(dir.member_count(LobbyId::new(1)), Some(0));
    assert_eq!(dir.stats().set_field_calls(), 0);

    assert_eq!(handle.wait_created().await.unwrap_err().code(), ErrorCode::Closed);
    assert_eq!(handle.set_name("x").unwrap_err().code(), ErrorCode::Closed);
}
