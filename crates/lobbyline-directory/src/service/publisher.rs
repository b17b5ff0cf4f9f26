//! Host publish worker.
//!
//! One task per hosted lobby: create the directory session, bind the id,
//! then apply queued field writes strictly in issue order. A write whose key
//! has since been re-stamped is skipped (last write wins per key).

use std::sync::Weak;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use lobbyline_core::error::LobbyError;
use lobbyline_core::{LobbyId, MetadataKey};

use super::ledger::FieldStatus;
use super::{Inner, ServiceState};
use crate::directory::with_deadline;

#[derive(Debug)]
pub(crate) struct FieldWrite {
    pub seq: u64,
    pub key: MetadataKey,
    pub value: String,
}

/// Progress of the create request, observed through [`super::SessionHandle`].
#[derive(Debug, Clone)]
pub(crate) enum CreateState {
    Pending,
    Created(LobbyId),
    Failed(LobbyError),
}

pub(crate) async fn run(
    inner: Weak<Inner>,
    epoch: u64,
    max_players: u16,
    mut rx: mpsc::UnboundedReceiver<FieldWrite>,
    created: watch::Sender<CreateState>,
) {
    let Some(id) = create(&inner, epoch, max_players, &created).await else {
        return;
    };

    while let Some(write) = rx.recv().await {
        let Some(inner) = inner.upgrade() else { break };

        if !inner.ledger.is_current(write.key, write.seq) {
            trace!(lobby = %id, key = %write.key, seq = write.seq, "superseded write skipped");
            inner
                .metrics
                .field_writes
                .inc(&[("key", write.key.as_str()), ("outcome", "superseded")]);
            inner.settled.notify_waiters();
            continue;
        }

        let res = with_deadline(
            inner.timeout,
            inner.directory.set_field(id, write.key.as_str(), &write.value),
        )
        .await;
        inner.metrics.record_call("set_field", &res);

        let status = match res {
            Ok(()) => FieldStatus::Published,
            Err(e) => {
                warn!(lobby = %id, key = %write.key, error = %e, "field write failed");
                FieldStatus::Failed(e.to_string())
            }
        };
        let outcome = if status == FieldStatus::Published { "published" } else { "failed" };
        inner
            .metrics
            .field_writes
            .inc(&[("key", write.key.as_str()), ("outcome", outcome)]);
        inner.ledger.settle(write.key, write.seq, status);
        inner.settled.notify_waiters();
    }

    debug!(lobby = %id, "publish worker exited");
}

/// Create the session and move the service to `Hosting`. `None` if the
/// worker should stop (create failed, service closed or dropped).
async fn create(
    weak: &Weak<Inner>,
    epoch: u64,
    max_players: u16,
    created: &watch::Sender<CreateState>,
) -> Option<LobbyId> {
    let inner = weak.upgrade()?;

    let res = with_deadline(inner.timeout, inner.directory.create_session(max_players)).await;
    inner.metrics.record_call("create_session", &res);

    let id = match res {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "lobby create failed");
            if let Ok(mut session) = inner.session.lock() {
                if session.epoch == epoch && matches!(session.state, ServiceState::Creating) {
                    session.reset();
                }
            }
            let _ = created.send(CreateState::Failed(e));
            return None;
        }
    };

    let bound = match inner.session.lock() {
        Ok(mut session) if session.epoch == epoch && matches!(session.state, ServiceState::Creating) => {
            if let Some(lobby) = session.lobby.as_mut() {
                lobby.assign_id(id);
            }
            session.state = ServiceState::Hosting(id);
            true
        }
        _ => false,
    };

    if !bound {
        // closed while the create was in flight
        debug!(lobby = %id, "lobby created after close, leaving");
        let res = with_deadline(inner.timeout, inner.directory.leave_session(id)).await;
        inner.metrics.record_call("leave_session", &res);
        let _ = created.send(CreateState::Failed(LobbyError::Closed));
        return None;
    }

    info!(lobby = %id, max_players, "lobby created");
    let _ = created.send(CreateState::Created(id));
    Some(id)
}
