//! Background lobby discovery.
//!
//! One worker task per [`DiscoveryLoop`] polls the directory on a fixed
//! interval (or sooner, when woken) and sends each result to the single
//! subscriber as a full replacement snapshot.
//!
//! The active [`BrowseFilter`] is the only state shared with the worker. It
//! sits behind one mutex that is held just long enough to clone it; all
//! directory I/O happens outside the lock. Polls are serialised by an async
//! gate, so an inline [`DiscoveryLoop::poll_once`] never overlaps the
//! worker's listing.

pub mod filter;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::Lobby;

use crate::directory::{read_lobby, with_deadline, DirectoryClient};
use crate::obs::metrics::LobbyMetrics;

pub use filter::{BrowseFilter, LocalContent, Visibility};

/// One poll's worth of visible lobbies, in directory listing order.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Increases by one per poll, failed polls included.
    pub generation: u64,
    pub lobbies: Vec<Lobby>,
    /// Listed lobbies that could not be read and were skipped.
    pub soft_errors: usize,
}

#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    Snapshot(Snapshot),
    /// Listing itself failed; the previous snapshot still stands.
    Failed { generation: u64, error: LobbyError },
}

struct Shared {
    directory: Arc<dyn DirectoryClient>,
    filter: Mutex<BrowseFilter>,
    wake: Notify,
    interval: Duration,
    timeout: Duration,
    events: mpsc::UnboundedSender<DiscoveryEvent>,
    generation: AtomicU64,
    /// Held for the whole of one poll.
    in_flight: tokio::sync::Mutex<()>,
    metrics: Arc<LobbyMetrics>,
}

struct Worker {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

pub struct DiscoveryLoop {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl DiscoveryLoop {
    /// Build a stopped loop and the subscriber's receiving end.
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        interval: Duration,
        request_timeout: Duration,
        metrics: Arc<LobbyMetrics>,
    ) -> (Self, mpsc::UnboundedReceiver<DiscoveryEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            directory,
            filter: Mutex::new(BrowseFilter::default()),
            wake: Notify::new(),
            interval,
            timeout: request_timeout,
            events,
            generation: AtomicU64::new(0),
            in_flight: tokio::sync::Mutex::new(()),
            metrics,
        });
        (Self { shared, worker: Mutex::new(None) }, rx)
    }

    /// Replace the active filter and wake the worker so the next poll uses it
    /// right away.
    pub fn set_filter(&self, filter: impl Into<BrowseFilter>) -> Result<()> {
        let filter = filter.into();
        {
            let mut slot = self
                .shared
                .filter
                .lock()
                .map_err(|_| LobbyError::Internal("filter lock poisoned".into()))?;
            *slot = filter;
        }
        self.shared.wake.notify_one();
        Ok(())
    }

    pub fn filter(&self) -> Result<BrowseFilter> {
        self.shared.current_filter()
    }

    /// Ask for a poll now instead of at the next tick.
    pub fn refresh(&self) {
        self.shared.wake.notify_one();
    }

    /// Spawn the worker. No-op while it is already running.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| LobbyError::Internal("discovery requires a tokio runtime".into()))?;
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| LobbyError::Internal("worker lock poisoned".into()))?;
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return Ok(());
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = runtime.spawn(run(Arc::clone(&self.shared), shutdown_rx));
        *worker = Some(Worker { handle, shutdown });
        Ok(())
    }

    /// Stop the worker and wait for it to exit. No-op when not running.
    pub async fn stop(&self) -> Result<()> {
        let worker = self
            .worker
            .lock()
            .map_err(|_| LobbyError::Internal("worker lock poisoned".into()))?
            .take();
        let Some(worker) = worker else {
            return Ok(());
        };

        let _ = worker.shutdown.send(());
        match worker.handle.await {
            Err(e) if e.is_panic() => Err(LobbyError::Internal("discovery worker panicked".into())),
            _ => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        match self.worker.lock() {
            Ok(w) => w.as_ref().is_some_and(|w| !w.handle.is_finished()),
            Err(_) => false,
        }
    }

    /// Run one poll inline and return its event without sending it. Waits
    /// for a worker poll already in flight.
    pub async fn poll_once(&self) -> DiscoveryEvent {
        self.shared.poll().await
    }
}

impl Drop for DiscoveryLoop {
    fn drop(&mut self) {
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(w) = worker.take() {
                w.handle.abort();
            }
        }
    }
}

async fn run(shared: Arc<Shared>, mut shutdown: oneshot::Receiver<()>) {
    debug!(interval_ms = shared.interval.as_millis() as u64, "discovery worker started");
    let mut tick = interval_at(Instant::now() + shared.interval, shared.interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = shared.poll() => {
                if shared.events.send(event).is_err() {
                    debug!("discovery subscriber gone");
                    break;
                }
            }
        }
        tick.reset();

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tick.tick() => {}
            _ = shared.wake.notified() => {}
        }
    }

    debug!("discovery worker stopped");
}

impl Shared {
    fn current_filter(&self) -> Result<BrowseFilter> {
        self.filter
            .lock()
            .map(|f| f.clone())
            .map_err(|_| LobbyError::Internal("filter lock poisoned".into()))
    }

    async fn poll(&self) -> DiscoveryEvent {
        let _gate = self.in_flight.lock().await;
        let started = Instant::now();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let filter = match self.current_filter() {
            Ok(f) => f,
            Err(error) => return DiscoveryEvent::Failed { generation, error },
        };

        let res = with_deadline(self.timeout, self.directory.list_sessions(&filter.directory)).await;
        self.metrics.record_call("list_sessions", &res);
        let ids = match res {
            Ok(ids) => ids,
            Err(error) => {
                warn!(generation, error = %error, "lobby listing failed");
                return DiscoveryEvent::Failed { generation, error };
            }
        };

        let mut reads: FuturesUnordered<_> = ids
            .iter()
            .copied()
            .enumerate()
            .map(|(pos, id)| async move {
                (pos, id, read_lobby(self.directory.as_ref(), id, self.timeout).await)
            })
            .collect();

        let mut slots: Vec<Option<Lobby>> = vec![None; ids.len()];
        let mut soft_errors = 0;
        while let Some((pos, id, res)) = reads.next().await {
            match res {
                Ok(lobby) => {
                    if let Some(slot) = slots.get_mut(pos) {
                        *slot = Some(lobby);
                    }
                }
                Err(e) => {
                    soft_errors += 1;
                    debug!(generation, lobby = %id, error = %e, "skipping unreadable lobby");
                    self.metrics
                        .discovery_soft_errors
                        .inc(&[("reason", e.code().as_str())]);
                }
            }
        }

        let lobbies: Vec<Lobby> = slots
            .into_iter()
            .flatten()
            .filter(|l| filter.accepts(l))
            .collect();

        self.metrics
            .discovery_visible
            .set(&[], i64::try_from(lobbies.len()).unwrap_or(i64::MAX));
        self.metrics
            .discovery_poll_duration
            .observe(&[], started.elapsed());
        debug!(generation, listed = ids.len(), visible = lobbies.len(), soft_errors, "discovery poll");

        DiscoveryEvent::Snapshot(Snapshot { generation, lobbies, soft_errors })
    }
}
