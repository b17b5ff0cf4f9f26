//! In-process directory backend.
//!
//! Used by the demo binary and as the fake backend in tests: it counts every
//! call, records the filters it was asked to list with, and can be told to
//! fail writes for specific keys or to behave as if the backend were down.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::{LobbyFilter, LobbyId};

use super::DirectoryClient;

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct DirectoryStats {
    creates: AtomicU64,
    set_fields: AtomicU64,
    get_fields: AtomicU64,
    lists: AtomicU64,
    enters: AtomicU64,
    leaves: AtomicU64,
}

impl DirectoryStats {
    pub fn create_calls(&self) -> u64 {
        self.creates.load(Ordering::Relaxed)
    }
    pub fn set_field_calls(&self) -> u64 {
        self.set_fields.load(Ordering::Relaxed)
    }
    pub fn get_field_calls(&self) -> u64 {
        self.get_fields.load(Ordering::Relaxed)
    }
    pub fn list_calls(&self) -> u64 {
        self.lists.load(Ordering::Relaxed)
    }
    pub fn enter_calls(&self) -> u64 {
        self.enters.load(Ordering::Relaxed)
    }
    pub fn leave_calls(&self) -> u64 {
        self.leaves.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct SessionEntry {
    fields: BTreeMap<String, String>,
    max_players: u16,
    members: u32,
}

pub struct InMemoryDirectory {
    sessions: DashMap<LobbyId, SessionEntry>,
    next_id: AtomicU64,
    stats: DirectoryStats,
    available: AtomicBool,
    failing_keys: DashSet<String>,
    filter_log: Mutex<Vec<LobbyFilter>>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            stats: DirectoryStats::default(),
            available: AtomicBool::new(true),
            failing_keys: DashSet::new(),
            filter_log: Mutex::new(Vec::new()),
        }
    }

    /// A backend that failed to initialise: every call is `DirectoryUnavailable`.
    pub fn unavailable() -> Self {
        let this = Self::new();
        this.available.store(false, Ordering::Relaxed);
        this
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Make every `set_field` for `key` fail until cleared.
    pub fn fail_writes_for(&self, key: &str) {
        self.failing_keys.insert(key.to_string());
    }

    pub fn clear_write_failures(&self) {
        self.failing_keys.clear();
    }

    pub fn stats(&self) -> &DirectoryStats {
        &self.stats
    }

    /// Seed a session as another host would have published it.
    pub fn insert_raw<'a, I>(&self, pairs: I) -> LobbyId
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let id = self.allocate_id();
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.sessions.insert(
            id,
            SessionEntry { fields, max_players: 0, members: 0 },
        );
        id
    }

    /// Drop a session, as the backend does when its host disconnects.
    pub fn remove_session(&self, id: LobbyId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn raw_fields(&self, id: LobbyId) -> Option<BTreeMap<String, String>> {
        self.sessions.get(&id).map(|e| e.value().fields.clone())
    }

    pub fn member_count(&self, id: LobbyId) -> Option<u32> {
        self.sessions.get(&id).map(|e| e.value().members)
    }

    pub fn max_players(&self, id: LobbyId) -> Option<u16> {
        self.sessions.get(&id).map(|e| e.value().max_players)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Filters passed to `list_sessions`, oldest first.
    pub fn filter_log(&self) -> Vec<LobbyFilter> {
        match self.filter_log.lock() {
            Ok(g) => g.clone(),
            Err(_) => Vec::new(),
        }
    }

    fn allocate_id(&self) -> LobbyId {
        LobbyId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(LobbyError::DirectoryUnavailable("backend not initialised".into()))
        }
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn create_session(&self, max_players: u16) -> Result<LobbyId> {
        DirectoryStats::bump(&self.stats.creates);
        self.ensure_available()?;
        let id = self.allocate_id();
        self.sessions.insert(
            id,
            SessionEntry { fields: BTreeMap::new(), max_players, members: 1 },
        );
        Ok(id)
    }

    async fn set_field(&self, id: LobbyId, key: &str, value: &str) -> Result<()> {
        DirectoryStats::bump(&self.stats.set_fields);
        self.ensure_available()?;
        if self.failing_keys.contains(key) {
            return Err(LobbyError::DirectoryUnavailable(format!("write rejected for {key}")));
        }
        let mut entry = self.sessions.get_mut(&id).ok_or(LobbyError::NotFound(id))?;
        entry.fields.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_field(&self, id: LobbyId, key: &str) -> Result<Option<String>> {
        DirectoryStats::bump(&self.stats.get_fields);
        self.ensure_available()?;
        let entry = self.sessions.get(&id).ok_or(LobbyError::NotFound(id))?;
        Ok(entry.fields.get(key).cloned())
    }

    async fn list_sessions(&self, filter: &LobbyFilter) -> Result<Vec<LobbyId>> {
        DirectoryStats::bump(&self.stats.lists);
        self.ensure_available()?;
        if let Ok(mut log) = self.filter_log.lock() {
            log.push(filter.clone());
        }

        let mut ids: Vec<LobbyId> = self
            .sessions
            .iter()
            .filter(|e| {
                let fields = &e.value().fields;
                filter.matches(|k| fields.get(k).map(String::as_str))
            })
            .map(|e| *e.key())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn enter_session(&self, id: LobbyId) -> Result<()> {
        DirectoryStats::bump(&self.stats.enters);
        self.ensure_available()?;
        let mut entry = self.sessions.get_mut(&id).ok_or(LobbyError::NotFound(id))?;
        entry.members += 1;
        Ok(())
    }

    async fn leave_session(&self, id: LobbyId) -> Result<()> {
        DirectoryStats::bump(&self.stats.leaves);
        self.ensure_available()?;
        let mut entry = self.sessions.get_mut(&id).ok_or(LobbyError::NotFound(id))?;
        entry.members = entry.members.saturating_sub(1);
        Ok(())
    }
}
