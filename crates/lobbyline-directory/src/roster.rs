use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use lobbyline_core::error::{LobbyError, Result};
use lobbyline_core::player::validate_display_name;
use lobbyline_core::{Player, PlayerId};

#[derive(Default)]
struct Slots {
    by_index: BTreeMap<u8, Player>,
    by_identity: HashMap<PlayerId, u8>,
}

impl Slots {
    fn lowest_free(&self) -> Option<u8> {
        (0..=u8::MAX).find(|i| !self.by_index.contains_key(i))
    }
}

/// Session participants: `local_index -> Player`, `identity -> local_index`.
///
/// Removal leaves a gap: indices stay stable while a player is present, and
/// the next add takes the lowest free index. Both maps change under one lock
/// so index assignment never races.
pub struct RosterManager {
    max: usize,
    slots: Mutex<Slots>,
}

impl RosterManager {
    pub fn new(max_players: u16) -> Self {
        Self {
            max: usize::from(max_players).min(usize::from(u8::MAX) + 1),
            slots: Mutex::new(Slots::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|_| LobbyError::Internal("roster lock poisoned".into()))
    }

    /// Add a player and return its local index.
    ///
    /// An identity already present keeps its index and display name.
    pub fn add_player(&self, identity: PlayerId, display_name: &str) -> Result<u8> {
        validate_display_name(display_name)?;

        let mut slots = self.lock()?;
        if let Some(&idx) = slots.by_identity.get(&identity) {
            return Ok(idx);
        }
        if slots.by_index.len() >= self.max {
            return Err(LobbyError::RosterFull { max: self.max });
        }
        let idx = slots
            .lowest_free()
            .ok_or(LobbyError::RosterFull { max: self.max })?;

        slots.by_index.insert(
            idx,
            Player {
                identity,
                local_index: idx,
                display_name: display_name.to_string(),
            },
        );
        slots.by_identity.insert(identity, idx);
        Ok(idx)
    }

    /// Remove a player. Returns the removed entry, `None` if absent.
    pub fn remove_player(&self, identity: PlayerId) -> Result<Option<Player>> {
        let mut slots = self.lock()?;
        let Some(idx) = slots.by_identity.remove(&identity) else {
            return Ok(None);
        };
        Ok(slots.by_index.remove(&idx))
    }

    pub fn get(&self, identity: PlayerId) -> Result<Option<Player>> {
        let slots = self.lock()?;
        Ok(slots
            .by_identity
            .get(&identity)
            .and_then(|idx| slots.by_index.get(idx))
            .cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.by_index.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Players ordered by local index.
    pub fn players(&self) -> Result<Vec<Player>> {
        Ok(self.lock()?.by_index.values().cloned().collect())
    }
}
