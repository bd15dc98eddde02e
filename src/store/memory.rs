// In-memory player map, the default store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

use super::{seed_players, StoreError};
use crate::schema::{NewPlayer, Player, PlayerPatch};

struct Entry {
    /// Insertion sequence, used to keep ties in insertion order.
    seq: u64,
    player: Player,
}

#[derive(Default)]
struct Inner {
    players: HashMap<Uuid, Entry>,
    next_seq: u64,
}

impl Inner {
    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.players
            .values()
            .any(|e| Some(e.player.id) != except && e.player.has_name(name))
    }
}

/// Process-lifetime player storage guarded by a single lock. Every operation
/// is one critical section.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the five default players.
    pub fn seeded() -> Self {
        let store = Self::new();
        for new in seed_players() {
            let name = new.name.clone();
            if let Err(e) = store.create(new) {
                tracing::warn!(name = %name, "Skipping seed player: {e}");
            }
        }
        store
    }

    pub fn list(&self) -> Vec<Player> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<&Entry> = inner.players.values().collect();
        entries.sort_by(|a, b| b.player.points.cmp(&a.player.points).then(a.seq.cmp(&b.seq)));
        entries.into_iter().map(|e| e.player.clone()).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<Player> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.players.get(&id).map(|e| e.player.clone())
    }

    pub fn get_by_name(&self, name: &str) -> Option<Player> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .players
            .values()
            .find(|e| e.player.has_name(name))
            .map(|e| e.player.clone())
    }

    pub fn create(&self, new: NewPlayer) -> Result<Player, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.name_taken(&new.name, None) {
            return Err(StoreError::NameTaken);
        }
        let mut id = Uuid::new_v4();
        while inner.players.contains_key(&id) {
            id = Uuid::new_v4();
        }
        let player = new.into_player(id);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.players.insert(
            id,
            Entry {
                seq,
                player: player.clone(),
            },
        );
        Ok(player)
    }

    pub fn update(&self, id: Uuid, patch: PlayerPatch) -> Result<Option<Player>, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.players.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &patch.name {
            if inner.name_taken(name, Some(id)) {
                return Err(StoreError::NameTaken);
            }
        }
        let Some(entry) = inner.players.get_mut(&id) else {
            return Ok(None);
        };
        entry.player.apply(patch);
        Ok(Some(entry.player.clone()))
    }

    pub fn delete(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.players.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.players.len()
    }
}
