// Player storage: the in-memory map (default) and an optional SQLite table
// behind the same list/get/create/update/delete contract.

pub mod memory;
pub mod sqlite;

use uuid::Uuid;

use crate::schema::{Category, NewPlayer, Player, PlayerPatch, Region, TierRank, Tiers, Title};

pub use memory::MemStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("player name already exists")]
    NameTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt player row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// The configured storage backend.
pub enum PlayerStore {
    Memory(MemStore),
    Sqlite(SqliteStore),
}

impl PlayerStore {
    /// Build the store named by `database_url`, or an in-memory one when unset.
    pub async fn open(database_url: Option<&str>, seed: bool) -> Result<Self, StoreError> {
        match database_url {
            Some(url) => {
                let store = SqliteStore::new(url).await?;
                if seed {
                    store.seed_if_empty(seed_players()).await?;
                }
                Ok(PlayerStore::Sqlite(store))
            }
            None if seed => Ok(PlayerStore::Memory(MemStore::seeded())),
            None => Ok(PlayerStore::Memory(MemStore::new())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            PlayerStore::Memory(_) => "memory",
            PlayerStore::Sqlite(_) => "sqlite",
        }
    }

    /// All players, points descending; ties keep insertion order.
    pub async fn list(&self) -> Result<Vec<Player>, StoreError> {
        match self {
            PlayerStore::Memory(m) => Ok(m.list()),
            PlayerStore::Sqlite(s) => s.list().await,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Player>, StoreError> {
        match self {
            PlayerStore::Memory(m) => Ok(m.get(id)),
            PlayerStore::Sqlite(s) => s.get(id).await,
        }
    }

    /// Case-insensitive exact name match. A lookup for library callers; the
    /// HTTP routes rely on `create` and `update` to reject taken names.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Player>, StoreError> {
        match self {
            PlayerStore::Memory(m) => Ok(m.get_by_name(name)),
            PlayerStore::Sqlite(s) => s.get_by_name(name).await,
        }
    }

    /// Insert under a fresh id. Fails with `NameTaken` if the name is in use.
    pub async fn create(&self, new: NewPlayer) -> Result<Player, StoreError> {
        match self {
            PlayerStore::Memory(m) => m.create(new),
            PlayerStore::Sqlite(s) => s.create(new).await,
        }
    }

    /// Merge `patch` into the player. `Ok(None)` if the id is unknown.
    pub async fn update(&self, id: Uuid, patch: PlayerPatch) -> Result<Option<Player>, StoreError> {
        match self {
            PlayerStore::Memory(m) => m.update(id, patch),
            PlayerStore::Sqlite(s) => s.update(id, patch).await,
        }
    }

    /// Returns whether a record was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        match self {
            PlayerStore::Memory(m) => Ok(m.delete(id)),
            PlayerStore::Sqlite(s) => s.delete(id).await,
        }
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        match self {
            PlayerStore::Memory(m) => Ok(m.len()),
            PlayerStore::Sqlite(s) => s.len().await,
        }
    }
}

fn seed(
    name: &str,
    points: u32,
    region: Region,
    title: Title,
    tiers: &[(Category, TierRank)],
) -> NewPlayer {
    NewPlayer {
        name: name.to_string(),
        points,
        region,
        title: title.label().to_string(),
        title_icon: title.icon().to_string(),
        tiers: tiers.iter().copied().collect::<Tiers>(),
    }
}

/// The five players every fresh store starts with.
pub fn seed_players() -> Vec<NewPlayer> {
    use Category::*;
    use TierRank::*;

    vec![
        seed(
            "Marlowww",
            405,
            Region::NA,
            Title::Grandmaster,
            &[
                (Vanilla, Ht1),
                (Smp, Ht1),
                (Mace, Ht1),
                (Pot, Lt1),
                (Axe, Lt1),
                (Uhc, Lt1),
                (Sword, Lt1),
                (Nethop, Lt1),
            ],
        ),
        seed(
            "ItzRealMe",
            330,
            Region::NA,
            Title::Master,
            &[
                (Pot, Ht1),
                (Vanilla, Ht1),
                (Nethop, Ht1),
                (Smp, Ht1),
                (Sword, Ht2),
                (Axe, Lt2),
                (Uhc, Lt2),
                (Mace, Lt2),
            ],
        ),
        seed(
            "Swight",
            260,
            Region::NA,
            Title::Master,
            &[
                (Uhc, Ht1),
                (Axe, Lt1),
                (Vanilla, Lt2),
                (Mace, Lt2),
                (Nethop, Ht3),
                (Pot, Ht3),
                (Smp, Ht1),
                (Sword, Lt2),
            ],
        ),
        seed(
            "coldified",
            226,
            Region::EU,
            Title::Ace,
            &[
                (Axe, Ht2),
                (Mace, Lt2),
                (Sword, Lt2),
                (Pot, Lt2),
                (Nethop, Ht3),
                (Vanilla, Lt3),
                (Smp, Ht1),
                (Uhc, Ht1),
            ],
        ),
        seed(
            "Kylaz",
            222,
            Region::NA,
            Title::Ace,
            &[
                (Sword, Ht1),
                (Pot, Ht1),
                (Uhc, Lt3),
                (Vanilla, Lt3),
                (Smp, Lt3),
                (Nethop, Ht1),
                (Axe, Lt2),
            ],
        ),
    ]
}
