// Persistent player storage (SQLite via sqlx).

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use super::StoreError;
use crate::schema::{name_key, NewPlayer, Player, PlayerPatch, Region, Tiers};

const PLAYER_COLUMNS: &str = "id, name, points, region, title, title_icon, tiers";

#[derive(Debug, sqlx::FromRow)]
struct PlayerRow {
    id: String,
    name: String,
    points: i64,
    region: String,
    title: String,
    title_icon: String,
    tiers: String,
}

impl TryFrom<PlayerRow> for Player {
    type Error = StoreError;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };
        let id = Uuid::parse_str(&row.id).map_err(|e| corrupt(e.to_string()))?;
        let points = u32::try_from(row.points).map_err(|e| corrupt(e.to_string()))?;
        let region = row
            .region
            .parse::<Region>()
            .map_err(|e| corrupt(e.to_string()))?;
        let tiers: Tiers = serde_json::from_str(&row.tiers).map_err(|e| corrupt(e.to_string()))?;
        Ok(Player {
            id,
            name: row.name,
            points,
            region,
            title: row.title,
            title_icon: row.title_icon,
            tiers,
        })
    }
}

fn encode_tiers(tiers: &Tiers) -> Result<String, StoreError> {
    serde_json::to_string(tiers).map_err(|e| StoreError::Corrupt {
        id: String::new(),
        reason: e.to_string(),
    })
}

/// Unique-index violations on `name_key` surface as `NameTaken`.
fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::NameTaken,
        _ => StoreError::Database(e),
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        // Each connection to an in-memory database sees its own database, so
        // keep exactly one alive for the life of the pool.
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(database_url).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL,
                points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
                region TEXT NOT NULL,
                title TEXT NOT NULL,
                title_icon TEXT NOT NULL,
                tiers TEXT NOT NULL DEFAULT '{}'
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_players_name_key ON players(name_key)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn seed_if_empty(&self, seeds: Vec<NewPlayer>) -> Result<(), StoreError> {
        if self.len().await? > 0 {
            return Ok(());
        }
        for new in seeds {
            self.create(new).await?;
        }
        tracing::info!("Seeded players table with default players");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Player>, StoreError> {
        let rows = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY points DESC, seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Player::try_from).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Player>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Player::try_from).transpose()
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Player>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE name_key = ?"
        ))
        .bind(name_key(name))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Player::try_from).transpose()
    }

    pub async fn create(&self, new: NewPlayer) -> Result<Player, StoreError> {
        let player = new.into_player(Uuid::new_v4());
        let tiers = encode_tiers(&player.tiers)?;
        sqlx::query(
            "INSERT INTO players (id, name, name_key, points, region, title, title_icon, tiers) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(player.id.to_string())
        .bind(&player.name)
        .bind(name_key(&player.name))
        .bind(i64::from(player.points))
        .bind(player.region.as_str())
        .bind(&player.title)
        .bind(&player.title_icon)
        .bind(tiers)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(player)
    }

    pub async fn update(&self, id: Uuid, patch: PlayerPatch) -> Result<Option<Player>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut player = Player::try_from(row)?;
        player.apply(patch);
        let tiers = encode_tiers(&player.tiers)?;

        sqlx::query(
            "UPDATE players SET name = ?, name_key = ?, points = ?, region = ?, title = ?, title_icon = ?, tiers = ? WHERE id = ?",
        )
        .bind(&player.name)
        .bind(name_key(&player.name))
        .bind(i64::from(player.points))
        .bind(player.region.as_str())
        .bind(&player.title)
        .bind(&player.title_icon)
        .bind(tiers)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(Some(player))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM players WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
