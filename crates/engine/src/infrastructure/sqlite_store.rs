//! SQLite-backed room and user storage.
//!
//! A room is spread over three tables (`rooms`, `players`, `transfers`). Both
//! child tables cascade on room deletion, and `save` rewrites a room inside a
//! single transaction so readers never see a half-written room.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use eom_domain::common::{none_if_blank, parse_datetime};
use eom_domain::{
    BankAccount, Catalog, GameRules, Player, PlayerName, Room, RoomId, RoomName, RoomParts,
    Transfer, TransferId, User, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::infrastructure::ports::{RepoError, RoomRepo, UserRepo};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE COLLATE NOCASE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        catalog_json TEXT NOT NULL,
        rules_json TEXT NOT NULL,
        game_started INTEGER NOT NULL,
        current_turn INTEGER NOT NULL,
        revision INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS players (
        room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
        seat INTEGER NOT NULL,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        selected_dream TEXT,
        selected_token TEXT,
        is_ready INTEGER NOT NULL,
        is_host INTEGER NOT NULL,
        position INTEGER NOT NULL,
        balance INTEGER NOT NULL,
        total_income INTEGER NOT NULL,
        total_expenses INTEGER NOT NULL,
        monthly_income INTEGER NOT NULL,
        credit INTEGER NOT NULL,
        max_credit INTEGER NOT NULL,
        joined_at TEXT NOT NULL,
        PRIMARY KEY (room_id, seat)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transfers (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
        seq INTEGER NOT NULL,
        sender_index INTEGER NOT NULL,
        recipient_index INTEGER NOT NULL,
        amount INTEGER NOT NULL,
        description TEXT NOT NULL,
        timestamp TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_rooms_updated_at ON rooms(updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_transfers_room ON transfers(room_id, seq)",
];

/// SQLite implementation of [`RoomRepo`] and [`UserRepo`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path` and ensure the schema.
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        if let Some(parent) = std::path::Path::new(db_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::database("sqlite_open", e))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))
            .map_err(|e| RepoError::database("sqlite_open", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("sqlite_open", e))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| RepoError::database("sqlite_schema", e))?;
        }

        tracing::info!(path = %db_path, "SQLite store ready");
        Ok(Self { pool })
    }

    /// Assemble a room from its row plus child rows read on `conn`. Callers
    /// pass an open transaction so all three tables come from one snapshot.
    async fn load_room(conn: &mut SqliteConnection, row: SqliteRow) -> Result<Room, RepoError> {
        let id_text: String = row.get("id");
        let id = RoomId::from_str(&id_text).map_err(RepoError::serialization)?;

        let player_rows = sqlx::query("SELECT * FROM players WHERE room_id = ? ORDER BY seat")
            .bind(&id_text)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| RepoError::database("room_players", e))?;
        let players = player_rows
            .iter()
            .map(player_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let transfer_rows =
            sqlx::query("SELECT * FROM transfers WHERE room_id = ? ORDER BY seq")
                .bind(&id_text)
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| RepoError::database("room_transfers", e))?;
        let transfers = transfer_rows
            .iter()
            .map(transfer_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let catalog: Catalog = serde_json::from_str(row.get::<&str, _>("catalog_json"))
            .map_err(RepoError::serialization)?;
        let rules: GameRules = serde_json::from_str(row.get::<&str, _>("rules_json"))
            .map_err(RepoError::serialization)?;

        Ok(Room::from_parts(RoomParts {
            id,
            name: RoomName::new(row.get::<String, _>("name")).map_err(RepoError::serialization)?,
            players,
            catalog,
            rules,
            game_started: row.get("game_started"),
            current_turn: to_usize(row.get("current_turn"))?,
            transfers,
            revision: u64::try_from(row.get::<i64, _>("revision"))
                .map_err(RepoError::serialization)?,
            created_at: timestamp(&row, "created_at")?,
            updated_at: timestamp(&row, "updated_at")?,
        }))
    }
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepoError> {
    parse_datetime(row.get::<&str, _>(column)).map_err(RepoError::serialization)
}

/// Fixed-width UTC text, so `updated_at < ?` compares chronologically.
fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn to_usize(value: i64) -> Result<usize, RepoError> {
    usize::try_from(value).map_err(RepoError::serialization)
}

fn to_i64(value: usize) -> Result<i64, RepoError> {
    i64::try_from(value).map_err(RepoError::serialization)
}

fn player_from_row(row: &SqliteRow) -> Result<Player, RepoError> {
    Ok(Player {
        user_id: UserId::new(row.get::<String, _>("user_id")).map_err(RepoError::serialization)?,
        name: PlayerName::new(row.get::<String, _>("name")).map_err(RepoError::serialization)?,
        selected_dream: none_if_blank(row.get("selected_dream")),
        selected_token: none_if_blank(row.get("selected_token")),
        is_ready: row.get("is_ready"),
        is_host: row.get("is_host"),
        position: to_usize(row.get("position"))?,
        bank: BankAccount {
            balance: row.get("balance"),
            total_income: row.get("total_income"),
            total_expenses: row.get("total_expenses"),
            monthly_income: row.get("monthly_income"),
            credit: row.get("credit"),
            max_credit: row.get("max_credit"),
        },
        joined_at: timestamp(row, "joined_at")?,
    })
}

fn transfer_from_row(row: &SqliteRow) -> Result<Transfer, RepoError> {
    Ok(Transfer {
        id: TransferId::from_str(row.get::<&str, _>("id")).map_err(RepoError::serialization)?,
        sender_index: to_usize(row.get("sender_index"))?,
        recipient_index: to_usize(row.get("recipient_index"))?,
        amount: row.get("amount"),
        description: row.get("description"),
        timestamp: timestamp(row, "timestamp")?,
    })
}

#[async_trait]
impl RoomRepo for SqliteStore {
    async fn get(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("room_get", e))?;

        let row = sqlx::query("SELECT * FROM rooms WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepoError::database("room_get", e))?;

        let room = match row {
            Some(row) => Some(Self::load_room(&mut tx, row).await?),
            None => None,
        };
        tx.commit()
            .await
            .map_err(|e| RepoError::database("room_get", e))?;
        Ok(room)
    }

    async fn list(&self) -> Result<Vec<Room>, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("room_list", e))?;

        let rows = sqlx::query("SELECT * FROM rooms ORDER BY created_at")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| RepoError::database("room_list", e))?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in rows {
            rooms.push(Self::load_room(&mut tx, row).await?);
        }
        tx.commit()
            .await
            .map_err(|e| RepoError::database("room_list", e))?;
        Ok(rooms)
    }

    async fn save(&self, room: &Room) -> Result<(), RepoError> {
        let room_id = room.id().to_string();
        let catalog = serde_json::to_string(room.catalog()).map_err(RepoError::serialization)?;
        let rules = serde_json::to_string(room.rules()).map_err(RepoError::serialization)?;
        let revision = i64::try_from(room.revision()).map_err(RepoError::serialization)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("room_save", e))?;

        sqlx::query(
            r#"
            INSERT INTO rooms (id, name, catalog_json, rules_json, game_started,
                               current_turn, revision, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                catalog_json = excluded.catalog_json,
                rules_json = excluded.rules_json,
                game_started = excluded.game_started,
                current_turn = excluded.current_turn,
                revision = excluded.revision,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&room_id)
        .bind(room.name().as_str())
        .bind(catalog)
        .bind(rules)
        .bind(room.game_started())
        .bind(to_i64(room.current_turn())?)
        .bind(revision)
        .bind(ts(room.created_at()))
        .bind(ts(room.updated_at()))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("room_save", e))?;

        // Seats shift when someone leaves, so players are rewritten wholesale.
        sqlx::query("DELETE FROM players WHERE room_id = ?")
            .bind(&room_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("room_save_players", e))?;

        for (seat, player) in room.players().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO players (room_id, seat, user_id, name, selected_dream, selected_token,
                                     is_ready, is_host, position, balance, total_income,
                                     total_expenses, monthly_income, credit, max_credit, joined_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&room_id)
            .bind(to_i64(seat)?)
            .bind(player.user_id.as_str())
            .bind(player.name.as_str())
            .bind(player.selected_dream.as_deref())
            .bind(player.selected_token.as_deref())
            .bind(player.is_ready)
            .bind(player.is_host)
            .bind(to_i64(player.position)?)
            .bind(player.bank.balance)
            .bind(player.bank.total_income)
            .bind(player.bank.total_expenses)
            .bind(player.bank.monthly_income)
            .bind(player.bank.credit)
            .bind(player.bank.max_credit)
            .bind(ts(player.joined_at))
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("room_save_players", e))?;
        }

        // The transfer log is append-only; existing rows are left alone.
        for (seq, transfer) in room.transfers().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO transfers (id, room_id, seq, sender_index, recipient_index,
                                                 amount, description, timestamp)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(transfer.id.to_string())
            .bind(&room_id)
            .bind(to_i64(seq)?)
            .bind(to_i64(transfer.sender_index)?)
            .bind(to_i64(transfer.recipient_index)?)
            .bind(transfer.amount)
            .bind(&transfer.description)
            .bind(ts(transfer.timestamp))
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("room_save_transfers", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("room_save", e))?;
        Ok(())
    }

    async fn delete(&self, id: RoomId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("room_delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RoomId>, RepoError> {
        let rows = sqlx::query("SELECT id FROM rooms WHERE updated_at < ?")
            .bind(ts(cutoff))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("room_list_idle", e))?;

        rows.iter()
            .map(|row| RoomId::from_str(row.get::<&str, _>("id")).map_err(RepoError::serialization))
            .collect()
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn get(&self, id: &UserId) -> Result<Option<User>, RepoError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("user_get", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("user_get_by_username", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn save(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET username = excluded.username
            "#,
        )
        .bind(user.id.as_str())
        .bind(user.username.as_str())
        .bind(ts(user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::constraint(format!("username {} is already registered", user.username))
            }
            other => RepoError::database("user_save", other),
        })?;
        Ok(())
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, RepoError> {
    Ok(User {
        id: UserId::new(row.get::<String, _>("id")).map_err(RepoError::serialization)?,
        username: PlayerName::new(row.get::<String, _>("username"))
            .map_err(RepoError::serialization)?,
        created_at: timestamp(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    async fn store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("eom.db");
        let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn new_room(now: DateTime<Utc>) -> Room {
        Room::new(
            RoomName::new("Table 1").unwrap(),
            uid("host"),
            PlayerName::new("Hana").unwrap(),
            Catalog::default(),
            GameRules::default(),
            now,
        )
    }

    fn started_room() -> Room {
        let mut room = new_room(t0());
        room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
            .unwrap();
        for (id, token) in [("host", "lion"), ("guest", "owl")] {
            room.select_dream(&uid(id), "travel", t0()).unwrap();
            room.select_token(&uid(id), token, t0()).unwrap();
            room.set_ready(&uid(id), true, t0()).unwrap();
        }
        room.start(&uid("host"), t0()).unwrap();
        room
    }

    #[tokio::test]
    async fn room_round_trips_with_players_and_transfers() {
        let (_dir, store) = store().await;
        let mut room = started_room();
        room.transfer(0, 1, 250, "rent", t0()).unwrap();
        room.take_credit(&uid("guest"), 1000, t0()).unwrap();

        RoomRepo::save(&store, &room).await.unwrap();
        let loaded = RoomRepo::get(&store, room.id()).await.unwrap().unwrap();

        assert_eq!(loaded, room);
    }

    #[tokio::test]
    async fn resave_replaces_players_and_appends_transfers() {
        let (_dir, store) = store().await;
        let mut room = started_room();
        RoomRepo::save(&store, &room).await.unwrap();

        room.transfer(1, 0, 100, "first", t0()).unwrap();
        RoomRepo::save(&store, &room).await.unwrap();
        room.transfer(1, 0, 100, "second", t0()).unwrap();
        RoomRepo::save(&store, &room).await.unwrap();

        let loaded = RoomRepo::get(&store, room.id()).await.unwrap().unwrap();
        assert_eq!(loaded.transfers().len(), 2);
        assert_eq!(loaded.transfers()[1].description, "second");
        assert_eq!(loaded.players()[1].cash(), 2800);
        assert_eq!(loaded.revision(), room.revision());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reads_racing_saves_see_whole_revisions() {
        let (_dir, store) = store().await;
        let store = std::sync::Arc::new(store);
        let mut room = started_room();
        RoomRepo::save(store.as_ref(), &room).await.unwrap();
        let base = room.revision();
        let id = room.id();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..40 {
                    room.transfer(1, 0, 10, "tick", t0()).unwrap();
                    RoomRepo::save(store.as_ref(), &room).await.unwrap();
                }
            })
        };

        while !writer.is_finished() {
            let loaded = RoomRepo::get(store.as_ref(), id).await.unwrap().unwrap();
            let moves = loaded.transfers().len() as i64;
            assert_eq!(loaded.revision(), base + moves as u64);
            assert_eq!(loaded.players()[0].cash(), 3000 + 10 * moves);
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn leaving_player_is_removed_on_save() {
        let (_dir, store) = store().await;
        let mut room = new_room(t0());
        room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
            .unwrap();
        RoomRepo::save(&store, &room).await.unwrap();

        room.leave(&uid("host"), t0()).unwrap();
        RoomRepo::save(&store, &room).await.unwrap();

        let loaded = RoomRepo::get(&store, room.id()).await.unwrap().unwrap();
        assert_eq!(loaded.players_count(), 1);
        assert!(loaded.players()[0].is_host);
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let (_dir, store) = store().await;
        let mut room = started_room();
        room.transfer(0, 1, 10, "", t0()).unwrap();
        RoomRepo::save(&store, &room).await.unwrap();

        assert!(store.delete(room.id()).await.unwrap());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let orphan_transfers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfers")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
        assert_eq!(orphan_transfers, 0);
        assert!(RoomRepo::get(&store, room.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn idle_rooms_are_found_by_cutoff() {
        let (_dir, store) = store().await;
        let old = new_room(t0());
        let fresh = new_room(t0() + Duration::hours(3));
        RoomRepo::save(&store, &old).await.unwrap();
        RoomRepo::save(&store, &fresh).await.unwrap();

        let idle = store
            .list_idle_since(t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(idle, vec![old.id()]);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn users_are_unique_by_username() {
        let (_dir, store) = store().await;
        let alice = User::new(uid("u1"), PlayerName::new("Alice").unwrap(), t0());
        UserRepo::save(&store, &alice).await.unwrap();

        let found = store.get_by_username("alice").await.unwrap();
        assert_eq!(found, Some(alice));

        let dup = User::new(uid("u2"), PlayerName::new("ALICE").unwrap(), t0());
        let err = UserRepo::save(&store, &dup).await.unwrap_err();
        assert!(matches!(err, RepoError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eom.db");
        let path = path.to_str().unwrap();

        let first = SqliteStore::new(path).await.unwrap();
        RoomRepo::save(&first, &new_room(t0())).await.unwrap();
        drop(first);

        let second = SqliteStore::new(path).await.unwrap();
        assert_eq!(second.list().await.unwrap().len(), 1);
    }
}
