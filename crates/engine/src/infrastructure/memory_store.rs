//! In-memory room and user store with optional JSON file persistence.
//!
//! Without a path this is a plain process-local map. With a path the whole
//! store is loaded at startup and rewritten after every write, which is enough
//! for a single engine process and a handful of rooms.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eom_domain::{Room, RoomId, User, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::infrastructure::ports::{RepoError, RoomRepo, UserRepo};

/// On-disk layout of the JSON file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    rooms: Vec<Room>,
    #[serde(default)]
    users: Vec<User>,
}

pub struct MemoryStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
    users: RwLock<HashMap<UserId, User>>,
    path: Option<PathBuf>,
    /// Held for every write so file rewrites land in commit order.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    /// Process-local store; everything is lost on exit.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by a JSON file. A missing file starts an empty store.
    pub async fn with_file(path: impl Into<PathBuf>) -> Result<Self, RepoError> {
        let path = path.into();
        let file = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => StoreFile::default(),
            Ok(raw) => serde_json::from_str(&raw).map_err(RepoError::serialization)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(RepoError::database("memory_store_load", e)),
        };

        tracing::info!(
            path = %path.display(),
            rooms = file.rooms.len(),
            users = file.users.len(),
            "Loaded memory store from file"
        );

        Ok(Self {
            rooms: RwLock::new(file.rooms.into_iter().map(|r| (r.id(), r)).collect()),
            users: RwLock::new(file.users.into_iter().map(|u| (u.id.clone(), u)).collect()),
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply `change` to a copy of the rooms, write the file, then publish
    /// the copy. A failed change or write leaves the store as it was.
    async fn commit_rooms<T>(
        &self,
        change: impl FnOnce(&mut HashMap<RoomId, Room>) -> Result<T, RepoError>,
    ) -> Result<T, RepoError> {
        let _write = self.write_lock.lock().await;
        let mut rooms = self.rooms.read().await.clone();
        let out = change(&mut rooms)?;
        let users = self.users.read().await.clone();
        self.persist(&rooms, &users).await?;
        *self.rooms.write().await = rooms;
        Ok(out)
    }

    async fn commit_users<T>(
        &self,
        change: impl FnOnce(&mut HashMap<UserId, User>) -> Result<T, RepoError>,
    ) -> Result<T, RepoError> {
        let _write = self.write_lock.lock().await;
        let mut users = self.users.read().await.clone();
        let out = change(&mut users)?;
        let rooms = self.rooms.read().await.clone();
        self.persist(&rooms, &users).await?;
        *self.users.write().await = users;
        Ok(out)
    }

    async fn persist(
        &self,
        rooms: &HashMap<RoomId, Room>,
        users: &HashMap<UserId, User>,
    ) -> Result<(), RepoError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = StoreFile {
            rooms: rooms.values().cloned().collect(),
            users: users.values().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(RepoError::serialization)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::database("memory_store_persist", e))?;
        }

        // Write then rename so a crash never leaves a half-written file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RepoError::database("memory_store_persist", e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| RepoError::database("memory_store_persist", e))?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepo for MemoryStore {
    async fn get(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Room>, RepoError> {
        let mut rooms: Vec<Room> = self.rooms.read().await.values().cloned().collect();
        rooms.sort_by_key(|r| r.created_at());
        Ok(rooms)
    }

    async fn save(&self, room: &Room) -> Result<(), RepoError> {
        self.commit_rooms(|rooms| {
            rooms.insert(room.id(), room.clone());
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: RoomId) -> Result<bool, RepoError> {
        if !self.rooms.read().await.contains_key(&id) {
            return Ok(false);
        }
        self.commit_rooms(|rooms| Ok(rooms.remove(&id).is_some()))
            .await
    }

    async fn list_idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RoomId>, RepoError> {
        Ok(self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| r.is_idle_since(cutoff))
            .map(|r| r.id())
            .collect())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn get(&self, id: &UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username.matches(username))
            .cloned())
    }

    async fn save(&self, user: &User) -> Result<(), RepoError> {
        self.commit_users(|users| {
            let taken = users
                .values()
                .any(|u| u.id != user.id && u.username.matches(user.username.as_str()));
            if taken {
                return Err(RepoError::constraint(format!(
                    "username {} is already registered",
                    user.username
                )));
            }
            users.insert(user.id.clone(), user.clone());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use eom_domain::{Catalog, GameRules, PlayerName, RoomName};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
    }

    fn room(name: &str, now: DateTime<Utc>) -> Room {
        Room::new(
            RoomName::new(name).unwrap(),
            UserId::new("host").unwrap(),
            PlayerName::new("Host").unwrap(),
            Catalog::default(),
            GameRules::default(),
            now,
        )
    }

    fn user(id: &str, name: &str) -> User {
        User::new(UserId::new(id).unwrap(), PlayerName::new(name).unwrap(), t0())
    }

    #[tokio::test]
    async fn save_then_get_returns_same_room() {
        let store = MemoryStore::new();
        let room = room("A", t0());
        RoomRepo::save(&store, &room).await.unwrap();

        let loaded = RoomRepo::get(&store, room.id()).await.unwrap();
        assert_eq!(loaded, Some(room));
    }

    #[tokio::test]
    async fn delete_reports_whether_room_existed() {
        let store = MemoryStore::new();
        let room = room("A", t0());
        RoomRepo::save(&store, &room).await.unwrap();

        assert!(store.delete(room.id()).await.unwrap());
        assert!(!store.delete(room.id()).await.unwrap());
    }

    #[tokio::test]
    async fn idle_rooms_are_listed_by_updated_at() {
        let store = MemoryStore::new();
        let old = room("old", t0());
        let fresh = room("fresh", t0() + Duration::hours(2));
        RoomRepo::save(&store, &old).await.unwrap();
        RoomRepo::save(&store, &fresh).await.unwrap();

        let idle = store
            .list_idle_since(t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(idle, vec![old.id()]);
    }

    #[tokio::test]
    async fn username_lookup_ignores_case() {
        let store = MemoryStore::new();
        UserRepo::save(&store, &user("u1", "Alice")).await.unwrap();

        let found = store.get_by_username("ALICE").await.unwrap();
        assert_eq!(found.map(|u| u.id.to_string()), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = MemoryStore::new();
        UserRepo::save(&store, &user("u1", "Alice")).await.unwrap();
        let err = UserRepo::save(&store, &user("u2", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn file_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let room = room("persisted", t0());
        {
            let store = MemoryStore::with_file(&path).await.unwrap();
            RoomRepo::save(&store, &room).await.unwrap();
            UserRepo::save(&store, &user("u1", "Alice")).await.unwrap();
        }

        let reopened = MemoryStore::with_file(&path).await.unwrap();
        assert_eq!(RoomRepo::get(&reopened, room.id()).await.unwrap(), Some(room));
        assert!(UserRepo::get(&reopened, &UserId::new("u1").unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let store = MemoryStore::with_file(sub.join("store.json")).await.unwrap();
        let kept = room("kept", t0());
        RoomRepo::save(&store, &kept).await.unwrap();

        // Replace the data directory with a plain file so every rewrite fails.
        tokio::fs::remove_dir_all(&sub).await.unwrap();
        tokio::fs::write(&sub, "not a directory").await.unwrap();

        let lost = room("lost", t0());
        let err = RoomRepo::save(&store, &lost).await.unwrap_err();
        assert!(matches!(err, RepoError::Database { .. }));
        assert_eq!(RoomRepo::get(&store, lost.id()).await.unwrap(), None);

        assert!(store.delete(kept.id()).await.is_err());
        assert_eq!(RoomRepo::get(&store, kept.id()).await.unwrap(), Some(kept));

        assert!(UserRepo::save(&store, &user("u1", "Alice")).await.is_err());
        assert!(store.get_by_username("Alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::with_file(dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = MemoryStore::with_file(&path).await.err().unwrap();
        assert!(matches!(err, RepoError::Serialization(_)));
    }
}
