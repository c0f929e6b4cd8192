//! Lobby use cases: create, join, pick a dream and token, get ready, start, leave.

use std::sync::Arc;

use eom_domain::{Catalog, GameRules, PlayerName, Room, RoomId, RoomName, UserId};

use super::{RoomError, RoomWriter};
use crate::infrastructure::ports::{ClockPort, RoomRepo};

pub struct RoomLobby {
    rooms: Arc<dyn RoomRepo>,
    writer: Arc<RoomWriter>,
    clock: Arc<dyn ClockPort>,
    catalog: Catalog,
    rules: GameRules,
}

impl RoomLobby {
    pub fn new(
        rooms: Arc<dyn RoomRepo>,
        writer: Arc<RoomWriter>,
        clock: Arc<dyn ClockPort>,
        catalog: Catalog,
        rules: GameRules,
    ) -> Self {
        Self {
            rooms,
            writer,
            clock,
            catalog,
            rules,
        }
    }

    /// Create a room with the caller seated as host.
    pub async fn create(
        &self,
        name: &str,
        user_id: &str,
        player_name: &str,
    ) -> Result<Room, RoomError> {
        let room = Room::new(
            RoomName::new(name)?,
            UserId::new(user_id)?,
            PlayerName::new(player_name)?,
            self.catalog.clone(),
            self.rules,
            self.clock.now(),
        );
        self.rooms.save(&room).await?;

        tracing::info!(room_id = %room.id(), name = %room.name(), "Room created");
        Ok(room)
    }

    pub async fn get(&self, room_id: RoomId) -> Result<Room, RoomError> {
        self.rooms
            .get(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound(room_id))
    }

    pub async fn list(&self) -> Result<Vec<Room>, RoomError> {
        Ok(self.rooms.list().await?)
    }

    pub async fn join(
        &self,
        room_id: RoomId,
        user_id: &str,
        player_name: &str,
    ) -> Result<Room, RoomError> {
        let user_id = UserId::new(user_id)?;
        let name = PlayerName::new(player_name)?;
        let (room, seat) = self
            .writer
            .update(room_id, move |room, now| room.join(user_id, name, now))
            .await?;

        tracing::info!(room_id = %room_id, seat, players = room.players_count(), "Player joined");
        Ok(room)
    }

    pub async fn select_dream(
        &self,
        room_id: RoomId,
        user_id: &str,
        dream: &str,
    ) -> Result<Room, RoomError> {
        let user_id = UserId::new(user_id)?;
        let dream = dream.trim().to_string();
        let (room, ()) = self
            .writer
            .update(room_id, move |room, now| {
                room.select_dream(&user_id, &dream, now)
            })
            .await?;
        Ok(room)
    }

    pub async fn select_token(
        &self,
        room_id: RoomId,
        user_id: &str,
        token: &str,
    ) -> Result<Room, RoomError> {
        let user_id = UserId::new(user_id)?;
        let token = token.trim().to_string();
        let (room, ()) = self
            .writer
            .update(room_id, move |room, now| {
                room.select_token(&user_id, &token, now)
            })
            .await?;
        Ok(room)
    }

    pub async fn set_ready(
        &self,
        room_id: RoomId,
        user_id: &str,
        ready: bool,
    ) -> Result<Room, RoomError> {
        let user_id = UserId::new(user_id)?;
        let (room, ()) = self
            .writer
            .update(room_id, move |room, now| room.set_ready(&user_id, ready, now))
            .await?;
        Ok(room)
    }

    pub async fn start(&self, room_id: RoomId, user_id: &str) -> Result<Room, RoomError> {
        let user_id = UserId::new(user_id)?;
        let (room, ()) = self
            .writer
            .update(room_id, move |room, now| room.start(&user_id, now))
            .await?;

        tracing::info!(room_id = %room_id, players = room.players_count(), "Game started");
        Ok(room)
    }

    pub async fn leave(&self, room_id: RoomId, user_id: &str) -> Result<Room, RoomError> {
        let user_id = UserId::new(user_id)?;
        let (room, ()) = self
            .writer
            .update(room_id, move |room, now| room.leave(&user_id, now))
            .await?;

        tracing::info!(room_id = %room_id, players = room.players_count(), "Player left");
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockClockPort, MockRoomRepo};
    use crate::infrastructure::room_locks::RoomLocks;
    use crate::use_cases::test_support::{lobby_room, t0};
    use eom_domain::DomainError;
    use mockall::predicate::*;

    fn lobby(repo: MockRoomRepo) -> RoomLobby {
        let repo: Arc<dyn RoomRepo> = Arc::new(repo);
        let mut clock = MockClockPort::new();
        clock.expect_now().returning(t0);
        let clock: Arc<dyn ClockPort> = Arc::new(clock);
        let writer = Arc::new(RoomWriter::new(
            repo.clone(),
            Arc::new(RoomLocks::new()),
            clock.clone(),
        ));
        RoomLobby::new(repo, writer, clock, Catalog::default(), GameRules::default())
    }

    /// Repo holding a single room that records every save.
    fn repo_with(room: Room) -> MockRoomRepo {
        let mut repo = MockRoomRepo::new();
        let id = room.id();
        repo.expect_get()
            .with(eq(id))
            .returning(move |_| Ok(Some(room.clone())));
        repo
    }

    #[tokio::test]
    async fn create_saves_room_with_host() {
        let mut repo = MockRoomRepo::new();
        repo.expect_save()
            .withf(|room| {
                room.revision() == 1
                    && room.players_count() == 1
                    && room.players()[0].is_host
                    && room.name().as_str() == "Table"
            })
            .times(1)
            .returning(|_| Ok(()));

        let room = lobby(repo).create(" Table ", "u1", "Ann").await.unwrap();
        assert_eq!(room.created_at(), t0());
        assert_eq!(room.host().map(|p| p.user_id.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn create_rejects_blank_name_without_saving() {
        let mut repo = MockRoomRepo::new();
        repo.expect_save().never();

        let err = lobby(repo).create("  ", "u1", "Ann").await.unwrap_err();
        assert!(matches!(err, RoomError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn get_missing_room_is_not_found() {
        let mut repo = MockRoomRepo::new();
        repo.expect_get().returning(|_| Ok(None));

        let err = lobby(repo).get(RoomId::new()).await.unwrap_err();
        assert!(matches!(err, RoomError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn join_adds_player_and_bumps_revision() {
        let room = lobby_room();
        let id = room.id();
        let mut repo = repo_with(room);
        repo.expect_save()
            .withf(|room| room.revision() == 2)
            .times(1)
            .returning(|_| Ok(()));

        let room = lobby(repo).join(id, "guest", "Gil").await.unwrap();
        assert_eq!(room.players_count(), 2);
    }

    #[tokio::test]
    async fn join_rejects_bad_user_id_before_loading() {
        let mut repo = MockRoomRepo::new();
        repo.expect_get().never();

        let err = lobby(repo).join(RoomId::new(), " ", "Gil").await.unwrap_err();
        assert!(matches!(err, RoomError::Domain(DomainError::InvalidId(_))));
    }

    #[tokio::test]
    async fn token_taken_is_a_constraint_error() {
        let mut room = lobby_room();
        room.join(
            UserId::new("guest").unwrap(),
            PlayerName::new("Gil").unwrap(),
            t0(),
        )
        .unwrap();
        room.select_token(&UserId::new("host").unwrap(), "owl", t0())
            .unwrap();
        let id = room.id();
        let mut repo = repo_with(room);
        repo.expect_save().never();

        let err = lobby(repo)
            .select_token(id, "guest", "owl")
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::Domain(DomainError::Constraint(_))));
    }

    #[tokio::test]
    async fn full_lobby_flow_reaches_started_game() {
        let room = lobby_room();
        let id = room.id();
        let store = Arc::new(crate::infrastructure::memory_store::MemoryStore::new());
        RoomRepo::save(store.as_ref(), &room).await.unwrap();

        let repo: Arc<dyn RoomRepo> = store;
        let mut clock = MockClockPort::new();
        clock.expect_now().returning(t0);
        let clock: Arc<dyn ClockPort> = Arc::new(clock);
        let writer = Arc::new(RoomWriter::new(
            repo.clone(),
            Arc::new(RoomLocks::new()),
            clock.clone(),
        ));
        let lobby = RoomLobby::new(repo, writer, clock, Catalog::default(), GameRules::default());

        lobby.join(id, "guest", "Gil").await.unwrap();
        for (user, token) in [("host", "lion"), ("guest", "bear")] {
            lobby.select_dream(id, user, "travel").await.unwrap();
            lobby.select_token(id, user, token).await.unwrap();
            lobby.set_ready(id, user, true).await.unwrap();
        }
        let before = lobby.get(id).await.unwrap();
        assert!(before.can_start());

        let err = lobby.start(id, "guest").await.unwrap_err();
        assert!(matches!(err, RoomError::Domain(DomainError::NotPermitted(_))));

        let room = lobby.start(id, "host").await.unwrap();
        assert!(room.game_started());
        assert_eq!(room.revision(), before.revision() + 1);
    }
}
