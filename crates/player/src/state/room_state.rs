//! Client-side copy of one room, kept current by polling.
//!
//! Every snapshot the server hands back, whether from a poll or from an
//! action, goes through [`RoomState::handle_update`]. Snapshots carrying a
//! lower revision than the one already applied are dropped there.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eom_shared::{RollResponse, RoomSnapshot};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::SyncError;
use super::polling::{spawn_poller, Latch, RefreshOutcome, SyncConfig};
use super::state_manager::{StateManager, UserIdentity};
use crate::application::RoomApi;
use crate::infrastructure::messaging::EventBus;
use crate::ports::outbound::{ApiError, RawApiPort, StorageProvider};

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A non-silent refresh started.
    Loading,
    Change(RoomSnapshot),
    Error(SyncError),
}

#[derive(Clone)]
pub struct RoomState {
    inner: Arc<Inner>,
}

struct Inner {
    rooms: RoomApi,
    manager: StateManager,
    identity: UserIdentity,
    room_id: Uuid,
    config: SyncConfig,
    snapshot: RwLock<Option<RoomSnapshot>>,
    refreshing: AtomicBool,
    polling: AtomicBool,
    cancel: CancellationToken,
    events: EventBus<RoomEvent>,
}

impl RoomState {
    pub fn new(
        api: Arc<dyn RawApiPort>,
        storage: Arc<dyn StorageProvider>,
        identity: UserIdentity,
        room_id: Uuid,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms: RoomApi::new(api),
                manager: StateManager::new(storage),
                identity,
                room_id,
                config,
                snapshot: RwLock::new(None),
                refreshing: AtomicBool::new(false),
                polling: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                events: EventBus::new(),
            }),
        }
    }

    pub fn room_id(&self) -> Uuid {
        self.inner.room_id
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.inner.identity
    }

    /// Last applied snapshot.
    pub async fn snapshot(&self) -> Option<RoomSnapshot> {
        self.inner.snapshot.read().await.clone()
    }

    pub async fn subscribe(&self, callback: impl FnMut(RoomEvent) + Send + 'static) {
        self.inner.events.subscribe(callback).await;
    }

    /// Join the room, then fetch it.
    pub async fn init(&self) -> Result<RoomSnapshot, SyncError> {
        let inner = &self.inner;
        let joined = inner
            .rooms
            .join_room(inner.room_id, &inner.identity.id, &inner.identity.username)
            .await;
        let joined = match joined {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail(SyncError::Init(e)).await),
        };
        self.handle_update(Some(joined)).await;

        let fetched = match inner.rooms.get_room(inner.room_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail(SyncError::Init(e)).await),
        };
        self.handle_update(Some(fetched.clone())).await;

        tracing::info!(
            room_id = %inner.room_id,
            user_id = %inner.identity.id,
            "Joined room"
        );
        Ok(self.snapshot().await.unwrap_or(fetched))
    }

    /// Fetch the room and apply it. A refresh that finds another one in
    /// flight returns [`RefreshOutcome::Skipped`] without sending anything.
    pub async fn refresh(&self, silent: bool) -> Result<RefreshOutcome, SyncError> {
        if self.inner.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Skipped);
        }
        let Some(_latch) = Latch::try_acquire(&self.inner.refreshing) else {
            tracing::trace!(room_id = %self.inner.room_id, "Refresh already in flight");
            return Ok(RefreshOutcome::Skipped);
        };

        if !silent {
            self.inner.events.dispatch(RoomEvent::Loading).await;
        }

        let snapshot = match self.inner.rooms.get_room(self.inner.room_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail(SyncError::Fetch(e)).await),
        };
        if self.inner.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Skipped);
        }

        Ok(if self.handle_update(Some(snapshot)).await {
            RefreshOutcome::Applied
        } else {
            RefreshOutcome::Stale
        })
    }

    /// Apply a server snapshot. Returns whether it replaced local state.
    pub async fn handle_update(&self, update: Option<RoomSnapshot>) -> bool {
        let Some(snapshot) = update else {
            return false;
        };

        {
            let mut current = self.inner.snapshot.write().await;
            if let Some(applied) = current.as_ref() {
                if snapshot.revision < applied.revision {
                    tracing::debug!(
                        room_id = %snapshot.id,
                        incoming = snapshot.revision,
                        applied = applied.revision,
                        "Dropping stale room snapshot"
                    );
                    return false;
                }
            }
            *current = Some(snapshot.clone());
        }

        self.inner.manager.save_room(&snapshot);
        self.inner.events.dispatch(RoomEvent::Change(snapshot)).await;
        true
    }

    /// Poll every `poll_interval` until [`destroy`](Self::destroy). Calling it twice is a no-op.
    pub fn start_polling(&self) {
        if self.inner.polling.swap(true, Ordering::AcqRel) {
            return;
        }
        let state = self.clone();
        spawn_poller(
            self.inner.config.poll_interval,
            self.inner.cancel.clone(),
            move || {
                let state = state.clone();
                async move {
                    // Failures were already reported as events.
                    let _ = state.refresh(true).await;
                }
            },
        );
    }

    /// Stop polling. In-flight results are discarded and later refreshes are skipped.
    pub fn destroy(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    pub async fn select_dream(&self, dream: &str) -> Result<RoomSnapshot, SyncError> {
        let inner = &self.inner;
        self.act(
            "select dream",
            inner.rooms.select_dream(inner.room_id, &inner.identity.id, dream),
        )
        .await
    }

    pub async fn select_token(&self, token: &str) -> Result<RoomSnapshot, SyncError> {
        let inner = &self.inner;
        self.act(
            "select token",
            inner.rooms.select_token(inner.room_id, &inner.identity.id, token),
        )
        .await
    }

    pub async fn set_ready(&self, ready: bool) -> Result<RoomSnapshot, SyncError> {
        let inner = &self.inner;
        self.act(
            "set ready",
            inner.rooms.set_ready(inner.room_id, &inner.identity.id, ready),
        )
        .await
    }

    pub async fn start_game(&self) -> Result<RoomSnapshot, SyncError> {
        let inner = &self.inner;
        self.act(
            "start game",
            inner.rooms.start_game(inner.room_id, &inner.identity.id),
        )
        .await
    }

    /// Leave the room, stop polling and forget the stored room.
    pub async fn leave(&self) -> Result<RoomSnapshot, SyncError> {
        let inner = &self.inner;
        let snapshot = self
            .act("leave", inner.rooms.leave_room(inner.room_id, &inner.identity.id))
            .await?;
        self.destroy();
        inner.manager.clear_room();
        Ok(snapshot)
    }

    pub async fn roll(&self) -> Result<RollResponse, SyncError> {
        let inner = &self.inner;
        match inner.rooms.roll_dice(inner.room_id, &inner.identity.id).await {
            Ok(roll) => {
                self.handle_update(Some(roll.room.clone())).await;
                Ok(roll)
            }
            Err(e) => Err(self.fail(SyncError::action("roll")(e)).await),
        }
    }

    async fn act<Fut>(&self, action: &'static str, call: Fut) -> Result<RoomSnapshot, SyncError>
    where
        Fut: Future<Output = Result<RoomSnapshot, ApiError>>,
    {
        match call.await {
            Ok(snapshot) => {
                self.handle_update(Some(snapshot.clone())).await;
                Ok(snapshot)
            }
            Err(e) => Err(self.fail(SyncError::action(action)(e)).await),
        }
    }

    async fn fail(&self, error: SyncError) -> SyncError {
        tracing::warn!(room_id = %self.inner.room_id, error = %error, "Room sync error");
        self.inner
            .events
            .dispatch(RoomEvent::Error(error.clone()))
            .await;
        error
    }
}
