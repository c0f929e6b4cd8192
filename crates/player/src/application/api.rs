//! Typed REST wrappers.
//!
//! One method per engine endpoint. Each builds the request DTO, sends it
//! through `RawApiPort`, and decodes the response into an `eom-shared` type.

use std::sync::Arc;

use eom_shared::{
    BankCreditRequest, BankSnapshot, BankTransferRequest, CreateRoomRequest, CreditRequest,
    JoinRoomRequest, ReadyRequest, RegisterUserRequest, RollResponse, RoomSnapshot, RoomSummary,
    SelectDreamRequest, SelectTokenRequest, TransferRequest, UserActionRequest, UserResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::ports::outbound::{ApiError, RawApiPort};

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn encode<T: Serialize>(body: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Join path segments, percent-encoding each one.
fn segments_path(segments: &[&str]) -> Result<String, ApiError> {
    let mut url = Url::parse("http://engine/").map_err(|e| ApiError::Network(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::Network("base URL cannot carry a path".to_string()))?
        .extend(segments);
    Ok(url.path().to_string())
}

async fn post<B: Serialize, T: DeserializeOwned>(
    api: &dyn RawApiPort,
    path: &str,
    body: &B,
) -> Result<T, ApiError> {
    decode(api.post_json(path, &encode(body)?).await?)
}

async fn get<T: DeserializeOwned>(api: &dyn RawApiPort, path: &str) -> Result<T, ApiError> {
    decode(api.get_json(path).await?)
}

// =============================================================================
// Users
// =============================================================================

#[derive(Clone)]
pub struct UserApi {
    api: Arc<dyn RawApiPort>,
}

impl UserApi {
    pub fn new(api: Arc<dyn RawApiPort>) -> Self {
        Self { api }
    }

    /// Register `username`, or get the existing user of that name.
    pub async fn register(&self, username: &str) -> Result<UserResponse, ApiError> {
        let body = RegisterUserRequest {
            username: username.to_string(),
        };
        post(self.api.as_ref(), "/api/users", &body).await
    }

    pub async fn get(&self, user_id: &str) -> Result<UserResponse, ApiError> {
        let path = segments_path(&["api", "users", user_id])?;
        get(self.api.as_ref(), &path).await
    }
}

// =============================================================================
// Rooms
// =============================================================================

#[derive(Clone)]
pub struct RoomApi {
    api: Arc<dyn RawApiPort>,
}

impl RoomApi {
    pub fn new(api: Arc<dyn RawApiPort>) -> Self {
        Self { api }
    }

    fn room_path(room_id: Uuid, action: &str) -> String {
        format!("/api/rooms/{room_id}/{action}")
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ApiError> {
        get(self.api.as_ref(), "/api/rooms").await
    }

    pub async fn create_room(
        &self,
        name: &str,
        user_id: &str,
        player_name: &str,
    ) -> Result<RoomSnapshot, ApiError> {
        let body = CreateRoomRequest {
            name: name.to_string(),
            user_id: user_id.to_string(),
            player_name: player_name.to_string(),
        };
        post(self.api.as_ref(), "/api/rooms", &body).await
    }

    pub async fn get_room(&self, room_id: Uuid) -> Result<RoomSnapshot, ApiError> {
        get(self.api.as_ref(), &format!("/api/rooms/{room_id}")).await
    }

    pub async fn join_room(
        &self,
        room_id: Uuid,
        user_id: &str,
        player_name: &str,
    ) -> Result<RoomSnapshot, ApiError> {
        let body = JoinRoomRequest {
            user_id: user_id.to_string(),
            player_name: player_name.to_string(),
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "join"), &body).await
    }

    pub async fn select_dream(
        &self,
        room_id: Uuid,
        user_id: &str,
        dream: &str,
    ) -> Result<RoomSnapshot, ApiError> {
        let body = SelectDreamRequest {
            user_id: user_id.to_string(),
            dream: dream.to_string(),
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "dream"), &body).await
    }

    pub async fn select_token(
        &self,
        room_id: Uuid,
        user_id: &str,
        token: &str,
    ) -> Result<RoomSnapshot, ApiError> {
        let body = SelectTokenRequest {
            user_id: user_id.to_string(),
            token: token.to_string(),
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "token"), &body).await
    }

    pub async fn set_ready(
        &self,
        room_id: Uuid,
        user_id: &str,
        ready: bool,
    ) -> Result<RoomSnapshot, ApiError> {
        let body = ReadyRequest {
            user_id: user_id.to_string(),
            ready,
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "ready"), &body).await
    }

    pub async fn start_game(&self, room_id: Uuid, user_id: &str) -> Result<RoomSnapshot, ApiError> {
        let body = UserActionRequest {
            user_id: user_id.to_string(),
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "start"), &body).await
    }

    pub async fn leave_room(&self, room_id: Uuid, user_id: &str) -> Result<RoomSnapshot, ApiError> {
        let body = UserActionRequest {
            user_id: user_id.to_string(),
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "leave"), &body).await
    }

    pub async fn roll_dice(&self, room_id: Uuid, user_id: &str) -> Result<RollResponse, ApiError> {
        let body = UserActionRequest {
            user_id: user_id.to_string(),
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "roll"), &body).await
    }

    /// Transfer between two seats of the room.
    pub async fn transfer(
        &self,
        room_id: Uuid,
        request: &TransferRequest,
    ) -> Result<RoomSnapshot, ApiError> {
        post(self.api.as_ref(), &Self::room_path(room_id, "transfer"), request).await
    }

    pub async fn take_credit(
        &self,
        room_id: Uuid,
        user_id: &str,
        amount: i64,
    ) -> Result<BankSnapshot, ApiError> {
        let body = CreditRequest {
            user_id: user_id.to_string(),
            amount,
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "take-credit"), &body).await
    }

    pub async fn payoff_credit(
        &self,
        room_id: Uuid,
        user_id: &str,
        amount: i64,
    ) -> Result<BankSnapshot, ApiError> {
        let body = CreditRequest {
            user_id: user_id.to_string(),
            amount,
        };
        post(self.api.as_ref(), &Self::room_path(room_id, "payoff-credit"), &body).await
    }
}

// =============================================================================
// Bank (players addressed by name)
// =============================================================================

#[derive(Clone)]
pub struct BankApi {
    api: Arc<dyn RawApiPort>,
}

impl BankApi {
    pub fn new(api: Arc<dyn RawApiPort>) -> Self {
        Self { api }
    }

    pub async fn balance(&self, username: &str, room_id: Uuid) -> Result<BankSnapshot, ApiError> {
        let room = room_id.to_string();
        let path = segments_path(&["api", "bank", "balance", username, &room])?;
        get(self.api.as_ref(), &path).await
    }

    pub async fn take_credit(
        &self,
        room_id: Uuid,
        username: &str,
        amount: i64,
    ) -> Result<BankSnapshot, ApiError> {
        let body = BankCreditRequest {
            room_id,
            username: username.to_string(),
            amount,
        };
        post(self.api.as_ref(), "/api/bank/credit/take", &body).await
    }

    /// Transfer from `from` to `to`. Returns the sender's account.
    pub async fn transfer(
        &self,
        room_id: Uuid,
        from: &str,
        to: &str,
        amount: i64,
        description: &str,
    ) -> Result<BankSnapshot, ApiError> {
        let body = BankTransferRequest {
            room_id,
            from: from.to_string(),
            to: to.to_string(),
            amount,
            description: description.to_string(),
        };
        post(self.api.as_ref(), "/api/bank/transfer", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::{bank_snapshot, room_snapshot, ROOM_ID};
    use crate::ports::outbound::MockRawApiPort;
    use serde_json::json;

    #[tokio::test]
    async fn join_posts_camel_case_body() {
        let mut mock = MockRawApiPort::new();
        let snapshot = serde_json::to_value(room_snapshot(2)).unwrap();
        let expected_path = format!("/api/rooms/{ROOM_ID}/join");
        mock.expect_post_json()
            .withf(move |path, body| {
                path == expected_path && *body == json!({"userId": "u1", "playerName": "Hana"})
            })
            .times(1)
            .returning(move |_, _| Ok(snapshot.clone()));

        let rooms = RoomApi::new(Arc::new(mock));
        let room = rooms.join_room(ROOM_ID, "u1", "Hana").await.unwrap();
        assert_eq!(room.revision, 2);
    }

    #[tokio::test]
    async fn balance_path_encodes_the_name() {
        let mut mock = MockRawApiPort::new();
        let snapshot = serde_json::to_value(bank_snapshot(3000, Some(4))).unwrap();
        let expected_path = format!("/api/bank/balance/Anna%20Lee/{ROOM_ID}");
        mock.expect_get_json()
            .withf(move |path| path == expected_path)
            .times(1)
            .returning(move |_| Ok(snapshot.clone()));

        let bank = BankApi::new(Arc::new(mock));
        let account = bank.balance("Anna Lee", ROOM_ID).await.unwrap();
        assert_eq!(account.revision, Some(4));
    }

    #[tokio::test]
    async fn unexpected_shape_is_a_decode_error() {
        let mut mock = MockRawApiPort::new();
        mock.expect_get_json()
            .returning(|_| Ok(json!({"unexpected": true})));

        let err = RoomApi::new(Arc::new(mock))
            .get_room(ROOM_ID)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let mut mock = MockRawApiPort::new();
        mock.expect_post_json()
            .returning(|_, _| Err(ApiError::Timeout));

        let err = UserApi::new(Arc::new(mock))
            .register("Hana")
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Timeout);
    }
}
