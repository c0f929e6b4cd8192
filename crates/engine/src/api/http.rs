//! HTTP routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use eom_domain::RoomId;
use eom_shared::{
    BankCreditRequest, BankSnapshot, BankTransferRequest, CreateRoomRequest, CreditRequest,
    JoinRoomRequest, ReadyRequest, RegisterUserRequest, RollResponse, RoomSnapshot, RoomSummary,
    SelectDreamRequest, SelectTokenRequest, TransferRequest, UserActionRequest, UserResponse,
};

use super::conversions::{bank_snapshot, room_snapshot, room_summary, roll_response, user_response};
use super::error::ApiError;
use crate::app::App;
use crate::use_cases::PlayerAccount;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users", post(register_user))
        .route("/api/users/{id}", get(get_user))
        .route("/api/rooms", get(list_rooms).post(create_room))
        .route("/api/rooms/{id}", get(get_room))
        .route("/api/rooms/{id}/join", post(join_room))
        .route("/api/rooms/{id}/dream", post(select_dream))
        .route("/api/rooms/{id}/token", post(select_token))
        .route("/api/rooms/{id}/ready", post(set_ready))
        .route("/api/rooms/{id}/start", post(start_game))
        .route("/api/rooms/{id}/leave", post(leave_room))
        .route("/api/rooms/{id}/roll", post(roll_dice))
        .route("/api/rooms/{id}/transfer", post(transfer))
        .route("/api/rooms/{id}/take-credit", post(take_credit))
        .route("/api/rooms/{id}/payoff-credit", post(payoff_credit))
        .route("/api/bank/balance/{name}/{room}", get(bank_balance))
        .route("/api/bank/credit/take", post(bank_take_credit))
        .route("/api/bank/transfer", post(bank_transfer))
}

async fn health() -> &'static str {
    "OK"
}

fn account_snapshot(account: &PlayerAccount) -> Result<Json<BankSnapshot>, ApiError> {
    bank_snapshot(&account.room, account.player_index)
        .map(Json)
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "seat {} missing from room {}",
                account.player_index,
                account.room.id()
            ))
        })
}

// =============================================================================
// Users
// =============================================================================

async fn register_user(
    State(app): State<Arc<App>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = app.use_cases.users.register(&req.username).await?;
    Ok(Json(user_response(&user)))
}

async fn get_user(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = app.use_cases.users.get(&id).await?;
    Ok(Json(user_response(&user)))
}

// =============================================================================
// Rooms
// =============================================================================

async fn list_rooms(State(app): State<Arc<App>>) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    let rooms = app.use_cases.lobby.list().await?;
    Ok(Json(rooms.iter().map(room_summary).collect()))
}

async fn create_room(
    State(app): State<Arc<App>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .create(&req.name, &req.user_id, &req.player_name)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn get_room(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app.use_cases.lobby.get(RoomId::from_uuid(id)).await?;
    Ok(Json(room_snapshot(&room)))
}

async fn join_room(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .join(RoomId::from_uuid(id), &req.user_id, &req.player_name)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn select_dream(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectDreamRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .select_dream(RoomId::from_uuid(id), &req.user_id, &req.dream)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn select_token(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectTokenRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .select_token(RoomId::from_uuid(id), &req.user_id, &req.token)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn set_ready(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReadyRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .set_ready(RoomId::from_uuid(id), &req.user_id, req.ready)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn start_game(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserActionRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .start(RoomId::from_uuid(id), &req.user_id)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn leave_room(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserActionRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .lobby
        .leave(RoomId::from_uuid(id), &req.user_id)
        .await?;
    Ok(Json(room_snapshot(&room)))
}

// =============================================================================
// Turns and room-addressed bank actions
// =============================================================================

async fn roll_dice(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserActionRequest>,
) -> Result<Json<RollResponse>, ApiError> {
    let (room, outcome) = app
        .use_cases
        .roll
        .execute(RoomId::from_uuid(id), &req.user_id)
        .await?;
    Ok(Json(roll_response(&room, outcome)))
}

async fn transfer(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = app
        .use_cases
        .bank
        .transfer(
            RoomId::from_uuid(id),
            req.sender_index,
            req.recipient_index,
            req.amount,
            &req.description,
        )
        .await?;
    Ok(Json(room_snapshot(&room)))
}

async fn take_credit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreditRequest>,
) -> Result<Json<BankSnapshot>, ApiError> {
    let account = app
        .use_cases
        .bank
        .take_credit(RoomId::from_uuid(id), &req.user_id, req.amount)
        .await?;
    account_snapshot(&account)
}

async fn payoff_credit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreditRequest>,
) -> Result<Json<BankSnapshot>, ApiError> {
    let account = app
        .use_cases
        .bank
        .payoff_credit(RoomId::from_uuid(id), &req.user_id, req.amount)
        .await?;
    account_snapshot(&account)
}

// =============================================================================
// Bank (players addressed by name)
// =============================================================================

async fn bank_balance(
    State(app): State<Arc<App>>,
    Path((name, room)): Path<(String, Uuid)>,
) -> Result<Json<BankSnapshot>, ApiError> {
    let account = app
        .use_cases
        .bank
        .balance(RoomId::from_uuid(room), &name)
        .await?;
    account_snapshot(&account)
}

async fn bank_take_credit(
    State(app): State<Arc<App>>,
    Json(req): Json<BankCreditRequest>,
) -> Result<Json<BankSnapshot>, ApiError> {
    let account = app
        .use_cases
        .bank
        .take_credit_by_name(RoomId::from_uuid(req.room_id), &req.username, req.amount)
        .await?;
    account_snapshot(&account)
}

async fn bank_transfer(
    State(app): State<Arc<App>>,
    Json(req): Json<BankTransferRequest>,
) -> Result<Json<BankSnapshot>, ApiError> {
    let account = app
        .use_cases
        .bank
        .transfer_by_name(
            RoomId::from_uuid(req.room_id),
            &req.from,
            &req.to,
            req.amount,
            &req.description,
        )
        .await?;
    account_snapshot(&account)
}
