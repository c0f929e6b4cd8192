//! Room aggregate - a lobby that turns into a running game
//!
//! # Design
//!
//! - **Private fields**: all mutation goes through methods that enforce the rules
//! - **Revision**: every successful mutation bumps `revision` by exactly one,
//!   so clients can order snapshots without relying on wall-clock time
//! - **Time is injected**: mutating methods take `now`; the aggregate never reads a clock

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{BankAccount, Player, Transfer};
use crate::error::DomainError;
use crate::game::{self, RollOutcome};
use crate::ids::{RoomId, TransferId, UserId};
use crate::value_objects::{Catalog, GameRules, PlayerName, RoomName};

/// A game room.
///
/// # Invariants
///
/// - No two players hold the same token
/// - Exactly one host while the room has players
/// - `players.len() <= rules.max_players`
/// - Every balance is non-negative
/// - `revision` strictly increases with each mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    id: RoomId,
    name: RoomName,
    players: Vec<Player>,
    catalog: Catalog,
    rules: GameRules,
    game_started: bool,
    current_turn: usize,
    transfers: Vec<Transfer>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Raw room state, used by stores that rebuild a room from rows.
#[derive(Debug, Clone)]
pub struct RoomParts {
    pub id: RoomId,
    pub name: RoomName,
    pub players: Vec<Player>,
    pub catalog: Catalog,
    pub rules: GameRules,
    pub game_started: bool,
    pub current_turn: usize,
    pub transfers: Vec<Transfer>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a room with the host seated as player 0.
    pub fn new(
        name: RoomName,
        host_id: UserId,
        host_name: PlayerName,
        catalog: Catalog,
        rules: GameRules,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RoomId::new(),
            name,
            players: vec![Player::new(host_id, host_name, now).as_host()],
            catalog,
            rules,
            game_started: false,
            current_turn: 0,
            transfers: Vec::new(),
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_parts(parts: RoomParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            players: parts.players,
            catalog: parts.catalog,
            rules: parts.rules,
            game_started: parts.game_started,
            current_turn: parts.current_turn,
            transfers: parts.transfers,
            revision: parts.revision,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> RoomId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    #[inline]
    pub fn game_started(&self) -> bool {
        self.game_started
    }

    #[inline]
    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    #[inline]
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn players_count(&self) -> usize {
        self.players.len()
    }

    pub fn ready_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_ready).count()
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn player_index(&self, user_id: &UserId) -> Option<usize> {
        self.players.iter().position(|p| &p.user_id == user_id)
    }

    pub fn player_index_by_name(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name.matches(name))
    }

    pub fn player(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn available_dreams(&self) -> &[String] {
        self.catalog.dreams()
    }

    /// Tokens from the catalog that nobody holds yet.
    pub fn available_tokens(&self) -> Vec<String> {
        self.catalog
            .tokens()
            .iter()
            .filter(|t| {
                !self
                    .players
                    .iter()
                    .any(|p| p.selected_token.as_deref() == Some(t.as_str()))
            })
            .cloned()
            .collect()
    }

    /// Whether the host may start the game now.
    pub fn can_start(&self) -> bool {
        !self.game_started
            && self.players.len() >= self.rules.min_players
            && self.players.iter().all(|p| p.is_ready)
    }

    /// Whether the room has not changed since `cutoff`.
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }

    // =========================================================================
    // Lobby
    // =========================================================================

    /// Seat a new player. Re-joining with the same user id is a no-op that
    /// returns the existing seat and leaves the revision untouched.
    ///
    /// Names are unique per room (case-insensitive) since the bank routes
    /// address accounts by name.
    pub fn join(
        &mut self,
        user_id: UserId,
        name: PlayerName,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        if let Some(index) = self.player_index(&user_id) {
            return Ok(index);
        }
        self.ensure_lobby("join")?;
        if self.players.len() >= self.rules.max_players {
            return Err(DomainError::room_full(
                self.players.len(),
                self.rules.max_players,
            ));
        }
        if self.players.iter().any(|p| p.name.matches(name.as_str())) {
            return Err(DomainError::constraint(format!(
                "Name {} is already taken in this room",
                name
            )));
        }
        let mut player = Player::new(user_id, name, now);
        if self.players.is_empty() {
            player.is_host = true;
        }
        self.players.push(player);
        self.touch(now);
        Ok(self.players.len() - 1)
    }

    pub fn select_dream(
        &mut self,
        user_id: &UserId,
        dream: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_lobby("select a dream")?;
        if !self.catalog.has_dream(dream) {
            return Err(DomainError::validation(format!("Unknown dream: {}", dream)));
        }
        let index = self.require_player(user_id)?;
        self.players[index].selected_dream = Some(dream.to_string());
        self.touch(now);
        Ok(())
    }

    pub fn select_token(
        &mut self,
        user_id: &UserId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_lobby("select a token")?;
        if !self.catalog.has_token(token) {
            return Err(DomainError::validation(format!("Unknown token: {}", token)));
        }
        let index = self.require_player(user_id)?;
        let taken = self.players.iter().enumerate().any(|(i, p)| {
            i != index && p.selected_token.as_deref() == Some(token)
        });
        if taken {
            return Err(DomainError::constraint(format!(
                "Token {} is already taken",
                token
            )));
        }
        self.players[index].selected_token = Some(token.to_string());
        self.touch(now);
        Ok(())
    }

    pub fn set_ready(
        &mut self,
        user_id: &UserId,
        ready: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_lobby("change readiness")?;
        let index = self.require_player(user_id)?;
        if ready && !self.players[index].has_selections() {
            return Err(DomainError::constraint(
                "Select a dream and a token before getting ready",
            ));
        }
        self.players[index].is_ready = ready;
        self.touch(now);
        Ok(())
    }

    /// Start the game. Only the host may do this, and only when `can_start`.
    pub fn start(&mut self, user_id: &UserId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.game_started {
            return Err(DomainError::invalid_state_transition(
                "Game has already started",
            ));
        }
        let index = self.require_player(user_id)?;
        if !self.players[index].is_host {
            return Err(DomainError::not_permitted("Only the host can start the game"));
        }
        if self.players.len() < self.rules.min_players {
            return Err(DomainError::constraint(format!(
                "Need at least {} players, have {}",
                self.rules.min_players,
                self.players.len()
            )));
        }
        if !self.players.iter().all(|p| p.is_ready) {
            return Err(DomainError::constraint(format!(
                "Only {} of {} players are ready",
                self.ready_count(),
                self.players.len()
            )));
        }
        let starting = BankAccount::starting(&self.rules);
        for player in &mut self.players {
            player.bank = starting.clone();
            player.position = 0;
        }
        self.game_started = true;
        self.current_turn = 0;
        self.touch(now);
        Ok(())
    }

    /// Leave the lobby. The host seat passes to the next player in join order.
    pub fn leave(&mut self, user_id: &UserId, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_lobby("leave")?;
        let index = self.require_player(user_id)?;
        let removed = self.players.remove(index);
        if removed.is_host {
            if let Some(next) = self.players.first_mut() {
                next.is_host = true;
            }
        }
        self.touch(now);
        Ok(())
    }

    // =========================================================================
    // Turns
    // =========================================================================

    /// Move the current player by `raw_die` cells and pay any PAYDAYs crossed.
    pub fn roll(
        &mut self,
        user_id: &UserId,
        raw_die: u8,
        now: DateTime<Utc>,
    ) -> Result<RollOutcome, DomainError> {
        self.ensure_started("roll")?;
        let index = self.require_player(user_id)?;
        if index != self.current_turn {
            return Err(DomainError::not_permitted("It is not your turn"));
        }
        let dice = game::normalize_die(raw_die);
        let player = &mut self.players[index];
        let from = player.position;
        let to = game::advance(from, usize::from(dice));
        let paydays = game::paydays_crossed(from, usize::from(dice));
        player.position = to;
        for _ in 0..paydays {
            player.bank.payday();
        }
        self.current_turn = (self.current_turn + 1) % self.players.len();
        self.touch(now);
        Ok(RollOutcome {
            player_index: index,
            dice,
            from,
            to,
            paydays,
        })
    }

    // =========================================================================
    // Bank
    // =========================================================================

    /// Move money between two players and append the transfer to the log.
    pub fn transfer(
        &mut self,
        sender_index: usize,
        recipient_index: usize,
        amount: i64,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Transfer, DomainError> {
        self.ensure_started("transfer money")?;
        if sender_index == recipient_index {
            return Err(DomainError::validation(
                "Sender and recipient must be different players",
            ));
        }
        for index in [sender_index, recipient_index] {
            if index >= self.players.len() {
                return Err(DomainError::not_found("Player", index.to_string()));
            }
        }
        if amount <= 0 {
            return Err(DomainError::validation("Amount must be positive"));
        }
        self.players[sender_index].bank.withdraw(amount)?;
        self.players[recipient_index].bank.deposit(amount)?;
        let transfer = Transfer {
            id: TransferId::new(),
            sender_index,
            recipient_index,
            amount,
            description: description.into(),
            timestamp: now,
        };
        self.transfers.push(transfer.clone());
        self.touch(now);
        Ok(transfer)
    }

    pub fn take_credit(
        &mut self,
        user_id: &UserId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        self.ensure_started("take credit")?;
        let index = self.require_player(user_id)?;
        let rules = self.rules;
        self.players[index].bank.take_credit(amount, &rules)?;
        self.touch(now);
        Ok(index)
    }

    pub fn payoff_credit(
        &mut self,
        user_id: &UserId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        self.ensure_started("pay off credit")?;
        let index = self.require_player(user_id)?;
        let rules = self.rules;
        self.players[index].bank.payoff_credit(amount, &rules)?;
        self.touch(now);
        Ok(index)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn touch(&mut self, now: DateTime<Utc>) {
        self.revision += 1;
        self.updated_at = now;
    }

    fn require_player(&self, user_id: &UserId) -> Result<usize, DomainError> {
        self.player_index(user_id)
            .ok_or_else(|| DomainError::not_found("Player", user_id.as_str()))
    }

    fn ensure_lobby(&self, action: &str) -> Result<(), DomainError> {
        if self.game_started {
            return Err(DomainError::invalid_state_transition(format!(
                "Cannot {} after the game has started",
                action
            )));
        }
        Ok(())
    }

    fn ensure_started(&self, action: &str) -> Result<(), DomainError> {
        if !self.game_started {
            return Err(DomainError::invalid_state_transition(format!(
                "Cannot {} before the game has started",
                action
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn new_room() -> Room {
        Room::new(
            RoomName::new("Friday game").unwrap(),
            uid("host"),
            PlayerName::new("Hana").unwrap(),
            Catalog::default(),
            GameRules::default(),
            t0(),
        )
    }

    fn ready_player(room: &mut Room, id: &str, token: &str) {
        let user = uid(id);
        room.select_dream(&user, "house", t0()).unwrap();
        room.select_token(&user, token, t0()).unwrap();
        room.set_ready(&user, true, t0()).unwrap();
    }

    fn started_room() -> Room {
        let mut room = new_room();
        room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
            .unwrap();
        ready_player(&mut room, "host", "lion");
        ready_player(&mut room, "guest", "fox");
        room.start(&uid("host"), t0()).unwrap();
        room
    }

    mod lobby {
        use super::*;

        #[test]
        fn new_room_seats_host_at_revision_one() {
            let room = new_room();
            assert_eq!(room.revision(), 1);
            assert_eq!(room.players_count(), 1);
            assert!(room.players()[0].is_host);
            assert!(!room.can_start());
        }

        #[test]
        fn join_bumps_revision_once() {
            let mut room = new_room();
            let index = room
                .join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
                .unwrap();
            assert_eq!(index, 1);
            assert_eq!(room.revision(), 2);
            assert!(!room.players()[1].is_host);
        }

        #[test]
        fn rejoin_is_idempotent() {
            let mut room = new_room();
            room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
                .unwrap();
            let again = room
                .join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
                .unwrap();
            assert_eq!(again, 1);
            assert_eq!(room.players_count(), 2);
            assert_eq!(room.revision(), 2);
        }

        #[test]
        fn join_with_taken_name_rejected() {
            let mut room = new_room();
            let err = room
                .join(uid("guest"), PlayerName::new(" hana ").unwrap(), t0())
                .unwrap_err();
            assert!(matches!(err, DomainError::Constraint(_)));
            assert_eq!(room.players_count(), 1);
            assert_eq!(room.revision(), 1);
        }

        #[test]
        fn join_full_room_rejected() {
            let mut room = new_room();
            for i in 1..6 {
                room.join(
                    uid(&format!("p{}", i)),
                    PlayerName::new(format!("P{}", i)).unwrap(),
                    t0(),
                )
                .unwrap();
            }
            let err = room
                .join(uid("late"), PlayerName::new("Late").unwrap(), t0())
                .unwrap_err();
            assert_eq!(err, DomainError::room_full(6, 6));
        }

        #[test]
        fn unknown_dream_rejected() {
            let mut room = new_room();
            let err = room.select_dream(&uid("host"), "moon", t0()).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
            assert_eq!(room.revision(), 1);
        }

        #[test]
        fn tokens_are_unique() {
            let mut room = new_room();
            room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
                .unwrap();
            room.select_token(&uid("host"), "lion", t0()).unwrap();
            let err = room.select_token(&uid("guest"), "lion", t0()).unwrap_err();
            assert!(matches!(err, DomainError::Constraint(_)));
            assert!(!room.available_tokens().contains(&"lion".to_string()));
        }

        #[test]
        fn reselecting_token_releases_previous() {
            let mut room = new_room();
            room.select_token(&uid("host"), "lion", t0()).unwrap();
            room.select_token(&uid("host"), "owl", t0()).unwrap();
            assert!(room.available_tokens().contains(&"lion".to_string()));
            assert!(!room.available_tokens().contains(&"owl".to_string()));
        }

        #[test]
        fn ready_requires_selections() {
            let mut room = new_room();
            let err = room.set_ready(&uid("host"), true, t0()).unwrap_err();
            assert!(matches!(err, DomainError::Constraint(_)));
            room.select_dream(&uid("host"), "house", t0()).unwrap();
            room.select_token(&uid("host"), "lion", t0()).unwrap();
            room.set_ready(&uid("host"), true, t0()).unwrap();
            assert_eq!(room.ready_count(), 1);
        }

        #[test]
        fn only_host_can_start() {
            let mut room = new_room();
            room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
                .unwrap();
            ready_player(&mut room, "host", "lion");
            ready_player(&mut room, "guest", "fox");
            assert!(room.can_start());
            let err = room.start(&uid("guest"), t0()).unwrap_err();
            assert!(matches!(err, DomainError::NotPermitted(_)));
        }

        #[test]
        fn start_requires_min_players() {
            let mut room = new_room();
            ready_player(&mut room, "host", "lion");
            assert!(!room.can_start());
            assert!(matches!(
                room.start(&uid("host"), t0()),
                Err(DomainError::Constraint(_))
            ));
        }

        #[test]
        fn start_hands_out_starting_accounts() {
            let room = started_room();
            assert!(room.game_started());
            assert!(!room.can_start());
            for p in room.players() {
                assert_eq!(p.cash(), 3000);
                assert_eq!(p.bank.max_credit, 30_000);
            }
        }

        #[test]
        fn cannot_join_after_start() {
            let mut room = started_room();
            let err = room
                .join(uid("late"), PlayerName::new("Late").unwrap(), t0())
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        }

        #[test]
        fn host_leaving_promotes_next_player() {
            let mut room = new_room();
            room.join(uid("guest"), PlayerName::new("Gil").unwrap(), t0())
                .unwrap();
            room.leave(&uid("host"), t0()).unwrap();
            assert_eq!(room.players_count(), 1);
            assert!(room.players()[0].is_host);
            assert_eq!(room.host().map(|p| p.name.as_str()), Some("Gil"));
        }
    }

    mod turns {
        use super::*;

        #[test]
        fn roll_moves_and_passes_turn() {
            let mut room = started_room();
            let outcome = room.roll(&uid("host"), 4, t0()).unwrap();
            assert_eq!(outcome.from, 0);
            assert_eq!(outcome.to, 4);
            assert_eq!(outcome.paydays, 0);
            assert_eq!(room.current_turn(), 1);
        }

        #[test]
        fn roll_out_of_turn_rejected() {
            let mut room = started_room();
            let err = room.roll(&uid("guest"), 3, t0()).unwrap_err();
            assert!(matches!(err, DomainError::NotPermitted(_)));
        }

        #[test]
        fn landing_on_payday_pays_income() {
            let mut room = started_room();
            let outcome = room.roll(&uid("host"), 6, t0()).unwrap();
            assert_eq!(outcome.paydays, 1);
            assert_eq!(room.players()[0].cash(), 6000);
        }

        #[test]
        fn roll_before_start_rejected() {
            let mut room = new_room();
            assert!(matches!(
                room.roll(&uid("host"), 3, t0()),
                Err(DomainError::InvalidStateTransition(_))
            ));
        }
    }

    mod bank {
        use super::*;

        #[test]
        fn transfer_moves_money_and_logs() {
            let mut room = started_room();
            let rev = room.revision();
            let later = t0() + Duration::minutes(5);
            let transfer = room.transfer(0, 1, 500, "rent", later).unwrap();
            assert_eq!(transfer.amount, 500);
            assert_eq!(room.players()[0].cash(), 2500);
            assert_eq!(room.players()[1].cash(), 3500);
            assert_eq!(room.transfers().len(), 1);
            assert_eq!(room.revision(), rev + 1);
            assert_eq!(room.updated_at(), later);
        }

        #[test]
        fn overdraft_transfer_changes_nothing() {
            let mut room = started_room();
            let before = room.clone();
            let err = room.transfer(0, 1, 5000, "too much", t0()).unwrap_err();
            assert!(matches!(err, DomainError::InsufficientFunds { .. }));
            assert_eq!(room, before);
        }

        #[test]
        fn transfer_to_self_rejected() {
            let mut room = started_room();
            assert!(matches!(
                room.transfer(1, 1, 10, "", t0()),
                Err(DomainError::Validation(_))
            ));
        }

        #[test]
        fn transfer_to_missing_player_rejected() {
            let mut room = started_room();
            assert!(matches!(
                room.transfer(0, 9, 10, "", t0()),
                Err(DomainError::NotFound { .. })
            ));
        }

        #[test]
        fn credit_round_trip() {
            let mut room = started_room();
            room.take_credit(&uid("guest"), 2000, t0()).unwrap();
            assert_eq!(room.players()[1].bank.credit, 2000);
            room.payoff_credit(&uid("guest"), 2000, t0()).unwrap();
            assert_eq!(room.players()[1].bank.credit, 0);
            assert_eq!(room.players()[1].bank.monthly_income, 3000);
        }

        #[test]
        fn credit_before_start_rejected() {
            let mut room = new_room();
            assert!(room.take_credit(&uid("host"), 1000, t0()).is_err());
        }
    }

    #[test]
    fn idle_check_uses_updated_at() {
        let room = new_room();
        assert!(room.is_idle_since(t0() + Duration::seconds(1)));
        assert!(!room.is_idle_since(t0()));
    }

    #[test]
    fn serde_round_trip_preserves_room() {
        let room = started_room();
        let json = serde_json::to_string(&room).unwrap();
        let back: Room = serde_json::from_str(&json).unwrap();
        assert_eq!(room, back);
    }
}
