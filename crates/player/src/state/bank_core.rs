//! One player's bank account, polled from the server and updated optimistically.
//!
//! Local operations change the balance immediately and then confirm with the
//! server. A failed request restores the previous state. While an operation
//! is pending, polled snapshots are not applied.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eom_shared::{BankSnapshot, TransferRecord};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::SyncError;
use super::polling::{spawn_poller, Latch, RefreshOutcome, SyncConfig};
use super::reconcile::{self, Decision};
use super::state_manager::UserIdentity;
use crate::application::{BankApi, RoomApi};
use crate::infrastructure::messaging::EventBus;
use crate::ports::outbound::{ApiError, RawApiPort};

/// Local view of the account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankState {
    pub balance: i64,
    pub total_income: i64,
    pub total_expenses: i64,
    pub monthly_income: i64,
    pub credit: i64,
    pub max_credit: i64,
    pub transfers: Vec<TransferRecord>,
    /// Room revision of the last applied server snapshot
    pub revision: Option<u64>,
}

impl BankState {
    fn apply(&mut self, snapshot: &BankSnapshot) {
        *self = BankState::from(snapshot);
    }
}

impl From<&BankSnapshot> for BankState {
    fn from(snapshot: &BankSnapshot) -> Self {
        Self {
            balance: snapshot.balance,
            total_income: snapshot.total_income,
            total_expenses: snapshot.total_expenses,
            monthly_income: snapshot.monthly_income,
            credit: snapshot.credit,
            max_credit: snapshot.max_credit,
            transfers: snapshot.transfers.clone(),
            revision: snapshot.revision,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BankEvent {
    Change(BankState),
    Error(SyncError),
}

#[derive(Clone)]
pub struct BankCore {
    inner: Arc<Inner>,
}

struct Local {
    state: BankState,
    last_mutation: Option<Instant>,
}

struct Inner {
    bank: BankApi,
    rooms: RoomApi,
    identity: UserIdentity,
    room_id: Uuid,
    config: SyncConfig,
    local: Mutex<Local>,
    refreshing: AtomicBool,
    /// Serializes optimistic operations
    op_lock: Mutex<()>,
    op_pending: AtomicBool,
    polling: AtomicBool,
    cancel: CancellationToken,
    events: EventBus<BankEvent>,
}

impl BankCore {
    pub fn new(
        api: Arc<dyn RawApiPort>,
        identity: UserIdentity,
        room_id: Uuid,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                bank: BankApi::new(api.clone()),
                rooms: RoomApi::new(api),
                identity,
                room_id,
                config,
                local: Mutex::new(Local {
                    state: BankState::default(),
                    last_mutation: None,
                }),
                refreshing: AtomicBool::new(false),
                op_lock: Mutex::new(()),
                op_pending: AtomicBool::new(false),
                polling: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                events: EventBus::new(),
            }),
        }
    }

    pub async fn state(&self) -> BankState {
        self.inner.local.lock().await.state.clone()
    }

    pub async fn subscribe(&self, callback: impl FnMut(BankEvent) + Send + 'static) {
        self.inner.events.subscribe(callback).await;
    }

    /// Fetch the account and reconcile it with local state.
    ///
    /// `force` applies the server snapshot unconditionally.
    pub async fn load_from_server(&self, force: bool) -> Result<RefreshOutcome, SyncError> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Skipped);
        }
        let Some(_latch) = Latch::try_acquire(&inner.refreshing) else {
            return Ok(RefreshOutcome::Skipped);
        };

        let snapshot = match inner
            .bank
            .balance(&inner.identity.username, inner.room_id)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail(SyncError::Fetch(e)).await),
        };
        if inner.cancel.is_cancelled() {
            return Ok(RefreshOutcome::Skipped);
        }

        let applied = {
            let mut local = inner.local.lock().await;
            let decision = if !force && inner.op_pending.load(Ordering::Acquire) {
                Decision::KeepLocal
            } else {
                reconcile::decide(
                    &local.state,
                    &snapshot,
                    local.last_mutation,
                    Instant::now(),
                    force,
                )
            };
            match decision {
                Decision::Apply => {
                    local.state.apply(&snapshot);
                    Some(local.state.clone())
                }
                Decision::KeepLocal => None,
            }
        };

        match applied {
            Some(state) => {
                inner.events.dispatch(BankEvent::Change(state)).await;
                Ok(RefreshOutcome::Applied)
            }
            None => {
                tracing::debug!(
                    room_id = %inner.room_id,
                    incoming_balance = snapshot.balance,
                    incoming_revision = ?snapshot.revision,
                    "Keeping local bank state"
                );
                Ok(RefreshOutcome::Stale)
            }
        }
    }

    /// Send `amount` to the player named `to`.
    pub async fn transfer(
        &self,
        to: &str,
        amount: i64,
        description: &str,
    ) -> Result<BankState, SyncError> {
        let inner = &self.inner;
        self.optimistic(
            "transfer",
            |state| {
                if to.trim().eq_ignore_ascii_case(inner.identity.username.trim()) {
                    return Err(SyncError::Rejected(
                        "Cannot transfer money to yourself".to_string(),
                    ));
                }
                ensure_positive(amount)?;
                if amount > state.balance {
                    return Err(SyncError::Rejected(format!(
                        "Insufficient funds: balance {}, requested {}",
                        state.balance, amount
                    )));
                }
                state.balance -= amount;
                state.total_expenses += amount;
                Ok(())
            },
            inner.bank.transfer(
                inner.room_id,
                &inner.identity.username,
                to,
                amount,
                description,
            ),
        )
        .await
    }

    pub async fn take_credit(&self, amount: i64) -> Result<BankState, SyncError> {
        let inner = &self.inner;
        let terms = inner.config;
        self.optimistic(
            "take credit",
            |state| {
                ensure_credit_amount(amount, &terms)?;
                if state.credit.saturating_add(amount) > state.max_credit {
                    return Err(SyncError::Rejected(format!(
                        "Credit limit exceeded: {} of {} already used",
                        state.credit, state.max_credit
                    )));
                }
                state.credit += amount;
                state.balance += amount;
                state.monthly_income -= terms.credit_payment(amount);
                Ok(())
            },
            inner
                .bank
                .take_credit(inner.room_id, &inner.identity.username, amount),
        )
        .await
    }

    pub async fn payoff_credit(&self, amount: i64) -> Result<BankState, SyncError> {
        let inner = &self.inner;
        let terms = inner.config;
        self.optimistic(
            "pay off credit",
            |state| {
                ensure_credit_amount(amount, &terms)?;
                if amount > state.credit {
                    return Err(SyncError::Rejected(format!(
                        "Cannot pay off {} with only {} credit outstanding",
                        amount, state.credit
                    )));
                }
                if amount > state.balance {
                    return Err(SyncError::Rejected(format!(
                        "Insufficient funds: balance {}, requested {}",
                        state.balance, amount
                    )));
                }
                state.credit -= amount;
                state.balance -= amount;
                state.monthly_income += terms.credit_payment(amount);
                Ok(())
            },
            inner
                .rooms
                .payoff_credit(inner.room_id, &inner.identity.id, amount),
        )
        .await
    }

    /// Poll every `poll_interval` until [`destroy`](Self::destroy).
    pub fn start_polling(&self) {
        if self.inner.polling.swap(true, Ordering::AcqRel) {
            return;
        }
        let core = self.clone();
        spawn_poller(
            self.inner.config.poll_interval,
            self.inner.cancel.clone(),
            move || {
                let core = core.clone();
                async move {
                    let _ = core.load_from_server(false).await;
                }
            },
        );
    }

    pub fn destroy(&self) {
        self.inner.cancel.cancel();
    }

    /// Apply `mutate` locally, then confirm with `call`. The server answer
    /// replaces local state unless it is older; a failed call rolls back.
    async fn optimistic<Fut>(
        &self,
        action: &'static str,
        mutate: impl FnOnce(&mut BankState) -> Result<(), SyncError>,
        call: Fut,
    ) -> Result<BankState, SyncError>
    where
        Fut: Future<Output = Result<BankSnapshot, ApiError>>,
    {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Err(SyncError::Rejected("Bank session has ended".to_string()));
        }
        let _op = inner.op_lock.lock().await;
        let _pending = Latch::try_acquire(&inner.op_pending);

        let mutated = {
            let mut local = inner.local.lock().await;
            let previous = local.state.clone();
            match mutate(&mut local.state) {
                Ok(()) => {
                    local.last_mutation = Some(Instant::now());
                    Ok((previous, local.state.clone()))
                }
                Err(e) => {
                    local.state = previous;
                    Err(e)
                }
            }
        };
        let (previous, optimistic) = match mutated {
            Ok(states) => states,
            Err(e) => return Err(self.fail(e).await),
        };
        inner.events.dispatch(BankEvent::Change(optimistic)).await;

        match call.await {
            Ok(snapshot) => {
                let confirmed = {
                    let mut local = inner.local.lock().await;
                    if !reconcile::is_stale(&local.state, &snapshot) {
                        local.state.apply(&snapshot);
                    }
                    local.state.clone()
                };
                tracing::info!(
                    room_id = %inner.room_id,
                    action,
                    balance = confirmed.balance,
                    "Bank operation confirmed"
                );
                inner
                    .events
                    .dispatch(BankEvent::Change(confirmed.clone()))
                    .await;
                Ok(confirmed)
            }
            Err(e) => {
                inner.local.lock().await.state = previous;
                Err(self.fail(SyncError::action(action)(e)).await)
            }
        }
    }

    async fn fail(&self, error: SyncError) -> SyncError {
        tracing::warn!(room_id = %self.inner.room_id, error = %error, "Bank sync error");
        self.inner
            .events
            .dispatch(BankEvent::Error(error.clone()))
            .await;
        error
    }
}

fn ensure_positive(amount: i64) -> Result<(), SyncError> {
    if amount <= 0 {
        return Err(SyncError::Rejected("Amount must be positive".to_string()));
    }
    Ok(())
}

fn ensure_credit_amount(amount: i64, terms: &SyncConfig) -> Result<(), SyncError> {
    ensure_positive(amount)?;
    if amount % terms.credit_step.max(1) != 0 {
        return Err(SyncError::Rejected(format!(
            "Credit moves in steps of {}",
            terms.credit_step
        )));
    }
    Ok(())
}
