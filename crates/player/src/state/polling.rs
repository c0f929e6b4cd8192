//! Shared refresh plumbing: the single-flight latch and the poll timer.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default interval between background refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// Credit is taken and repaid in multiples of this amount
    pub credit_step: i64,
    /// Monthly income lost per credit step held
    pub credit_payment_per_step: i64,
}

impl SyncConfig {
    /// Change in monthly income for `amount` of credit.
    pub fn credit_payment(&self, amount: i64) -> i64 {
        amount / self.credit_step.max(1) * self.credit_payment_per_step
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            credit_step: 1000,
            credit_payment_per_step: 100,
        }
    }
}

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The server snapshot replaced local state.
    Applied,
    /// The server snapshot was older than local state and was dropped.
    Stale,
    /// Another refresh was in flight, or the state was destroyed. No request was sent.
    Skipped,
}

/// Held while a refresh is in flight; releases the flag on drop.
pub(crate) struct Latch<'a>(&'a AtomicBool);

impl<'a> Latch<'a> {
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Latch(flag))
    }
}

impl Drop for Latch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run `tick` every `period` until `cancel` fires. The first tick waits one
/// full period; ticks missed while `tick` runs are skipped.
pub(crate) fn spawn_poller<F, Fut>(period: Duration, cancel: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            tick().await;
        }
    });
}
