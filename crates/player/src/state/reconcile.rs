//! Deciding whether a server bank snapshot replaces local state.

use std::time::Duration;

use eom_shared::BankSnapshot;
use tokio::time::Instant;

use super::bank_core::BankState;

/// After a local mutation, a lower server balance is ignored for this long.
pub const PROTECTION_WINDOW: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Apply,
    KeepLocal,
}

/// Reconcile a polled snapshot with local state.
///
/// In order:
/// 1. `force` always applies.
/// 2. When both sides carry a revision, apply iff the incoming one is not older.
/// 3. Otherwise apply iff the incoming balance is higher, the local balance is
///    zero, or the last local mutation is older than [`PROTECTION_WINDOW`].
pub fn decide(
    local: &BankState,
    incoming: &BankSnapshot,
    last_mutation: Option<Instant>,
    now: Instant,
    force: bool,
) -> Decision {
    if force {
        return Decision::Apply;
    }

    if let (Some(local_rev), Some(incoming_rev)) = (local.revision, incoming.revision) {
        return if incoming_rev >= local_rev {
            Decision::Apply
        } else {
            Decision::KeepLocal
        };
    }

    let protection_expired = match last_mutation {
        Some(at) => now.saturating_duration_since(at) > PROTECTION_WINDOW,
        None => true,
    };
    if incoming.balance > local.balance || local.balance == 0 || protection_expired {
        Decision::Apply
    } else {
        Decision::KeepLocal
    }
}

/// True if `incoming` is known to be older than local state.
pub fn is_stale(local: &BankState, incoming: &BankSnapshot) -> bool {
    matches!(
        (local.revision, incoming.revision),
        (Some(local_rev), Some(incoming_rev)) if incoming_rev < local_rev
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::testing::bank_snapshot;

    fn local(balance: i64, revision: Option<u64>) -> BankState {
        BankState {
            balance,
            revision,
            ..BankState::default()
        }
    }

    #[test]
    fn lower_balance_inside_window_keeps_local() {
        let now = Instant::now();
        let decision = decide(
            &local(100, None),
            &bank_snapshot(50, None),
            Some(now - Duration::from_millis(2000)),
            now,
            false,
        );
        assert_eq!(decision, Decision::KeepLocal);
    }

    #[test]
    fn lower_balance_after_window_applies() {
        let now = Instant::now();
        let decision = decide(
            &local(100, None),
            &bank_snapshot(50, None),
            Some(now - Duration::from_millis(5001)),
            now,
            false,
        );
        assert_eq!(decision, Decision::Apply);
    }

    #[test]
    fn higher_balance_or_empty_local_applies() {
        let now = Instant::now();
        let recent = Some(now);
        assert_eq!(
            decide(&local(100, None), &bank_snapshot(150, None), recent, now, false),
            Decision::Apply
        );
        assert_eq!(
            decide(&local(0, None), &bank_snapshot(-1, None), recent, now, false),
            Decision::Apply
        );
    }

    #[test]
    fn never_mutated_applies() {
        let now = Instant::now();
        assert_eq!(
            decide(&local(100, None), &bank_snapshot(50, None), None, now, false),
            Decision::Apply
        );
    }

    #[test]
    fn force_overwrites_in_either_direction() {
        let now = Instant::now();
        for (current, incoming) in [(100, 50), (50, 100)] {
            assert_eq!(
                decide(
                    &local(current, Some(9)),
                    &bank_snapshot(incoming, Some(1)),
                    Some(now),
                    now,
                    true
                ),
                Decision::Apply
            );
        }
    }

    #[test]
    fn revisions_override_the_balance_heuristic() {
        let now = Instant::now();
        // Older revision with a higher balance is still stale.
        assert_eq!(
            decide(&local(100, Some(5)), &bank_snapshot(900, Some(4)), None, now, false),
            Decision::KeepLocal
        );
        // Newer revision with a lower balance applies inside the window.
        assert_eq!(
            decide(&local(100, Some(5)), &bank_snapshot(50, Some(6)), Some(now), now, false),
            Decision::Apply
        );
        // Same revision applies.
        assert_eq!(
            decide(&local(100, Some(5)), &bank_snapshot(50, Some(5)), Some(now), now, false),
            Decision::Apply
        );
    }

    #[test]
    fn staleness_needs_both_revisions() {
        assert!(is_stale(&local(0, Some(3)), &bank_snapshot(0, Some(2))));
        assert!(!is_stale(&local(0, Some(3)), &bank_snapshot(0, Some(3))));
        assert!(!is_stale(&local(0, None), &bank_snapshot(0, Some(1))));
        assert!(!is_stale(&local(0, Some(3)), &bank_snapshot(0, None)));
    }
}
