/*!
 * Polling Mutex
 *
 * Mutual exclusion for cooperative async tasks via a single shared slot.
 *
 * # Design: Polling Instead of Wake-on-Release
 *
 * There is no waiter queue and no notification channel. A contended
 * acquirer sleeps for the configured poll period and re-checks; whichever
 * suspended waiter's timer fires first after the slot opens claims it.
 * Consequences:
 * - worst-case latency to notice an opening is one poll period
 * - no FIFO ordering; starvation under sustained contention is possible
 * - releasing is a plain store, never a syscall or wakeup
 *
 * The slot state itself is guarded by a `parking_lot::Mutex` held only
 * across the non-suspending check-then-set, never across an await, so the
 * primitive stays correct on multi-threaded schedulers too.
 */

use parking_lot::Mutex;
use smartstring::alias::String as SmartString;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::PollConfig;
use crate::ticket::Ticket;

/// Shared slot plus diagnostic labels
///
/// `last_owner`/`last_disowner` are never consulted by correctness logic.
#[derive(Debug, Default)]
struct SlotState {
    slot: Option<Ticket>,
    last_owner: Option<SmartString>,
    last_disowner: Option<SmartString>,
}

/// Polling mutex over a single shared slot
///
/// The slot is either open (`None`) or closed with the [`Ticket`] of the
/// current claim. Ownership is relaxed: `release` is accepted from anyone,
/// including on an already-open lock.
///
/// # Examples
///
/// ```
/// # async fn demo() {
/// use pollsync::PollLock;
///
/// let lock = PollLock::new();
/// let ticket = lock.acquire("worker-1").await;
/// assert!(lock.is_locked());
/// lock.release("worker-1");
/// # let _ = ticket;
/// # }
/// ```
#[derive(Debug)]
pub struct PollLock {
    state: Mutex<SlotState>,
    poll_period: Duration,
}

impl PollLock {
    /// Create an open lock with the default poll period
    pub fn new() -> Self {
        Self::with_config(PollConfig::default())
    }

    /// Create an open lock with an explicit poll period
    pub fn with_poll_period(poll_period: Duration) -> Self {
        Self::with_config(PollConfig::new(poll_period))
    }

    /// Create an open lock from a [`PollConfig`]
    pub fn with_config(config: PollConfig) -> Self {
        Self {
            state: Mutex::new(SlotState::default()),
            poll_period: config.poll_period,
        }
    }

    /// Whether the slot is currently claimed
    ///
    /// Pure query, no side effect. True iff `try_acquire` would return `None`.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.lock().slot.is_some()
    }

    /// Claim the slot if it is open
    ///
    /// Returns the claim ticket, or `None` (with no side effect) if the
    /// slot is already claimed.
    pub fn try_acquire(&self, owner: &str) -> Option<Ticket> {
        let mut state = self.state.lock();
        if state.slot.is_some() {
            return None;
        }

        let ticket = Ticket::now();
        state.slot = Some(ticket);
        state.last_owner = Some(SmartString::from(owner));
        drop(state);

        trace!("slot claimed by {}", owner);
        Some(ticket)
    }

    /// Claim the slot, suspending until it opens
    ///
    /// While the slot is claimed, sleeps for the poll period and re-checks.
    /// The sleep is the only suspension point; on first observation of an
    /// open slot the claim happens with no further yield. An uncontended
    /// call completes without suspending at all.
    ///
    /// Dropping the returned future before completion is safe: nothing is
    /// claimed until it resolves.
    pub async fn acquire(&self, owner: &str) -> Ticket {
        let mut contended = false;
        loop {
            if let Some(ticket) = self.try_acquire(owner) {
                if contended {
                    debug!("{} claimed slot after contention", owner);
                }
                return ticket;
            }
            contended = true;
            trace!("slot busy, {} re-polling in {:?}", owner, self.poll_period);
            tokio::time::sleep(self.poll_period).await;
        }
    }

    /// Claim the slot and release it when the returned guard drops
    ///
    /// The guard releases on every exit path, including unwinding, which
    /// makes it the right shape for protecting fallible critical sections.
    pub async fn acquire_scoped(&self, owner: &str) -> SlotGuard<'_> {
        let ticket = self.acquire(owner).await;
        SlotGuard {
            lock: self,
            label: SmartString::from(owner),
            ticket,
        }
    }

    /// Open the slot unconditionally
    ///
    /// No check that the releaser matches the current owner: releasing an
    /// already-open lock, or a lock claimed by someone else, is accepted
    /// silently. Only the diagnostic label records who released.
    pub fn release(&self, disowner: &str) {
        let mut state = self.state.lock();
        let was_held = state.slot.take().is_some();
        state.last_disowner = Some(SmartString::from(disowner));
        drop(state);

        if was_held {
            trace!("slot released by {}", disowner);
        } else {
            trace!("release by {} on open slot", disowner);
        }
    }

    /// Configured delay between re-check attempts
    #[inline]
    pub fn poll_period(&self) -> Duration {
        self.poll_period
    }

    /// Label of the last successful claimant, for diagnostics
    pub fn last_owner(&self) -> Option<String> {
        self.state.lock().last_owner.as_ref().map(|s| s.to_string())
    }

    /// Label of the last releaser, for diagnostics
    pub fn last_disowner(&self) -> Option<String> {
        self.state
            .lock()
            .last_disowner
            .as_ref()
            .map(|s| s.to_string())
    }
}

impl Default for PollLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped claim on a [`PollLock`]
///
/// Releases the slot on drop, labeled with the owner that acquired it.
pub struct SlotGuard<'a> {
    lock: &'a PollLock,
    label: SmartString,
    ticket: Ticket,
}

impl SlotGuard<'_> {
    /// Ticket of the claim this guard holds
    #[inline]
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(&self.label);
    }
}
