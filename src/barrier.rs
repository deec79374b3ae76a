/*!
 * Rendezvous Gate
 *
 * Binary open/closed barrier: any number of waiters pause at a closed
 * gate and all pass once it opens. Built over an owned [`PollLock`]; the
 * raw acquire/release surface stays private so the gate can only be
 * driven through `close`/`open`/`enter`.
 */

use tracing::debug;

use crate::config::PollConfig;
use crate::lock::PollLock;

const CLOSE_LABEL: &str = "barrier::close";
const OPEN_LABEL: &str = "barrier::open";
const ENTER_LABEL: &str = "barrier::enter";

/// Binary open/closed gate over an owned [`PollLock`]
///
/// State machine: `close()` moves OPEN to CLOSED, `open()` moves CLOSED
/// back to OPEN. `enter()` causes no externally visible transition, and
/// there is no terminal state.
///
/// # Examples
///
/// ```
/// # async fn demo() {
/// use pollsync::Barrier;
///
/// let gate = Barrier::closed();
/// // ... waiters call gate.enter().await and suspend ...
/// gate.open(); // every pending enter() now completes
/// # }
/// ```
#[derive(Debug)]
pub struct Barrier {
    lock: PollLock,
}

impl Barrier {
    /// Create an open gate with the default poll period
    pub fn new() -> Self {
        Self::with_config(PollConfig::default())
    }

    /// Create an open gate from a [`PollConfig`]
    pub fn with_config(config: PollConfig) -> Self {
        Self {
            lock: PollLock::with_config(config),
        }
    }

    /// Create a gate that starts closed
    pub fn closed() -> Self {
        Self::closed_with_config(PollConfig::default())
    }

    /// Create a gate that starts closed, from a [`PollConfig`]
    pub fn closed_with_config(config: PollConfig) -> Self {
        let gate = Self::with_config(config);
        // A fresh slot cannot be contended, so the claim is immediate
        let _claimed = gate.lock.try_acquire(CLOSE_LABEL).is_some();
        debug_assert!(_claimed);
        gate
    }

    /// Whether the gate is currently closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.lock.is_locked()
    }

    /// Close the gate
    ///
    /// Claims the underlying slot. Immediate when the gate is open;
    /// closing an already-closed gate suspends until someone opens it.
    pub async fn close(&self) {
        self.lock.acquire(CLOSE_LABEL).await;
        debug!("gate closed");
    }

    /// Open the gate, letting every waiter through
    pub fn open(&self) {
        self.lock.release(OPEN_LABEL);
        debug!("gate opened");
    }

    /// Pass through the gate, suspending while it is closed
    ///
    /// Claims the slot and releases it immediately, with the release
    /// guaranteed even if the caller unwinds in between. Passing through
    /// never re-closes the gate, so once open, concurrent `enter()` calls
    /// do not serialize against one another.
    pub async fn enter(&self) {
        let _slot = self.lock.acquire_scoped(ENTER_LABEL).await;
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}
