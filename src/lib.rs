/*!
 * Pollsync
 * Cooperative synchronization primitives for interleaved async tasks
 *
 * Mutual exclusion and rendezvous without OS blocking: a waiter suspends
 * on a timed sleep and re-checks, yielding the scheduler to other tasks
 * in between. Built for workloads where logical tasks interleave on a
 * cooperative runtime and a full wake-on-release channel is overkill.
 *
 * # Primitives
 *
 * - [`PollLock`]: polling mutex over a single shared slot
 * - [`Guard`]: double-checked, predicate-gated at-most-once execution
 * - [`Barrier`]: binary open/closed gate any number of waiters can pass
 */

pub mod barrier;
pub mod config;
pub mod guard;
pub mod lock;
pub mod ticket;

// Re-exports
pub use barrier::Barrier;
pub use config::{PollConfig, DEFAULT_POLL_PERIOD};
pub use guard::Guard;
pub use lock::{PollLock, SlotGuard};
pub use ticket::Ticket;
