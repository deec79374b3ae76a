/*!
 * Guarded Execution
 *
 * At-most-once execution of an action among competing tasks, gated by an
 * externally observable readiness check.
 *
 * # Design: Double-Checked Acquisition
 *
 * The readiness predicate is evaluated once before acquiring the lock and
 * once more inside the critical section. The second check catches the
 * common race: the condition that motivated waiting was resolved by a
 * different task while this one was suspended, so the action must not run
 * again. Lazy, race-free initialization of a shared value is the typical
 * use.
 */

use smartstring::alias::String as SmartString;
use std::future::Future;
use std::time::Duration;
use tracing::trace;

use crate::config::PollConfig;
use crate::lock::PollLock;

const DEFAULT_NAME: &str = "guard";

/// Predicate-gated execution wrapper over an owned [`PollLock`]
///
/// # Examples
///
/// ```
/// # async fn demo() {
/// use pollsync::Guard;
///
/// let guard = Guard::named("cache-init");
/// let loaded = guard
///     .protect_when(
///         || async { true /* cache still empty? */ },
///         || async { 42 /* fill the cache */ },
///     )
///     .await;
/// # let _ = loaded;
/// # }
/// ```
#[derive(Debug)]
pub struct Guard {
    lock: PollLock,
    name: SmartString,
}

impl Guard {
    /// Create a guard with the default poll period
    pub fn new() -> Self {
        Self::with_config(PollConfig::default())
    }

    /// Create a guard with an explicit poll period
    pub fn with_poll_period(poll_period: Duration) -> Self {
        Self::with_config(PollConfig::new(poll_period))
    }

    /// Create a guard from a [`PollConfig`]
    pub fn with_config(config: PollConfig) -> Self {
        Self {
            lock: PollLock::with_config(config),
            name: SmartString::from(DEFAULT_NAME),
        }
    }

    /// Create a guard whose label appears in the lock diagnostics
    pub fn named(name: &str) -> Self {
        Self {
            name: SmartString::from(name),
            ..Self::new()
        }
    }

    /// Whether the underlying slot is currently claimed
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Run `action` under the lock, unconditionally
    ///
    /// Equivalent to [`protect_when`](Self::protect_when) with an
    /// always-true predicate: always returns `Some`.
    pub async fn protect<A, AFut, T>(&self, action: A) -> Option<T>
    where
        A: FnMut() -> AFut,
        AFut: Future<Output = T>,
    {
        self.protect_when(|| async { true }, action).await
    }

    /// Run `action` at most once, gated by `predicate`
    ///
    /// Loops while the predicate holds: evaluate the predicate (exit with
    /// `None` when false), acquire the lock (suspending as needed),
    /// re-evaluate, and only if still true run the action and return its
    /// result. A post-acquire check that comes back false releases and
    /// starts over.
    ///
    /// The lock is released on every exit path, including when `action`
    /// unwinds. Errors produced by the callables are the caller's to
    /// handle: a fallible action is simply an action returning `Result`,
    /// and nothing here catches-and-retries.
    pub async fn protect_when<P, PFut, A, AFut, T>(
        &self,
        mut predicate: P,
        mut action: A,
    ) -> Option<T>
    where
        P: FnMut() -> PFut,
        PFut: Future<Output = bool>,
        A: FnMut() -> AFut,
        AFut: Future<Output = T>,
    {
        while predicate().await {
            let slot = self.lock.acquire_scoped(&self.name).await;
            if predicate().await {
                let result = action().await;
                drop(slot);
                return Some(result);
            }
            trace!("{}: condition resolved while waiting, re-checking", self.name);
            drop(slot);
        }
        None
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ready_predicate_runs_action_once() {
        let guard = Guard::new();
        let checks = AtomicUsize::new(0);
        let runs = AtomicUsize::new(0);

        let result = guard
            .protect_when(
                || {
                    checks.fetch_add(1, Ordering::Relaxed);
                    async { true }
                },
                || {
                    runs.fetch_add(1, Ordering::Relaxed);
                    async { 42 }
                },
            )
            .await;

        assert_eq!(result, Some(42));
        assert_eq!(runs.load(Ordering::Relaxed), 1);
        // Once before acquiring, once inside the critical section
        assert_eq!(checks.load(Ordering::Relaxed), 2);
        assert!(!guard.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_predicate_never_acquires() {
        let guard = Guard::new();
        let runs = AtomicUsize::new(0);

        let result = guard
            .protect_when(
                || async { false },
                || {
                    runs.fetch_add(1, Ordering::Relaxed);
                    async {}
                },
            )
            .await;

        assert_eq!(result, None);
        assert_eq!(runs.load(Ordering::Relaxed), 0);
        // The lock was never touched
        assert!(guard.lock.last_owner().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn condition_resolved_during_wait_skips_action() {
        let guard = Guard::new();
        let checks = AtomicUsize::new(0);

        // True on the first call, false from then on: the post-acquire
        // double-check sees false, loops, and the pre-acquire check exits.
        let result: Option<()> = guard
            .protect_when(
                || {
                    let n = checks.fetch_add(1, Ordering::Relaxed);
                    async move { n == 0 }
                },
                || async {
                    panic!("action must not run");
                },
            )
            .await;

        assert_eq!(result, None);
        assert_eq!(checks.load(Ordering::Relaxed), 3);
        assert!(!guard.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn competing_initializers_run_action_at_most_once() {
        let guard = Arc::new(Guard::with_config(PollConfig::low_latency()));
        let value = Arc::new(parking_lot::Mutex::new(None::<u32>));
        let runs = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let guard = guard.clone();
                let value = value.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    guard
                        .protect_when(
                            || {
                                let value = value.clone();
                                async move { value.lock().is_none() }
                            },
                            || {
                                let value = value.clone();
                                let runs = runs.clone();
                                async move {
                                    // Hold the slot across a suspension so
                                    // the others must wait it out
                                    tokio::time::sleep(Duration::from_millis(3)).await;
                                    *value.lock() = Some(7);
                                    runs.fetch_add(1, Ordering::Relaxed);
                                }
                            },
                        )
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(runs.load(Ordering::Relaxed), 1);
        assert_eq!(*value.lock(), Some(7));
        assert!(!guard.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn error_from_action_propagates_after_release() {
        let guard = Guard::new();

        let result: Option<Result<(), &str>> =
            guard.protect(|| async { Err("boom") }).await;

        assert_eq!(result, Some(Err("boom")));
        assert!(!guard.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_action_still_releases() {
        let guard = Arc::new(Guard::new());

        let task = tokio::spawn({
            let guard = guard.clone();
            async move {
                guard
                    .protect(|| async {
                        panic!("action failed");
                    })
                    .await
            }
        });

        assert!(task.await.is_err());
        assert!(!guard.is_locked());
    }
}
