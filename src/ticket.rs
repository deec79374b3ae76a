/*!
 * Claim Tickets
 *
 * Opaque identifier for a successful slot claim
 */

use std::time::Duration;
use tokio::time::Instant;

/// Proof of a successful slot claim
///
/// Wraps the acquisition timestamp, so tickets from later claims compare
/// greater than tickets from earlier ones. Carries no enforcement
/// semantics: holding a ticket does not gate `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(Instant);

impl Ticket {
    /// Stamp a ticket at the current instant
    pub(crate) fn now() -> Self {
        Self(Instant::now())
    }

    /// When the claim happened
    #[inline]
    pub fn at(&self) -> Instant {
        self.0
    }

    /// How long ago the claim happened
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}
