use jalwa_types::{Round, RoundStatus};
use std::time::Duration;

/// Default pre-lock window. A conservative placeholder until confirmed
/// against the real backend; override via [`RoundClock::new`].
pub const DEFAULT_LOCK_BUFFER: Duration = Duration::from_secs(5);

/// Derives remaining time and lock state from a round's window and the
/// current wall-clock time. Stateless; recomputed each tick.
///
/// `is_locked` is a client-side pre-check used to disable betting early.
/// The authoritative lock and settlement decisions are server-side.
#[derive(Clone, Copy, Debug)]
pub struct RoundClock {
    lock_buffer: Duration,
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_BUFFER)
    }
}

impl RoundClock {
    pub fn new(lock_buffer: Duration) -> Self {
        Self { lock_buffer }
    }

    /// Time left in the round's window, zero once `ends_at` has passed.
    pub fn remaining(&self, round: &Round, now_ms: u64) -> Duration {
        Duration::from_millis(round.ends_at.saturating_sub(now_ms))
    }

    /// Whether bets should be refused. An Open round whose window has
    /// already passed (clock skew, backend lag) counts as locked: no-bet is
    /// the conservative default.
    pub fn is_locked(&self, round: &Round, now_ms: u64) -> bool {
        round.status != RoundStatus::Open || self.remaining(round, now_ms) <= self.lock_buffer
    }
}
