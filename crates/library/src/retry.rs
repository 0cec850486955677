//! Retry policy for remote moves.

use drivesort_storage::error::ErrorKind as StorageErrorKind;
use std::fmt;
use std::time::Duration;

/// Decides whether a failed attempt is worth repeating.
pub type RetryPredicate = fn(&StorageErrorKind) -> bool;

/// Delay before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `initial`, then doubling before every further retry, never above `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the `retry`-th retry (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                initial.saturating_mul(factor).min(max)
            },
        }
    }
}

/// Bounded retry: how many attempts in total, how long to wait in between,
/// and which failures qualify.
///
/// The default is 3 attempts, 3 seconds apart, whatever the failure.
///
/// ```
/// use drivesort_library::{Backoff, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(5, Backoff::Exponential {
///     initial: Duration::from_secs(1),
///     max: Duration::from_secs(10),
/// })
/// .only_retryable_errors();
/// assert_eq!(policy.max_attempts(), 5);
/// assert_eq!(policy.delay_before(4), Duration::from_secs(4));
/// ```
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

    /// `max_attempts` counts the first attempt too; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: |_| true,
        }
    }

    /// A single attempt, never retried.
    pub fn never() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }

    /// Replace the predicate deciding which failures are retried.
    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    /// Only retry failures the storage layer marks as
    /// [retryable](StorageErrorKind::is_retryable), giving up immediately on
    /// things like permission errors.
    pub fn only_retryable_errors(self) -> Self {
        self.with_predicate(StorageErrorKind::is_retryable)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Whether to try again after `attempts` attempts have failed, the last
    /// one with `error`.
    pub fn should_retry(&self, attempts: u32, error: &StorageErrorKind) -> bool {
        attempts < self.max_attempts && (self.retryable)(error)
    }

    /// Delay before attempt number `attempt` (so `attempt >= 2`).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Backoff::Fixed(Self::DEFAULT_DELAY))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
