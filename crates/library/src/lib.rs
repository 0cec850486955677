mod category;
mod destination;
pub mod organize;
mod retry;

pub use crate::category::{FileCategory, PHOTO_ROOT, VIDEO_ROOT, classify};
pub use crate::destination::{DestinationPath, resolve_date};
pub use crate::retry::{Backoff, RetryPolicy, RetryPredicate};
use time::UtcOffset;

/// Everything a run needs besides the backend itself.
#[derive(Debug, Clone)]
pub struct Context {
    /// Drive path of the folder to empty, e.g. `/Pictures/Camera Roll`.
    pub source: String,
    /// Offset used to turn timestamps into calendar dates. Resolve it once at
    /// startup; it is not looked up again during a run.
    pub offset: UtcOffset,
    pub retry: RetryPolicy,
}

impl Context {
    /// Context for `source` in UTC with the default [`RetryPolicy`].
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            offset: UtcOffset::UTC,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
