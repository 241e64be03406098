use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_TIME: AtomicU64 = AtomicU64::new(0);

/// Value of the process-wide modification clock.
///
/// Every call to [`TimeStamp::now`] returns a value strictly greater than all
/// values returned before it, from any thread. Comparing stamps is how the
/// pipeline decides whether an output is stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStamp(u64);

impl TimeStamp {
    /// Older than every stamp handed out by [`TimeStamp::now`].
    pub const NEVER: TimeStamp = TimeStamp(0);

    pub fn now() -> Self {
        TimeStamp(GLOBAL_TIME.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Moves this stamp to the current global time.
    pub fn modified(&mut self) {
        *self = Self::now();
    }

    pub fn value(self) -> u64 {
        self.0
    }
}
