use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep_until};

/// Per-exchange request spacing.
///
/// Every request to a venue reserves the next free slot, then
/// waits for it. Slots are `min_interval` apart, so concurrent
/// tasks for the same exchange queue up behind one another
/// instead of bursting.
///
/// Each adapter owns exactly one limiter; it is never shared
/// between exchanges.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until this caller may send its request.
    ///
    /// The lock is only held while reserving the slot, not while
    /// sleeping. A caller cancelled mid-wait still consumes its slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.min_interval;
            slot
        };
        sleep_until(slot).await;
    }
}
