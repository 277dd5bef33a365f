//! Write rate limiting.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default minimum interval between writes of one category.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_secs(1);

/// Kind of write operation. Each kind is limited independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteCategory {
    /// Replies.
    Post,
    /// New topics.
    Topic,
}

impl fmt::Display for WriteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteCategory::Post => "post",
            WriteCategory::Topic => "topic",
        })
    }
}

/// Spaces out writes of the same category.
///
/// Callers wait rather than fail. Concurrent callers each reserve the next
/// free slot, so writes stay at least `min_interval` apart.
#[derive(Debug)]
pub struct WriteRateLimiter {
    min_interval: Duration,
    next_slot: Mutex<HashMap<WriteCategory, Instant>>,
}

impl WriteRateLimiter {
    /// Creates a limiter with the given minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a write of `category` may proceed.
    pub async fn acquire(&self, category: WriteCategory) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.get(&category).map_or(now, |s| (*s).max(now));
            next_slot.insert(category, slot + self.min_interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            debug!(category = %category, wait_ms = u64::try_from((slot - now).as_millis()).unwrap_or(u64::MAX), "Rate limiting write");
            tokio::time::sleep_until(slot).await;
        }
    }
}

impl Default for WriteRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_INTERVAL)
    }
}
