// =============================================================================
// Request Pacer — spaces out calls to the market-data provider
// =============================================================================
//
// The public quote endpoints answer bursts with HTTP 429. Every request first
// reserves the next free slot (at least `min_spacing` after the previous one)
// and sleeps until it arrives. Counters are atomic so any task may read them
// lock-free.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Thread-safe request pacer.
pub struct RequestPacer {
    min_spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
    requests_sent: AtomicU64,
    throttled: AtomicU64,
}

/// Immutable snapshot of the pacer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacerSnapshot {
    pub requests_sent: u64,
    pub throttled: u64,
}

impl RequestPacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            next_slot: Mutex::new(None),
            requests_sent: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
        }
    }

    /// Wait for the next free request slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.min_spacing);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "pacing provider request");
        }
        tokio::time::sleep_until(slot).await;
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an HTTP 429 from the provider.
    pub fn record_throttled(&self) {
        let total = self.throttled.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(throttled_total = total, "provider throttled a request");
    }

    pub fn snapshot(&self) -> PacerSnapshot {
        PacerSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("min_spacing", &self.min_spacing)
            .field("requests_sent", &self.requests_sent.load(Ordering::Relaxed))
            .field("throttled", &self.throttled.load(Ordering::Relaxed))
            .finish()
    }
}
