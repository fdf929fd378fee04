//! In-process sliding-window limiter.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::window::RateWindow;
use super::{ChannelKind, QuotaStore, RateLimitConfig};

/// Sliding-window admission control for both channel kinds.
///
/// Each kind has its own lock, so a burst on one kind never blocks the
/// other. State lives in this process only; see [`QuotaStore`] for the
/// shared-counter extension point.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    high_frequency: Mutex<RateWindow>,
    low_frequency: Mutex<RateWindow>,
}

/// Point-in-time view of one kind's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub kind: ChannelKind,
    /// Configured quota for the window.
    pub quota: u32,
    /// Sends still admissible at `taken_at`.
    pub remaining: u32,
    /// Timestamps held in memory, including ones not yet pruned.
    pub tracked: usize,
}

/// Diagnostics for both kinds, taken under each kind's lock in turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    /// Instant the windows were evaluated against.
    pub taken_at: DateTime<Utc>,
    /// Text message window.
    pub high_frequency: WindowSnapshot,
    /// Voice call window.
    pub low_frequency: WindowSnapshot,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            high_frequency: Mutex::new(RateWindow::new(
                config.high_frequency.quota,
                config.high_frequency.window,
            )),
            low_frequency: Mutex::new(RateWindow::new(
                config.low_frequency.quota,
                config.low_frequency.window,
            )),
        }
    }

    fn window(&self, kind: ChannelKind) -> MutexGuard<'_, RateWindow> {
        let lock = match kind {
            ChannelKind::HighFrequency => &self.high_frequency,
            ChannelKind::LowFrequency => &self.low_frequency,
        };
        // A panic while holding the lock cannot leave the list half-written.
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prune, then report whether another send fits under the quota.
    pub fn can_send_at(&self, kind: ChannelKind, now: DateTime<Utc>) -> bool {
        let allowed = self.window(kind).admits(now);
        if !allowed {
            debug!(%kind, "Admission denied");
        }
        allowed
    }

    /// Record a send at `now`.
    pub fn record_at(&self, kind: ChannelKind, now: DateTime<Utc>) {
        let mut window = self.window(kind);
        if window.record(now) {
            warn!(
                %kind,
                cap = window.cap(),
                "Rate window at safety cap with nothing stale; evicted oldest entry"
            );
        }
    }

    /// Sends still available in the window ending at `now`. Read-only.
    pub fn remaining_at(&self, kind: ChannelKind, now: DateTime<Utc>) -> u32 {
        self.window(kind).remaining(now)
    }

    /// Timestamps currently held for `kind`, stale ones included.
    pub fn tracked(&self, kind: ChannelKind) -> usize {
        self.window(kind).len()
    }

    pub fn quota(&self, kind: ChannelKind) -> u32 {
        self.window(kind).quota()
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> RateLimitSnapshot {
        let view = |kind| {
            let window = self.window(kind);
            WindowSnapshot {
                kind,
                quota: window.quota(),
                remaining: window.remaining(now),
                tracked: window.len(),
            }
        };
        RateLimitSnapshot {
            taken_at: now,
            high_frequency: view(ChannelKind::HighFrequency),
            low_frequency: view(ChannelKind::LowFrequency),
        }
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        self.snapshot_at(Utc::now())
    }
}

#[async_trait]
impl QuotaStore for SlidingWindowLimiter {
    async fn can_send(&self, kind: ChannelKind) -> bool {
        self.can_send_at(kind, Utc::now())
    }

    async fn record(&self, kind: ChannelKind) {
        self.record_at(kind, Utc::now())
    }

    async fn remaining(&self, kind: ChannelKind) -> u32 {
        self.remaining_at(kind, Utc::now())
    }
}
