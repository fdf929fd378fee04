//! Timestamp list for one channel kind.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

/// Multiple of the quota at which `record` forces cleanup.
pub(crate) const SAFETY_CAP_FACTOR: usize = 10;

/// Recent send timestamps for one channel kind.
///
/// After `prune(now)` every retained timestamp lies in `(now - window, now]`.
/// The list never holds more than `cap()` entries.
#[derive(Debug, Clone)]
pub(crate) struct RateWindow {
    timestamps: VecDeque<DateTime<Utc>>,
    quota: u32,
    window: Duration,
}

impl RateWindow {
    pub(crate) fn new(quota: u32, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::new(),
            quota,
            window,
        }
    }

    pub(crate) fn quota(&self) -> u32 {
        self.quota
    }

    pub(crate) fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub(crate) fn cap(&self) -> usize {
        (self.quota as usize)
            .saturating_mul(SAFETY_CAP_FACTOR)
            .max(1)
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Drop timestamps outside the window ending at `now`.
    pub(crate) fn prune(&mut self, now: DateTime<Utc>) {
        let start = self.window_start(now);
        self.timestamps.retain(|ts| *ts > start && *ts <= now);
    }

    /// Timestamps newer than the window start. Does not mutate.
    pub(crate) fn active(&self, now: DateTime<Utc>) -> usize {
        let start = self.window_start(now);
        self.timestamps
            .iter()
            .filter(|ts| **ts > start && **ts <= now)
            .count()
    }

    pub(crate) fn admits(&mut self, now: DateTime<Utc>) -> bool {
        self.prune(now);
        (self.timestamps.len() as u64) < u64::from(self.quota)
    }

    pub(crate) fn remaining(&self, now: DateTime<Utc>) -> u32 {
        let active = u32::try_from(self.active(now)).unwrap_or(u32::MAX);
        self.quota.saturating_sub(active)
    }

    /// Append `now`, keeping the list within the safety cap.
    ///
    /// Returns `true` when the oldest entry had to be evicted because
    /// pruning freed nothing.
    pub(crate) fn record(&mut self, now: DateTime<Utc>) -> bool {
        let mut evicted = false;
        if self.timestamps.len() >= self.cap() {
            self.prune(now);
            while self.timestamps.len() >= self.cap() {
                self.timestamps.pop_front();
                evicted = true;
            }
        }
        self.timestamps.push_back(now);
        self.prune(now);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn prune_keeps_only_window() {
        let mut window = RateWindow::new(5, Duration::hours(1));
        window.record(at_ms(0));
        window.record(at_ms(1_800_000));
        window.prune(at_ms(3_600_000));
        // t=0 sits exactly on the window start and is excluded.
        assert_eq!(window.len(), 1);
        window.prune(at_ms(5_400_001));
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn remaining_is_read_only() {
        let mut window = RateWindow::new(3, Duration::hours(1));
        window.record(at_ms(0));
        let later = at_ms(7_200_000);
        assert_eq!(window.remaining(later), 3);
        assert_eq!(window.remaining(later), 3);
        assert_eq!(window.len(), 1, "remaining must not prune");
    }

    #[test]
    fn cap_is_ten_times_quota_and_never_zero() {
        assert_eq!(RateWindow::new(4, Duration::hours(1)).cap(), 40);
        assert_eq!(RateWindow::new(0, Duration::hours(1)).cap(), 1);
    }

    #[test]
    fn record_evicts_oldest_when_nothing_is_stale() {
        let mut window = RateWindow::new(2, Duration::hours(1));
        let now = at_ms(1_000);
        let mut evictions = 0;
        for _ in 0..50 {
            if window.record(now) {
                evictions += 1;
            }
        }
        assert_eq!(window.len(), 20);
        assert_eq!(evictions, 30);
    }

    #[test]
    fn record_prefers_pruning_over_eviction() {
        let mut window = RateWindow::new(1, Duration::seconds(10));
        for i in 0..10 {
            window.record(at_ms(i * 1_000));
        }
        // Far in the future everything is stale, so no eviction is needed.
        assert!(!window.record(at_ms(60_000)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn zero_quota_never_admits() {
        let mut window = RateWindow::new(0, Duration::hours(1));
        assert!(!window.admits(at_ms(0)));
        assert_eq!(window.remaining(at_ms(0)), 0);
    }
}
