//! Rate Limiter: sliding-window quotas per channel kind
//!
//! Two independent windows, keyed only by channel kind. The limiter knows
//! nothing about escalations; callers map their channels onto a kind.
//!
//! ```text
//! can_send(kind)   prune stale → count < quota
//! record(kind)     [at cap → prune → still at cap → evict oldest] → append → prune
//! remaining(kind)  quota − active count, no mutation
//! ```
//!
//! State is in-memory and owned by a single process. Deployments that run
//! several instances must put a shared atomic counter behind [`QuotaStore`].

mod limiter;
mod window;

use std::fmt;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub use limiter::{RateLimitSnapshot, SlidingWindowLimiter, WindowSnapshot};

/// Category of outbound medium with its own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Cheap, frequent channel (text messages).
    HighFrequency,
    /// Expensive, rare channel (voice calls).
    LowFrequency,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighFrequency => write!(f, "high_frequency"),
            Self::LowFrequency => write!(f, "low_frequency"),
        }
    }
}

/// Quota and window length for one channel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Maximum sends admitted within any trailing `window`.
    pub quota: u32,
    /// Length of the trailing interval.
    pub window: Duration,
}

impl WindowConfig {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self { quota, window }
    }

    pub fn per_hour(quota: u32) -> Self {
        Self::new(quota, Duration::hours(1))
    }

    pub fn per_day(quota: u32) -> Self {
        Self::new(quota, Duration::hours(24))
    }
}

/// Windows for both channel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Text messages; hourly by default.
    pub high_frequency: WindowConfig,
    /// Voice calls; daily by default.
    pub low_frequency: WindowConfig,
}

/// Admission interface shared by the in-process limiter and any external
/// counter service.
///
/// `can_send` may prune; `remaining` must not change state.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn can_send(&self, kind: ChannelKind) -> bool;

    async fn record(&self, kind: ChannelKind);

    async fn remaining(&self, kind: ChannelKind) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_presets() {
        assert_eq!(WindowConfig::per_hour(10).window, Duration::seconds(3600));
        assert_eq!(WindowConfig::per_day(3).window, Duration::seconds(86_400));
        assert_eq!(WindowConfig::per_day(3).quota, 3);
    }

    #[test]
    fn kind_display_matches_serde() {
        for kind in [ChannelKind::HighFrequency, ChannelKind::LowFrequency] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
