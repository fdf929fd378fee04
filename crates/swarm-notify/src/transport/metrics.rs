//! Request counters for the messaging client.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::error::TransportError;

/// Lock-free counters shared by every clone of the client.
#[derive(Debug, Default)]
pub struct TransportMetrics {
    requests: AtomicU64,
    successes: AtomicU64,
    retries: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    network_errors: AtomicU64,
}

/// Counter values at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportMetricsSnapshot {
    /// HTTP requests dispatched, retries included.
    pub requests: u64,
    /// Requests answered with 2xx and a decodable body.
    pub successes: u64,
    /// Attempts after the first for the same operation.
    pub retries: u64,
    /// 4xx responses.
    pub client_errors: u64,
    /// 5xx responses.
    pub server_errors: u64,
    /// Connection failures and timeouts.
    pub network_errors: u64,
}

impl TransportMetrics {
    pub(crate) fn record_attempt(&self, attempt: u32) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if attempt > 0 {
            self.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self, err: &TransportError) {
        let counter = match err {
            TransportError::Client { .. } => &self.client_errors,
            TransportError::Server { .. } => &self.server_errors,
            TransportError::Network { .. } => &self.network_errors,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
        }
    }
}
