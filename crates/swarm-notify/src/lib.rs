//! Human escalation for the swarm.
//!
//! When an agent gets stuck on something it cannot resolve, the host hands
//! an [`EscalationEvent`] to an [`EscalationManager`], which picks channels
//! by severity, checks quotas, and reports a single [`EscalationOutcome`].

pub mod config;
pub mod escalation;
pub mod rate_limit;
pub mod transport;

pub use config::{ChannelConfig, ConfigError, NotifyConfig};
pub use escalation::{
    Channel, EscalationEvent, EscalationManager, EscalationOutcome, MessageComposer, Severity,
};
pub use rate_limit::{ChannelKind, QuotaStore, RateLimitConfig, SlidingWindowLimiter, WindowConfig};
pub use transport::{MessagingClient, Notifier, RetryPolicy, SendReceipt, TransportError};
