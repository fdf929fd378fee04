//! Severity-tiered human escalation
//!
//! ```text
//! EscalationEvent ──► EscalationManager ──► QuotaStore (admission)
//!                          │                     │
//!                          ├── MessageComposer   │
//!                          └── Notifier ◄────────┘ record on acceptance
//!                                │
//!                                ▼
//!                         EscalationOutcome
//! ```
//!
//! | Tier | Channels                          |
//! |------|-----------------------------------|
//! | P0   | SMS, then best-effort voice call  |
//! | P1   | SMS                               |
//! | P2   | email fallback                    |
//! | P3   | email fallback                    |

pub mod compose;
pub mod event;
pub mod manager;

pub use compose::{EmailMessage, MessageComposer};
pub use event::{
    Channel, ChannelError, EscalationError, EscalationEvent, EscalationOutcome, Severity,
};
pub use manager::{EscalationManager, SMS_AND_VOICE};
