//! Escalation Manager: turns one event into channel attempts
//!
//! ```text
//! P0 Critical ─ SMS (gated) ─┬─ rate limited → failed, no request
//!                            ├─ error        → failed with provider message
//!                            └─ sent ─ voice (gated, best effort)
//!                                        ├─ sent   → "sms+voice"
//!                                        └─ failed → "sms", still success
//! P1 High     ─ SMS (gated), nothing else
//! P2/P3       ─ email fallback, label always "email"
//! ```
//!
//! Every path returns an [`EscalationOutcome`]; channel errors are converted
//! at the attempt boundary.
//!
//! Admission check, send, and quota charge for one channel kind run under
//! that kind's async gate, so concurrent escalations sharing a manager can
//! never admit more sends than the window allows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use super::compose::MessageComposer;
use super::event::{Channel, ChannelError, EscalationEvent, EscalationOutcome, Severity};
use crate::config::NotifyConfig;
use crate::rate_limit::{ChannelKind, QuotaStore, SlidingWindowLimiter};
use crate::transport::{MessagingClient, Notifier, SendReceipt, TransportError, TransportResult};

/// Label reported when both P0 channels delivered.
pub const SMS_AND_VOICE: &str = "sms+voice";

/// Long-lived escalation front end: one notifier, one quota store.
pub struct EscalationManager {
    notifier: Arc<dyn Notifier>,
    quotas: Arc<dyn QuotaStore>,
    composer: MessageComposer,
    contact: String,
    call_recording: Option<bool>,
    /// Held across check → send → record for text messages.
    high_frequency_gate: Mutex<()>,
    /// Same, for voice calls.
    low_frequency_gate: Mutex<()>,
}

impl EscalationManager {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        quotas: Arc<dyn QuotaStore>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            quotas,
            composer: MessageComposer::default(),
            contact: contact.into(),
            call_recording: None,
            high_frequency_gate: Mutex::new(()),
            low_frequency_gate: Mutex::new(()),
        }
    }

    /// Wire the HTTP client and in-process limiter from configuration.
    pub fn from_config(config: &NotifyConfig) -> TransportResult<Self> {
        config
            .validate()
            .map_err(|e| TransportError::configuration(e.to_string()))?;

        let client = MessagingClient::new(config.channel.clone())?
            .with_retry_policy(config.retry_policy())
            .with_request_timeout(config.request_timeout);
        let limiter = SlidingWindowLimiter::new(config.rate_limits());

        Ok(
            Self::new(Arc::new(client), Arc::new(limiter), config.contact.clone())
                .with_composer(MessageComposer::new(config.issue_url_base.clone())),
        )
    }

    pub fn with_composer(mut self, composer: MessageComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_call_recording(mut self, enabled: bool) -> Self {
        self.call_recording = Some(enabled);
        self
    }

    pub fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    /// Escalate one event. Never fails; the outcome carries the verdict.
    pub async fn escalate(&self, event: &EscalationEvent) -> EscalationOutcome {
        info!(
            issue_id = event.id,
            severity = %event.severity,
            originator = %event.originator,
            "Escalating to human"
        );

        let outcome = match event.severity {
            Severity::Critical => self.escalate_critical(event).await,
            Severity::High => self.escalate_high(event).await,
            Severity::Medium | Severity::Low => self.escalate_fallback(event).await,
        };

        if outcome.success {
            info!(issue_id = event.id, channel = %outcome.channel, "{}", outcome.message);
        } else {
            warn!(issue_id = event.id, channel = %outcome.channel, "{}", outcome.message);
        }
        outcome
    }

    /// Escalate with a deadline. Running out of time is a failed outcome
    /// reported against the tier's first channel.
    pub async fn escalate_with_timeout(
        &self,
        event: &EscalationEvent,
        timeout: Duration,
    ) -> EscalationOutcome {
        match tokio::time::timeout(timeout, self.escalate(event)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let channel = Self::first_channel(event.severity);
                warn!(issue_id = event.id, ?timeout, "Escalation timed out");
                EscalationOutcome::failed(
                    channel.label(),
                    format!("Escalation timed out after {}ms", timeout.as_millis()),
                )
            }
        }
    }

    fn first_channel(severity: Severity) -> Channel {
        match severity {
            Severity::Critical | Severity::High => Channel::Sms,
            Severity::Medium | Severity::Low => Channel::Email,
        }
    }

    async fn escalate_critical(&self, event: &EscalationEvent) -> EscalationOutcome {
        if let Err(err) = self.attempt(Channel::Sms, event).await {
            return Self::primary_failure(Channel::Sms, event, err);
        }

        match self.attempt(Channel::Voice, event).await {
            Ok(_) => EscalationOutcome::delivered(SMS_AND_VOICE, "Escalated via SMS and voice call"),
            Err(err) => {
                warn!(
                    issue_id = event.id,
                    error = %err,
                    "Best-effort voice call failed after SMS was delivered"
                );
                let message = if err.is_rate_limited() {
                    "Escalated via SMS, voice call rate limited"
                } else {
                    "Escalated via SMS, voice call failed"
                };
                EscalationOutcome::delivered(Channel::Sms.label(), message)
            }
        }
    }

    async fn escalate_high(&self, event: &EscalationEvent) -> EscalationOutcome {
        match self.attempt(Channel::Sms, event).await {
            Ok(_) => EscalationOutcome::delivered(Channel::Sms.label(), "Escalated via SMS"),
            Err(err) => Self::primary_failure(Channel::Sms, event, err),
        }
    }

    async fn escalate_fallback(&self, event: &EscalationEvent) -> EscalationOutcome {
        let label = Channel::Email.label();
        match self.attempt(Channel::Email, event).await {
            Ok(_) => EscalationOutcome::delivered(label, "Escalated via Email"),
            Err(ChannelError::Transport(TransportError::NotImplemented { reason, .. })) => {
                EscalationOutcome::failed(label, format!("Email escalation not implemented: {reason}"))
            }
            Err(err) => EscalationOutcome::failed(label, format!("Email escalation failed: {err}")),
        }
    }

    fn primary_failure(
        channel: Channel,
        event: &EscalationEvent,
        err: ChannelError,
    ) -> EscalationOutcome {
        match err {
            limited @ ChannelError::RateLimited { .. } => {
                EscalationOutcome::failed(channel.label(), limited.to_string())
            }
            ChannelError::Transport(err) => {
                error!(
                    issue_id = event.id,
                    %channel,
                    code = err.code(),
                    error = %err,
                    "Primary escalation channel failed"
                );
                EscalationOutcome::failed(
                    channel.label(),
                    format!("{channel} escalation failed: {err}"),
                )
            }
        }
    }

    async fn admission(&self, kind: Option<ChannelKind>) -> Option<MutexGuard<'_, ()>> {
        let gate = match kind? {
            ChannelKind::HighFrequency => &self.high_frequency_gate,
            ChannelKind::LowFrequency => &self.low_frequency_gate,
        };
        Some(gate.lock().await)
    }

    /// One admission-gated send. The quota is charged only once the
    /// provider has accepted the message; the kind's gate stays held until
    /// then.
    async fn attempt(
        &self,
        channel: Channel,
        event: &EscalationEvent,
    ) -> Result<SendReceipt, ChannelError> {
        let kind = channel.kind();
        let _admission = self.admission(kind).await;
        if let Some(kind) = kind {
            if !self.quotas.can_send(kind).await {
                warn!(issue_id = event.id, %channel, %kind, "Rate limit reached, not sending");
                return Err(ChannelError::RateLimited { channel });
            }
        }

        let receipt = match channel {
            Channel::Sms => {
                let body = self.composer.sms(event);
                self.notifier.send_text(&self.contact, &body).await?
            }
            Channel::Voice => {
                let opening = self.composer.voice_opening(event);
                self.notifier
                    .place_voice_call(&self.contact, &opening, self.call_recording)
                    .await?
            }
            Channel::Email => {
                let email = self.composer.email(event);
                self.notifier
                    .send_email(&self.contact, &email.subject, &email.body)
                    .await?
            }
        };

        if let Some(kind) = kind {
            self.quotas.record(kind).await;
        }
        info!(issue_id = event.id, %channel, receipt_id = %receipt.id, "Escalation channel delivered");
        Ok(receipt)
    }
}
