//! Escalation inputs, outcomes, and failure types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rate_limit::ChannelKind;
use crate::transport::TransportError;

/// Ordered severity tiers, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "SeverityRepr", into = "u8")]
pub enum Severity {
    /// P0: text plus best-effort voice call.
    Critical,
    /// P1: text only.
    High,
    /// P2: fallback channel.
    Medium,
    /// P3: fallback channel.
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn level(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.level())
    }
}

impl TryFrom<u8> for Severity {
    type Error = EscalationError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::Critical),
            1 => Ok(Self::High),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Low),
            other => Err(EscalationError::UnknownSeverity(other.to_string())),
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

impl FromStr for Severity {
    type Err = EscalationError;

    /// Accepts `P0`..`P3`, bare levels, and tier names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let level = lower.strip_prefix('p').unwrap_or(&lower);
        if let Ok(level) = level.parse::<u8>() {
            return Self::try_from(level).map_err(|_| EscalationError::UnknownSeverity(s.into()));
        }
        Self::ALL
            .into_iter()
            .find(|severity| severity.name() == lower)
            .ok_or_else(|| EscalationError::UnknownSeverity(s.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeverityRepr {
    Level(u8),
    Label(String),
}

impl TryFrom<SeverityRepr> for Severity {
    type Error = EscalationError;

    fn try_from(repr: SeverityRepr) -> Result<Self, Self::Error> {
        match repr {
            SeverityRepr::Level(level) => Self::try_from(level),
            SeverityRepr::Label(label) => label.parse(),
        }
    }
}

/// A condition that needs a human, as reported by the host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationEvent {
    /// Issue number in the tracker.
    pub id: u64,
    pub title: String,
    pub severity: Severity,
    /// Agent or process that raised the escalation.
    pub originator: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_since: Option<DateTime<Utc>>,
}

impl EscalationEvent {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        severity: Severity,
        originator: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            severity,
            originator: originator.into(),
            description: String::new(),
            blocked_since: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_blocked_since(mut self, blocked_since: DateTime<Utc>) -> Self {
        self.blocked_since = Some(blocked_since);
        self
    }
}

/// Outbound channel used for an escalation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Voice,
    Email,
}

impl Channel {
    /// Label reported in outcomes.
    pub fn label(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Voice => "voice",
            Self::Email => "email",
        }
    }

    /// Quota bucket, if the channel is rate limited.
    pub fn kind(self) -> Option<ChannelKind> {
        match self {
            Self::Sms => Some(ChannelKind::HighFrequency),
            Self::Voice => Some(ChannelKind::LowFrequency),
            Self::Email => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sms => write!(f, "SMS"),
            Self::Voice => write!(f, "voice call"),
            Self::Email => write!(f, "Email"),
        }
    }
}

/// Errors surfaced by the escalation layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EscalationError {
    /// The caller supplied a tier outside P0–P3.
    #[error("Unknown severity tier: {0}")]
    UnknownSeverity(String),
}

/// Why a single channel attempt failed.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// Admission denied; no request was made.
    #[error("{channel} rate limit exceeded")]
    RateLimited { channel: Channel },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ChannelError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Uniform result of one escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub success: bool,
    /// Channel label, `+`-joined when several channels delivered.
    pub channel: String,
    pub message: String,
}

impl EscalationOutcome {
    pub fn delivered(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: message.into(),
        }
    }

    pub fn failed(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EscalationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.success { "ok" } else { "failed" };
        write!(f, "[{verdict}] {}: {}", self.channel, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered_by_urgency() {
        assert!(Severity::Critical < Severity::High);
        assert!(Severity::Medium < Severity::Low);
        assert_eq!(Severity::Critical.to_string(), "P0");
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert_eq!(
            Severity::try_from(4),
            Err(EscalationError::UnknownSeverity("4".into()))
        );
    }

    #[test]
    fn severity_parses_common_spellings() {
        assert_eq!("P0".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("p2".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("1".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" LOW ".parse::<Severity>().unwrap(), Severity::Low);
        assert!("P7".parse::<Severity>().is_err());
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn event_deserializes_from_host_json() {
        let event: EscalationEvent = serde_json::from_str(
            r#"{
                "id": 412,
                "title": "Deploy pipeline wedged",
                "severity": "P0",
                "originator": "integrator",
                "blocked_since": "2026-02-01T08:30:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(event.severity, Severity::Critical);
        assert!(event.description.is_empty());
        assert!(event.blocked_since.is_some());

        let event: EscalationEvent = serde_json::from_str(
            r#"{"id":1,"title":"t","severity":3,"originator":"o","description":"d"}"#,
        )
        .unwrap();
        assert_eq!(event.severity, Severity::Low);
        assert_eq!(serde_json::to_value(event.severity).unwrap(), 3);
    }

    #[test]
    fn event_with_unknown_tier_fails_to_parse() {
        let result: Result<EscalationEvent, _> = serde_json::from_str(
            r#"{"id":1,"title":"t","severity":9,"originator":"o"}"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Unknown severity tier"));
    }

    #[test]
    fn channel_maps_to_kind() {
        assert_eq!(Channel::Sms.kind(), Some(ChannelKind::HighFrequency));
        assert_eq!(Channel::Voice.kind(), Some(ChannelKind::LowFrequency));
        assert_eq!(Channel::Email.kind(), None);
    }

    #[test]
    fn rate_limited_message() {
        let err = ChannelError::RateLimited {
            channel: Channel::Sms,
        };
        assert_eq!(err.to_string(), "SMS rate limit exceeded");
        assert!(err.is_rate_limited());
    }
}
