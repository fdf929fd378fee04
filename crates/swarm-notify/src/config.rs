//! Escalation configuration.
//!
//! Built once at startup, either programmatically or from `SWARM_NOTIFY_*`
//! environment variables, and never mutated afterwards.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rate_limit::{RateLimitConfig, WindowConfig};
use crate::transport::retry::RetryPolicy;
use crate::transport::types::is_phone_address;

pub const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_SMS_PER_HOUR: u32 = 10;
pub const DEFAULT_VOICE_PER_DAY: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_API_TOKEN: &str = "SWARM_NOTIFY_API_TOKEN";
const ENV_BASE_URL: &str = "SWARM_NOTIFY_BASE_URL";
const ENV_FROM_NUMBER: &str = "SWARM_NOTIFY_FROM_NUMBER";
const ENV_ASSISTANT_ID: &str = "SWARM_NOTIFY_ASSISTANT_ID";
const ENV_CONTACT: &str = "SWARM_NOTIFY_CONTACT";
const ENV_SMS_PER_HOUR: &str = "SWARM_NOTIFY_SMS_PER_HOUR";
const ENV_VOICE_PER_DAY: &str = "SWARM_NOTIFY_VOICE_PER_DAY";
const ENV_ISSUE_URL: &str = "SWARM_NOTIFY_ISSUE_URL";
const ENV_MAX_ATTEMPTS: &str = "SWARM_NOTIFY_MAX_ATTEMPTS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "SWARM_NOTIFY_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Provider credentials and default identities.
///
/// Owned by the messaging client. The token never appears in `Debug`
/// output or in serialized form.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Bearer token for the provider API. Read on deserialize only.
    #[serde(default, skip_serializing)]
    pub auth_token: String,
    /// Provider endpoint; request paths are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Originating number for text messages.
    #[serde(default)]
    pub from_number: Option<String>,
    /// Responder identity used for voice calls.
    #[serde(default)]
    pub assistant_id: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ChannelConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            base_url: default_base_url(),
            from_number: None,
            assistant_id: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_from_number(mut self, from_number: impl Into<String>) -> Self {
        self.from_number = Some(from_number.into());
        self
    }

    pub fn with_assistant(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = Some(assistant_id.into());
        self
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("auth_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("from_number", &self.from_number)
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

/// Everything the escalation stack needs for one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub channel: ChannelConfig,
    /// Emergency contact reached on every channel.
    pub contact: String,
    pub sms_per_hour: u32,
    pub voice_per_day: u32,
    /// Base URL for issue deep links; the issue number is appended.
    #[serde(default)]
    pub issue_url_base: Option<String>,
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

impl NotifyConfig {
    pub fn new(channel: ChannelConfig, contact: impl Into<String>) -> Self {
        Self {
            channel,
            contact: contact.into(),
            sms_per_hour: DEFAULT_SMS_PER_HOUR,
            voice_per_day: DEFAULT_VOICE_PER_DAY,
            issue_url_base: None,
            max_attempts: RetryPolicy::default().max_attempts,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load from `SWARM_NOTIFY_*` environment variables and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let auth_token = get(ENV_API_TOKEN).ok_or(ConfigError::Missing(ENV_API_TOKEN))?;
        let contact = get(ENV_CONTACT).ok_or(ConfigError::Missing(ENV_CONTACT))?;

        let mut channel = ChannelConfig::new(auth_token);
        if let Some(base_url) = get(ENV_BASE_URL) {
            channel.base_url = base_url;
        }
        channel.from_number = get(ENV_FROM_NUMBER);
        channel.assistant_id = get(ENV_ASSISTANT_ID);

        let mut config = Self::new(channel, contact);
        config.issue_url_base = get(ENV_ISSUE_URL);
        if let Some(raw) = get(ENV_SMS_PER_HOUR) {
            config.sms_per_hour = parse_number(ENV_SMS_PER_HOUR, &raw)?;
        }
        if let Some(raw) = get(ENV_VOICE_PER_DAY) {
            config.voice_per_day = parse_number(ENV_VOICE_PER_DAY, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_ATTEMPTS) {
            config.max_attempts = parse_number(ENV_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout =
                Duration::from_secs(parse_number(ENV_REQUEST_TIMEOUT_SECS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.auth_token.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_API_TOKEN));
        }
        if !is_phone_address(&self.contact) {
            return Err(ConfigError::Invalid {
                key: ENV_CONTACT,
                message: format!("'{}' is not an international phone number", self.contact),
            });
        }
        if let Some(from) = &self.channel.from_number {
            if !is_phone_address(from) {
                return Err(ConfigError::Invalid {
                    key: ENV_FROM_NUMBER,
                    message: format!("'{from}' is not an international phone number"),
                });
            }
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_MAX_ATTEMPTS,
                message: "at least one attempt is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn rate_limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            high_frequency: WindowConfig::per_hour(self.sms_per_hour),
            low_frequency: WindowConfig::per_day(self.voice_per_day),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            ..RetryPolicy::default()
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{raw}': {e}"),
    })
}
