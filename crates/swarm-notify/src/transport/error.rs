//! Transport error taxonomy with retry classification.
//!
//! Every failure the messaging client can produce is represented here.
//! The retry loop asks `is_retryable()` instead of matching on strings.
//!
//! | Variant          | Retryable | Network attempted |
//! |------------------|-----------|-------------------|
//! | Configuration    | no        | no                |
//! | Validation       | no        | no                |
//! | Client (4xx)     | no        | yes               |
//! | Server (5xx)     | yes       | yes               |
//! | Network          | yes       | yes               |
//! | NotImplemented   | no        | no                |
//! | Decode           | no        | yes               |

use thiserror::Error;

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by the messaging provider client.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// A required credential or identity is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input rejected locally before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider rejected the request (HTTP 4xx).
    #[error("{method} {path} failed ({status}): {message}")]
    Client {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    /// Provider failed to serve the request (HTTP 5xx).
    #[error("{method} {path} failed ({status}): {message}")]
    Server {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    /// The request never produced an HTTP response (connect, timeout, reset).
    #[error("{method} {path} failed (network): {message}")]
    Network {
        method: String,
        path: String,
        message: String,
    },

    /// The channel is permanently unsupported by this provider.
    #[error("{capability} not implemented: {reason}")]
    NotImplemented {
        capability: &'static str,
        reason: &'static str,
    },

    /// A 2xx response whose body could not be parsed.
    #[error("{method} {path} returned an unreadable body: {message}")]
    Decode {
        method: String,
        path: String,
        message: String,
    },
}

impl TransportError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Map a non-success HTTP status to the client or server variant.
    pub fn from_status(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        let (method, path, message) = (method.into(), path.into(), message.into());
        if status >= 500 {
            Self::Server {
                method,
                path,
                status,
                message,
            }
        } else {
            Self::Client {
                method,
                path,
                status,
                message,
            }
        }
    }

    pub fn network(
        method: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Network {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether a later attempt could succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network { .. })
    }

    /// HTTP status carried by the error, if the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine-readable code for logs and outcome diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION",
            Self::Validation(_) => "VALIDATION",
            Self::Client { .. } => "CLIENT_ERROR",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
            Self::Decode { .. } => "DECODE_ERROR",
        }
    }
}

/// Pull the human-readable message out of a provider error body.
///
/// The provider answers with `{"message": ...}` (string or list of strings),
/// `{"error": ...}`, or plain text. Anything unrecognised is returned raw.
pub fn provider_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value.get("message") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let joined: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                if !joined.is_empty() {
                    return joined.join("; ");
                }
            }
            _ => {}
        }
        match value.get("error") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }
    trimmed.to_string()
}
