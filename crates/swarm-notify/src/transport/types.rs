//! Wire types for the messaging provider and local input validation.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{TransportError, TransportResult};

/// Longest text body the provider accepts (10 concatenated SMS segments).
pub const MAX_TEXT_LENGTH: usize = 1600;

/// International phone address: `+`, a non-zero digit, then 1–14 more digits.
static PHONE_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").expect("PHONE_ADDRESS_RE regex should compile")
});

/// Whether `address` is a dialable international phone address.
pub fn is_phone_address(address: &str) -> bool {
    PHONE_ADDRESS_RE.is_match(address)
}

pub(crate) fn validate_destination(destination: &str) -> TransportResult<()> {
    if is_phone_address(destination) {
        Ok(())
    } else {
        Err(TransportError::validation(format!(
            "destination '{destination}' is not an international phone number (+<country><number>)"
        )))
    }
}

pub(crate) fn validate_text_body(body: &str) -> TransportResult<()> {
    let length = body.chars().count();
    if length > MAX_TEXT_LENGTH {
        return Err(TransportError::validation(format!(
            "text body is {length} characters, limit is {MAX_TEXT_LENGTH}"
        )));
    }
    Ok(())
}

/// Acknowledgement returned by the provider for a text or call request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// State of a previously placed voice call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDetails {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

impl CallDetails {
    /// Whether the provider has finished with the call.
    pub fn is_ended(&self) -> bool {
        self.status == "ended" || self.ended_at.is_some()
    }
}

/// Voice responder configured on the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_address_format() {
        assert!(is_phone_address("+15551234567"));
        assert!(is_phone_address("+44"));
        assert!(is_phone_address("+123456789012345"));

        assert!(!is_phone_address("15551234567"));
        assert!(!is_phone_address("+05551234567"));
        assert!(!is_phone_address("+1"));
        assert!(!is_phone_address("+1234567890123456"));
        assert!(!is_phone_address("+1 555 123 4567"));
        assert!(!is_phone_address(""));
    }

    #[test]
    fn text_body_limit_counts_characters() {
        assert!(validate_text_body(&"a".repeat(MAX_TEXT_LENGTH)).is_ok());
        assert!(validate_text_body(&"é".repeat(MAX_TEXT_LENGTH)).is_ok());

        let err = validate_text_body(&"a".repeat(MAX_TEXT_LENGTH + 1)).unwrap_err();
        assert!(matches!(err, TransportError::Validation(_)));
        assert!(err.to_string().contains("1601"));
    }

    #[test]
    fn receipt_tolerates_missing_optional_fields() {
        let receipt: SendReceipt = serde_json::from_str(r#"{"id":"msg_1"}"#).unwrap();
        assert_eq!(receipt.id, "msg_1");
        assert!(receipt.status.is_empty());
        assert!(receipt.created_at.is_none());

        let receipt: SendReceipt = serde_json::from_str(
            r#"{"id":"call_9","status":"queued","createdAt":"2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(receipt.status, "queued");
        assert!(receipt.created_at.is_some());
    }

    #[test]
    fn call_details_ended() {
        let details: CallDetails = serde_json::from_str(
            r#"{"id":"c1","status":"ended","endedReason":"customer-ended-call"}"#,
        )
        .unwrap();
        assert!(details.is_ended());
        assert_eq!(details.ended_reason.as_deref(), Some("customer-ended-call"));

        let details: CallDetails =
            serde_json::from_str(r#"{"id":"c2","status":"ringing"}"#).unwrap();
        assert!(!details.is_ended());
    }
}
