//! Channel-specific message templates.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::event::EscalationEvent;
use crate::transport::MAX_TEXT_LENGTH;

/// Subject and body for the fallback channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Renders one event into text, voice, and email content.
#[derive(Debug, Clone, Default)]
pub struct MessageComposer {
    issue_url_base: Option<String>,
}

impl MessageComposer {
    pub fn new(issue_url_base: Option<String>) -> Self {
        Self {
            issue_url_base: issue_url_base
                .map(|base| base.trim_end_matches('/').to_string())
                .filter(|base| !base.is_empty()),
        }
    }

    /// Canonical link to the issue, or a plain reference without a tracker URL.
    pub fn deep_link(&self, id: u64) -> String {
        match &self.issue_url_base {
            Some(base) => format!("{base}/{id}"),
            None => format!("issue #{id}"),
        }
    }

    /// Short text: tier, issue number, title. Never exceeds the text limit.
    pub fn sms(&self, event: &EscalationEvent) -> String {
        let text = format!(
            "[{} {}] Issue #{} needs attention: {}",
            event.severity,
            event.severity.name().to_uppercase(),
            event.id,
            event.title
        );
        truncate_chars(&text, MAX_TEXT_LENGTH)
    }

    /// First sentence spoken by the assistant when the call connects.
    pub fn voice_opening(&self, event: &EscalationEvent) -> String {
        format!(
            "This is an automated {} escalation. Issue {} needs your attention: {}. \
             Details were sent by text message.",
            event.severity.name(),
            event.id,
            event.title
        )
    }

    pub fn email(&self, event: &EscalationEvent) -> EmailMessage {
        let subject = format!("[{}] Issue #{}: {}", event.severity, event.id, event.title);

        let mut body = String::new();
        let _ = writeln!(
            body,
            "Severity: {} ({})",
            event.severity,
            event.severity.name()
        );
        let _ = writeln!(body, "Issue: #{} {}", event.id, event.title);
        let _ = writeln!(body, "Raised by: {}", event.originator);
        if let Some(since) = event.blocked_since {
            let _ = writeln!(
                body,
                "Blocked since: {}",
                since.format("%Y-%m-%d %H:%M UTC")
            );
        }
        body.push('\n');
        if event.description.trim().is_empty() {
            body.push_str("(no description provided)\n");
        } else {
            body.push_str(event.description.trim_end());
            body.push('\n');
        }
        let _ = write!(body, "\nLink: {}\n", self.deep_link(event.id));

        EmailMessage { subject, body }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
