use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fetched email message, as delivered by an `InboxSource`.
///
/// The `id` is provider-assigned and stable across rescans; it is the
/// idempotency key for flagged records. The body is plain text (HTML is
/// stripped by the collaborator that fetched the message). The engine never
/// mutates a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub sender: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
    /// URLs found in the body, in order. May be empty; the URL extractor
    /// falls back to scanning the body itself.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Attachment names only.
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl EmailMessage {
    /// Domain part of the sender address, lowercased.
    pub fn sender_domain(&self) -> Option<String> {
        extract_domain(&self.sender)
    }
}

/// Extract the domain from an email address, lowercased.
pub fn extract_domain(address: &str) -> Option<String> {
    address
        .rsplit('@')
        .next()
        .filter(|d| !d.is_empty() && *d != address)
        .map(|d| d.trim().to_lowercase())
}

/// Local part (mailbox) of an email address.
pub fn extract_local_part(address: &str) -> Option<&str> {
    address.split('@').next().filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("user@Example.COM"),
            Some("example.com".to_string())
        );
        assert_eq!(extract_domain("no-at-sign"), None);
        assert_eq!(extract_domain("trailing@"), None);
    }

    #[test]
    fn test_extract_local_part() {
        assert_eq!(extract_local_part("user@example.com"), Some("user"));
        assert_eq!(extract_local_part(""), None);
    }
}
