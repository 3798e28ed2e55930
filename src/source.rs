use crate::error::EngineError;
use crate::message::EmailMessage;
use chrono::{Duration, Utc};

/// Capability to fetch up to N recent messages. The real provider-backed
/// implementation lives with the transport collaborator; the engine only
/// depends on this trait and ships a simulated source for fallback and
/// testing.
pub trait InboxSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch up to `limit` recent messages. Provider failures (auth
    /// expired, quota, network, timeout) surface as
    /// `EngineError::SourceUnavailable`.
    fn fetch(&self, limit: usize) -> Result<Vec<EmailMessage>, EngineError>;
}

/// Deterministic in-memory inbox with a mixed corpus of legitimate and
/// phishing samples. Message ids are stable across fetches so rescans
/// exercise the same idempotency path as a real provider.
pub struct SimulatedMailSource {
    messages: Vec<EmailMessage>,
}

impl Default for SimulatedMailSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMailSource {
    pub fn new() -> Self {
        SimulatedMailSource {
            messages: sample_messages(),
        }
    }

    pub fn with_messages(messages: Vec<EmailMessage>) -> Self {
        SimulatedMailSource { messages }
    }
}

impl InboxSource for SimulatedMailSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn fetch(&self, limit: usize) -> Result<Vec<EmailMessage>, EngineError> {
        Ok(self.messages.iter().take(limit).cloned().collect())
    }
}

fn sample(
    id: &str,
    sender: &str,
    sender_name: &str,
    subject: &str,
    body: &str,
    urls: &[&str],
    age_hours: i64,
) -> EmailMessage {
    EmailMessage {
        id: id.to_string(),
        sender: sender.to_string(),
        sender_name: Some(sender_name.to_string()),
        reply_to: None,
        subject: subject.to_string(),
        body: body.to_string(),
        received_at: Utc::now() - Duration::hours(age_hours),
        urls: urls.iter().map(|u| u.to_string()).collect(),
        attachments: Vec::new(),
        headers: Default::default(),
    }
}

fn sample_messages() -> Vec<EmailMessage> {
    vec![
        sample(
            "sim-0001",
            "newsletter@company.com",
            "Company Newsletter",
            "Weekly Update - January",
            "Hello, here is your weekly roundup with the latest news and articles. \
             Check out our blog for more information.",
            &["https://company.com/blog", "https://company.com/unsubscribe"],
            2,
        ),
        sample(
            "sim-0002",
            "support@amazon.com",
            "Amazon",
            "Your order has been shipped",
            "Good news! Your order #12345 has been shipped and will arrive by Friday. \
             Track your package at the link below.",
            &["https://amazon.com/track"],
            5,
        ),
        sample(
            "sim-0003",
            "friend@gmail.com",
            "John Smith",
            "Coffee next week?",
            "Hey! Want to grab coffee next Tuesday? Let me know if you're free. \
             Looking forward to catching up!",
            &[],
            8,
        ),
        sample(
            "sim-0004",
            "hr@yourcompany.com",
            "HR Department",
            "Team Meeting - Thursday 2pm",
            "Reminder: we have our monthly team meeting this Thursday at 2pm in \
             Conference Room B. See you there!",
            &[],
            12,
        ),
        sample(
            "sim-0005",
            "security@paypa1-verify.com",
            "PayPal Security",
            "URGENT: Your PayPal Account Has Been Suspended",
            "Your PayPal account has been suspended due to suspicious activity. \
             Click here immediately to verify your identity and restore access. \
             You have 24 hours before permanent suspension! \
             Click here: http://paypal-verify.tk/login",
            &["http://paypal-verify.tk/login", "http://192.168.1.1/verify"],
            1,
        ),
        sample(
            "sim-0006",
            "no-reply@amazon-security.tk",
            "Amazon Account",
            "Verify your account now!",
            "Dear customer, your Amazon account will be locked in 12 hours if you \
             don't verify now! Click here immediately to confirm your identity: \
             http://amazon-verify.tk/confirm PASSWORD EXPIRED! ACT NOW!",
            &["http://amazon-verify.tk/confirm"],
            3,
        ),
        sample(
            "sim-0007",
            "irs_official_2026@yahoo.com",
            "IRS Tax Department",
            "Tax Refund - Immediate Action Required!!!",
            "You are eligible for a tax refund of $2,543.00. Click here NOW to claim \
             your refund before it expires! You must act within 24 hours or forfeit \
             your money! URGENT! http://irs-refund-2026.tk",
            &["http://irs-refund-2026.tk"],
            4,
        ),
        sample(
            "sim-0008",
            "security567@bank-alert.net",
            "Bank Security",
            "ALERT: Suspicious Activity Detected!!!!",
            "URGENT SECURITY ALERT! Suspicious login detected on your account! \
             VERIFY NOW or your account will be LOCKED PERMANENTLY! \
             Click here: http://193.45.67.89/verify-account PASSWORD RESET REQUIRED!",
            &["http://193.45.67.89/verify-account"],
            6,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_respects_limit() {
        let source = SimulatedMailSource::new();
        assert_eq!(source.fetch(3).unwrap().len(), 3);
        assert_eq!(source.fetch(100).unwrap().len(), 8);
    }

    #[test]
    fn test_ids_are_stable_across_fetches() {
        let source = SimulatedMailSource::new();
        let first: Vec<String> = source.fetch(10).unwrap().iter().map(|m| m.id.clone()).collect();
        let second: Vec<String> = source.fetch(10).unwrap().iter().map(|m| m.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corpus_is_mixed() {
        let source = SimulatedMailSource::new();
        let messages = source.fetch(100).unwrap();
        assert!(messages.iter().any(|m| m.sender.ends_with(".tk")));
        assert!(messages.iter().any(|m| m.sender.ends_with("amazon.com")));
    }
}
