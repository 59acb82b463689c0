//! Mock Email Service Implementation
//!
//! Provides in-memory email capture for testing without external dependencies.
//! Invitation links can be pulled back out of captured messages so tests can
//! follow the whole invite-then-email flow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{EmailConfig, EmailError, EmailMessage, EmailReceipt, EmailService};

/// Email captured by the mock service
#[derive(Debug, Clone)]
pub struct CapturedEmail {
    pub message: EmailMessage,
    pub receipt: EmailReceipt,
    pub captured_at: DateTime<Utc>,
}

impl CapturedEmail {
    /// Extract the first hosted-login authorize link from the email body
    pub fn extract_invitation_url(&self) -> Option<String> {
        let text = format!(
            "{} {}",
            self.message.body_text,
            self.message.body_html.as_deref().unwrap_or("")
        );

        let re = regex::Regex::new(r#"https://[^\s"<>]+\.b2clogin\.com/[^\s"<>]+"#).ok()?;
        re.find(&text)
            .map(|m| m.as_str().replace("&amp;", "&"))
    }
}

/// Mock email service for testing
#[derive(Debug, Clone)]
pub struct MockEmailService {
    emails: Arc<Mutex<Vec<CapturedEmail>>>,
    email_by_recipient: Arc<Mutex<HashMap<String, Vec<CapturedEmail>>>>,
    config: EmailConfig,
    failing: bool,
}

impl MockEmailService {
    /// Create a new mock email service
    pub fn new() -> Self {
        Self::with_config(EmailConfig::default())
    }

    /// Create a mock that uses `config` for sender and subject
    pub fn with_config(config: EmailConfig) -> Self {
        Self {
            emails: Arc::new(Mutex::new(Vec::new())),
            email_by_recipient: Arc::new(Mutex::new(HashMap::new())),
            config,
            failing: false,
        }
    }

    /// Create a mock whose sends are rejected (for testing failure paths)
    pub fn new_failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Get all captured emails
    pub fn get_all_emails(&self) -> Vec<CapturedEmail> {
        self.emails.lock().unwrap().clone()
    }

    /// Get emails sent to a specific recipient
    pub fn get_emails_for_recipient(&self, email: &str) -> Vec<CapturedEmail> {
        self.email_by_recipient
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .unwrap_or_default()
    }

    /// Invitation link from the most recent email to a recipient
    pub fn get_invitation_url_for(&self, email: &str) -> Option<String> {
        self.get_emails_for_recipient(email)
            .into_iter()
            .max_by_key(|e| e.captured_at)
            .and_then(|e| e.extract_invitation_url())
    }

    /// Get count of emails sent
    pub fn email_count(&self) -> usize {
        self.emails.lock().unwrap().len()
    }

    /// Clear all captured emails
    pub fn clear(&self) {
        self.emails.lock().unwrap().clear();
        self.email_by_recipient.lock().unwrap().clear();
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EmailService for MockEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        if self.failing {
            return Err(EmailError::Provider(
                "mock email service configured to fail".to_string(),
            ));
        }

        tracing::info!("Mock email service capturing email to: {}", message.to);

        let receipt = EmailReceipt {
            message_id: format!("mock-{}", Uuid::new_v4()),
            sent_at: Utc::now(),
            provider: "mock".to_string(),
            metadata: message.metadata.clone(),
        };

        let captured = CapturedEmail {
            message: message.clone(),
            receipt: receipt.clone(),
            captured_at: Utc::now(),
        };

        self.emails
            .lock()
            .map_err(|e| EmailError::Provider(format!("emails lock poisoned: {e}")))?
            .push(captured.clone());

        self.email_by_recipient
            .lock()
            .map_err(|e| EmailError::Provider(format!("emails lock poisoned: {e}")))?
            .entry(message.to)
            .or_default()
            .push(captured);

        Ok(receipt)
    }

    fn config(&self) -> &EmailConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE_URL: &str = "https://contoso.b2clogin.com/contoso.onmicrosoft.com/B2C_1A_INV/oauth2/v2.0/authorize?client_id=abc&login_hint=ada@example.com&client_assertion=aaa.bbb.ccc";

    #[tokio::test]
    async fn test_mock_email_service() {
        let service = MockEmailService::new();

        let message = EmailMessage::new(
            "test@example.com".to_string(),
            "sender@example.com".to_string(),
            "Test Subject".to_string(),
            "Test body".to_string(),
        );

        let receipt = service.send_email(message).await.unwrap();

        assert!(receipt.message_id.starts_with("mock-"));
        assert_eq!(receipt.provider, "mock");
        assert_eq!(service.email_count(), 1);

        let emails = service.get_emails_for_recipient("test@example.com");
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].message.subject, "Test Subject");
    }

    #[test_log::test(tokio::test)]
    async fn test_notify_uses_configured_sender_and_subject() {
        let service = MockEmailService::with_config(EmailConfig {
            from_email: "noreply@contoso.com".to_string(),
            from_name: Some("Contoso".to_string()),
            subject: "Join Contoso".to_string(),
            ..EmailConfig::default()
        });

        assert!(service.notify("ada@example.com", "Ada", "<p>hello</p>").await);

        let captured = &service.get_emails_for_recipient("ada@example.com")[0];
        assert_eq!(captured.message.from, "noreply@contoso.com");
        assert_eq!(captured.message.from_name.as_deref(), Some("Contoso"));
        assert_eq!(captured.message.to_name.as_deref(), Some("Ada"));
        assert_eq!(captured.message.subject, "Join Contoso");
        assert_eq!(captured.message.body_html.as_deref(), Some("<p>hello</p>"));
    }

    #[tokio::test]
    async fn test_send_invitation_link_recoverable() {
        let service = MockEmailService::new();

        assert!(service.send_invitation("ada@example.com", "Ada", INVITE_URL).await);

        assert_eq!(
            service.get_invitation_url_for("ada@example.com").as_deref(),
            Some(INVITE_URL)
        );
    }

    #[tokio::test]
    async fn test_failing_mock_notify_returns_false() {
        let service = MockEmailService::new_failing();

        assert!(!service.notify("ada@example.com", "Ada", "<p>hello</p>").await);
        assert_eq!(service.email_count(), 0);
    }
}
