//! idbridge Email Service
//!
//! The notification capability used one layer above the identity core:
//! - SendGrid v3 mail send for production delivery
//! - AWS SES as an alternative provider (LocalStack-compatible)
//! - Mock email service for testing and development
//!
//! `notify` is fire-and-forget from the caller's point of view: it logs the
//! outcome and reports success as a boolean.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aws_ses;
pub mod content;
pub mod mock;
pub mod sendgrid;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email configuration error: {0}")]
    Configuration(String),

    #[error("Email validation error: {0}")]
    Validation(String),

    #[error("Email provider error: {0}")]
    Provider(String),

    #[error("Email template error: {0}")]
    Template(String),
}

/// Email message to be sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub from: String,
    pub from_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl EmailMessage {
    /// Create a new email message
    pub fn new(to: String, from: String, subject: String, body_text: String) -> Self {
        Self {
            to,
            to_name: None,
            from,
            from_name: None,
            subject,
            body_text,
            body_html: None,
            metadata: HashMap::new(),
        }
    }

    /// Add HTML body content
    pub fn with_html(mut self, body_html: String) -> Self {
        self.body_html = Some(body_html);
        self
    }

    /// Add recipient display name
    pub fn with_to_name(mut self, name: String) -> Self {
        self.to_name = Some(name);
        self
    }

    /// Add sender display name
    pub fn with_from_name(mut self, name: String) -> Self {
        self.from_name = Some(name);
        self
    }

    /// Add metadata for tracking
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

/// Email delivery receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReceipt {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
    pub provider: String,
    pub metadata: HashMap<String, String>,
}

pub const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";

/// Email service configuration
#[derive(Clone)]
pub struct EmailConfig {
    /// Email service provider (sendgrid, ses, mock)
    pub provider: String,
    /// Enable email sending (can disable for testing)
    pub enabled: bool,
    /// SendGrid API key
    pub sendgrid_api_key: Option<String>,
    /// SendGrid API base URL
    pub sendgrid_base_url: String,
    /// AWS region for SES
    pub aws_region: Option<String>,
    /// AWS endpoint URL (for LocalStack)
    pub aws_endpoint_url: Option<String>,
    /// Sender address
    pub from_email: String,
    /// Sender display name
    pub from_name: Option<String>,
    /// Subject used by `notify`
    pub subject: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("provider", &self.provider)
            .field("enabled", &self.enabled)
            .field(
                "sendgrid_api_key",
                &self.sendgrid_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sendgrid_base_url", &self.sendgrid_base_url)
            .field("aws_region", &self.aws_region)
            .field("aws_endpoint_url", &self.aws_endpoint_url)
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("subject", &self.subject)
            .finish()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            enabled: true,
            sendgrid_api_key: None,
            sendgrid_base_url: DEFAULT_SENDGRID_BASE_URL.to_string(),
            aws_region: None,
            aws_endpoint_url: None,
            from_email: "invitations@idbridge.local".to_string(),
            from_name: None,
            subject: "You're invited".to_string(),
        }
    }
}

impl EmailConfig {
    /// Create email config from environment variables
    pub fn from_env() -> Result<Self, EmailError> {
        let defaults = Self::default();

        let provider = std::env::var("EMAIL_PROVIDER").unwrap_or(defaults.provider);

        let enabled = std::env::var("EMAIL_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            provider,
            enabled,
            sendgrid_api_key: std::env::var("SENDGRID_API_KEY").ok(),
            sendgrid_base_url: std::env::var("SENDGRID_BASE_URL")
                .unwrap_or(defaults.sendgrid_base_url),
            aws_region: std::env::var("AWS_REGION").ok(),
            aws_endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            from_email: std::env::var("FROM_EMAIL").unwrap_or(defaults.from_email),
            from_name: std::env::var("FROM_NAME").ok(),
            subject: std::env::var("EMAIL_SUBJECT").unwrap_or(defaults.subject),
        })
    }
}

/// Email service trait for different implementations
#[async_trait::async_trait]
pub trait EmailService: Send + Sync {
    /// Send an email message
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError>;

    /// Sender configuration used by `notify`
    fn config(&self) -> &EmailConfig;

    /// Send an HTML email with the configured sender and subject.
    ///
    /// Logs the outcome; returns whether the provider accepted the message.
    async fn notify(&self, address: &str, display_name: &str, html_body: &str) -> bool {
        let config = self.config();

        let mut message = EmailMessage::new(
            address.to_string(),
            config.from_email.clone(),
            config.subject.clone(),
            String::new(),
        )
        .with_html(html_body.to_string());
        if !display_name.is_empty() {
            message = message.with_to_name(display_name.to_string());
        }
        if let Some(from_name) = &config.from_name {
            message = message.with_from_name(from_name.clone());
        }

        match self.send_email(message).await {
            Ok(receipt) => {
                tracing::info!(message_id = %receipt.message_id, "Email sent to {}", address);
                true
            }
            Err(e) => {
                tracing::error!("Email send to {} failed with: {}", address, e);
                false
            }
        }
    }

    /// Email an invitation link.
    async fn send_invitation(&self, address: &str, display_name: &str, invitation_url: &str) -> bool {
        match content::invitation_html(display_name, invitation_url) {
            Ok(html) => self.notify(address, display_name, &html).await,
            Err(e) => {
                tracing::error!("Email send to {} failed with: {}", address, e);
                false
            }
        }
    }
}

/// Email service factory
pub struct EmailServiceFactory;

impl EmailServiceFactory {
    /// Create email service based on configuration
    pub async fn create(config: EmailConfig) -> Result<Box<dyn EmailService>, EmailError> {
        if !config.enabled {
            tracing::info!("Email service disabled, using mock implementation");
            return Ok(Box::new(mock::MockEmailService::with_config(config)));
        }

        match config.provider.as_str() {
            "sendgrid" => {
                tracing::info!("Creating SendGrid email service");
                Ok(Box::new(sendgrid::SendGridEmailService::new(config)?))
            }
            "ses" | "aws-ses" => {
                tracing::info!("Creating AWS SES email service");
                let ses_service = aws_ses::SesEmailService::new(config).await?;
                Ok(Box::new(ses_service))
            }
            "mock" => {
                tracing::info!("Creating mock email service");
                Ok(Box::new(mock::MockEmailService::with_config(config)))
            }
            provider => Err(EmailError::Configuration(format!(
                "Unknown email provider: {}. Supported providers: sendgrid, ses, mock",
                provider
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_email_message_creation() {
        let message = EmailMessage::new(
            "test@example.com".to_string(),
            "sender@example.com".to_string(),
            "Test Subject".to_string(),
            "Test body".to_string(),
        )
        .with_html("<p>Test body</p>".to_string())
        .with_to_name("Test User".to_string())
        .with_metadata("email_type".to_string(), "invitation".to_string());

        assert_eq!(message.to, "test@example.com");
        assert_eq!(message.to_name.as_deref(), Some("Test User"));
        assert_eq!(message.from, "sender@example.com");
        assert_eq!(message.body_html, Some("<p>Test body</p>".to_string()));
        assert_eq!(
            message.metadata.get("email_type"),
            Some(&"invitation".to_string())
        );
    }

    #[test]
    #[serial]
    fn test_email_config_from_env() {
        std::env::remove_var("EMAIL_PROVIDER");
        std::env::remove_var("FROM_EMAIL");
        std::env::remove_var("EMAIL_ENABLED");
        std::env::set_var("SENDGRID_API_KEY", "SG.secret");

        let config = EmailConfig::from_env().unwrap();
        std::env::remove_var("SENDGRID_API_KEY");

        assert_eq!(config.provider, "mock");
        assert_eq!(config.from_email, "invitations@idbridge.local");
        assert!(config.enabled);
        assert!(!format!("{:?}", config).contains("SG.secret"));
    }

    #[tokio::test]
    async fn test_factory_unknown_provider() {
        let config = EmailConfig {
            provider: "carrier-pigeon".to_string(),
            ..EmailConfig::default()
        };
        let err = match EmailServiceFactory::create(config).await {
            Err(e) => e,
            Ok(_) => panic!("Expected error for unknown provider"),
        };
        assert!(err.to_string().contains("Unknown email provider"));
    }

    #[tokio::test]
    async fn test_factory_sendgrid_requires_key() {
        let config = EmailConfig {
            provider: "sendgrid".to_string(),
            ..EmailConfig::default()
        };
        assert!(EmailServiceFactory::create(config).await.is_err());
    }
}
