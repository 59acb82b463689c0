//! AWS SES Email Service Implementation
//!
//! Alternative delivery through AWS Simple Email Service (SES) with support
//! for a LocalStack endpoint.

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_ses::config::SharedCredentialsProvider;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client as SesClient;
use chrono::Utc;

use crate::{EmailConfig, EmailError, EmailMessage, EmailReceipt, EmailService};

/// `Name <address>` when a display name is present.
fn mailbox(address: &str, name: Option<&str>) -> String {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => format!("{} <{}>", name.replace(['<', '>', '"'], ""), address),
        None => address.to_string(),
    }
}

fn utf8_content(data: &str, part: &str) -> Result<Content, EmailError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| EmailError::Provider(format!("Failed to build {}: {}", part, e)))
}

/// AWS SES email service implementation
pub struct SesEmailService {
    client: SesClient,
    config: EmailConfig,
}

impl SesEmailService {
    /// Create a new SES email service
    pub async fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let region = config
            .aws_region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let aws_config = match config.aws_endpoint_url.as_ref() {
            Some(endpoint_url) => {
                tracing::info!("Using custom AWS endpoint: {}", endpoint_url);

                // LocalStack accepts any static credentials
                let credentials = Credentials::new(
                    "test-access-key",
                    "test-secret-key",
                    None,
                    None,
                    "localstack-email-provider",
                );

                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region))
                    .endpoint_url(endpoint_url)
                    .credentials_provider(SharedCredentialsProvider::new(credentials))
                    .load()
                    .await
            }
            None => {
                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region))
                    .load()
                    .await
            }
        };

        Ok(Self {
            client: SesClient::new(&aws_config),
            config,
        })
    }

    /// Convert email message to SES format
    fn build_ses_message(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        let subject = utf8_content(&message.subject, "subject")?;

        let mut body_builder = Body::builder();
        if !message.body_text.is_empty() {
            body_builder = body_builder.text(utf8_content(&message.body_text, "text content")?);
        }
        if let Some(html_body) = &message.body_html {
            body_builder = body_builder.html(utf8_content(html_body, "HTML content")?);
        }

        Ok(Message::builder()
            .subject(subject)
            .body(body_builder.build())
            .build())
    }
}

#[async_trait::async_trait]
impl EmailService for SesEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        tracing::debug!("Sending email via AWS SES to: {}", message.to);

        if !message.to.contains('@') || !message.from.contains('@') {
            return Err(EmailError::Validation(
                "Invalid email address format".to_string(),
            ));
        }

        let ses_message = self.build_ses_message(&message)?;
        let destination = Destination::builder()
            .to_addresses(mailbox(&message.to, message.to_name.as_deref()))
            .build();

        let result = self
            .client
            .send_email()
            .source(mailbox(&message.from, message.from_name.as_deref()))
            .destination(destination)
            .message(ses_message)
            .send()
            .await
            .map_err(|e| EmailError::Provider(format!("Failed to send email: {}", e)))?;

        let message_id = result.message_id().to_string();

        Ok(EmailReceipt {
            message_id,
            sent_at: Utc::now(),
            provider: "aws-ses".to_string(),
            metadata: message.metadata,
        })
    }

    fn config(&self) -> &EmailConfig {
        &self.config
    }
}
