//! SendGrid Email Service Implementation
//!
//! POSTs to the v3 mail send API (`{base_url}/v3/mail/send`) with the API key
//! as a bearer token. SendGrid answers 202 with the message id in the
//! `X-Message-Id` header.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{EmailConfig, EmailError, EmailMessage, EmailReceipt, EmailService};

#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

impl<'a> MailSendRequest<'a> {
    fn from_message(message: &'a EmailMessage) -> Self {
        // SendGrid rejects empty content values and wants text/plain first.
        let mut content = Vec::new();
        if !message.body_text.is_empty() {
            content.push(Content {
                content_type: "text/plain",
                value: &message.body_text,
            });
        }
        if let Some(html) = message.body_html.as_deref().filter(|h| !h.is_empty()) {
            content.push(Content {
                content_type: "text/html",
                value: html,
            });
        }

        Self {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &message.to,
                    name: message.to_name.as_deref(),
                }],
            }],
            from: Address {
                email: &message.from,
                name: message.from_name.as_deref(),
            },
            subject: &message.subject,
            content,
        }
    }
}

/// SendGrid email service implementation
pub struct SendGridEmailService {
    http: reqwest::Client,
    api_key: String,
    send_url: String,
    config: EmailConfig,
}

impl SendGridEmailService {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let api_key = config
            .sendgrid_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                EmailError::Configuration(
                    "SENDGRID_API_KEY is required for sendgrid provider".to_string(),
                )
            })?;
        let send_url = format!(
            "{}/v3/mail/send",
            config.sendgrid_base_url.trim_end_matches('/')
        );

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            send_url,
            config,
        })
    }
}

#[async_trait::async_trait]
impl EmailService for SendGridEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        if !message.to.contains('@') || !message.from.contains('@') {
            return Err(EmailError::Validation(
                "Invalid email address format".to_string(),
            ));
        }
        if message.body_text.is_empty() && message.body_html.as_deref().unwrap_or("").is_empty() {
            return Err(EmailError::Validation("Email body is empty".to_string()));
        }

        let body = MailSendRequest::from_message(&message);

        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Provider(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(EmailError::Provider(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )));
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("sendgrid-{}", Uuid::new_v4()));

        tracing::debug!(message_id = %message_id, "SendGrid accepted message");

        Ok(EmailReceipt {
            message_id,
            sent_at: Utc::now(),
            provider: "sendgrid".to_string(),
            metadata: message.metadata,
        })
    }

    fn config(&self) -> &EmailConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> SendGridEmailService {
        SendGridEmailService::new(EmailConfig {
            provider: "sendgrid".to_string(),
            sendgrid_api_key: Some("SG.test-key".to_string()),
            sendgrid_base_url: server.uri(),
            from_email: "noreply@example.com".to_string(),
            from_name: Some("Example".to_string()),
            subject: "Welcome".to_string(),
            ..EmailConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_notify_posts_mail_send_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.test-key"))
            .and(body_json(json!({
                "personalizations": [{"to": [{"email": "ada@example.com", "name": "Ada"}]}],
                "from": {"email": "noreply@example.com", "name": "Example"},
                "subject": "Welcome",
                "content": [{"type": "text/html", "value": "<p>hi</p>"}]
            })))
            .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "msg-123"))
            .expect(1)
            .mount(&server)
            .await;

        let sent = service(&server)
            .notify("ada@example.com", "Ada", "<p>hi</p>")
            .await;
        assert!(sent);
    }

    #[tokio::test]
    async fn test_send_email_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "msg-456"))
            .mount(&server)
            .await;

        let message = EmailMessage::new(
            "ada@example.com".to_string(),
            "noreply@example.com".to_string(),
            "Subject".to_string(),
            "plain".to_string(),
        );
        let receipt = service(&server).send_email(message).await.unwrap();

        assert_eq!(receipt.message_id, "msg-456");
        assert_eq!(receipt.provider, "sendgrid");
    }

    #[tokio::test]
    async fn test_notify_failure_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"errors": [{"message": "bad key"}]})),
            )
            .mount(&server)
            .await;

        let sent = service(&server)
            .notify("ada@example.com", "Ada", "<p>hi</p>")
            .await;
        assert!(!sent);
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let message = EmailMessage::new(
            "not-an-address".to_string(),
            "noreply@example.com".to_string(),
            "Subject".to_string(),
            "plain".to_string(),
        );
        let result = service(&server).send_email(message).await;
        assert!(matches!(result, Err(EmailError::Validation(_))));
    }
}
