//! idbridge Credential Provider
//!
//! Supplies bearer tokens for the directory API on demand:
//! - OAuth2 client-credentials grant with an expiry-aware in-memory cache
//! - Static and mock providers for local development and tests
//!
//! Callers only ever see `acquire_token(scopes)`; caching and refresh are
//! entirely the provider's business.

pub mod client;
pub mod mock;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential configuration error: {0}")]
    Configuration(String),

    #[error("Credential request error: {0}")]
    Request(String),

    #[error("Credential response error: {0}")]
    Response(String),
}

/// A bearer token returned by a provider.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Credential provider configuration.
#[derive(Clone)]
pub struct CredentialConfig {
    /// Provider (client-credentials, static, mock)
    pub provider: String,
    /// Directory tenant id used in the token endpoint path
    pub tenant_id: String,
    /// Confidential client application id
    pub client_id: String,
    /// Confidential client secret
    pub client_secret: String,
    /// Authority host, e.g. `https://login.microsoftonline.com`
    pub authority_host: String,
    /// Token handed out by the static provider
    pub static_token: Option<String>,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("provider", &self.provider)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authority_host", &self.authority_host)
            .field("static_token", &self.static_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

impl CredentialConfig {
    /// Create credential config from environment variables.
    pub fn from_env() -> Result<Self, CredentialError> {
        let provider = std::env::var("CREDENTIAL_PROVIDER").unwrap_or_else(|_| "mock".to_string());

        let tenant_id = std::env::var("AZURE_TENANT_ID").unwrap_or_default();
        let client_id = std::env::var("AZURE_CLIENT_ID").unwrap_or_default();
        let client_secret = std::env::var("AZURE_CLIENT_SECRET").unwrap_or_default();
        let authority_host = std::env::var("AZURE_AUTHORITY_HOST")
            .unwrap_or_else(|_| DEFAULT_AUTHORITY_HOST.to_string());
        let static_token = std::env::var("STATIC_ACCESS_TOKEN").ok();

        let config = Self {
            provider,
            tenant_id,
            client_id,
            client_secret,
            authority_host,
            static_token,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CredentialError> {
        if self.provider == "client-credentials"
            && (self.tenant_id.is_empty()
                || self.client_id.is_empty()
                || self.client_secret.is_empty())
        {
            return Err(CredentialError::Configuration(
                "AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are required for client-credentials provider"
                    .to_string(),
            ));
        }
        if self.provider == "static" && self.static_token.is_none() {
            return Err(CredentialError::Configuration(
                "STATIC_ACCESS_TOKEN is required for static provider".to_string(),
            ));
        }
        Ok(())
    }
}

/// Supplies a valid bearer token for the requested scopes.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError>;
}

/// Factory for creating TokenProvider implementations.
pub struct TokenProviderFactory;

impl TokenProviderFactory {
    pub fn create(config: CredentialConfig) -> Result<Box<dyn TokenProvider>, CredentialError> {
        config.validate()?;
        match config.provider.as_str() {
            "client-credentials" => {
                tracing::info!(tenant_id = %config.tenant_id, "Creating client-credentials token provider");
                Ok(Box::new(client::ClientCredentialsProvider::new(config)))
            }
            "static" => {
                tracing::info!("Creating static token provider");
                let token = config.static_token.unwrap_or_default();
                Ok(Box::new(mock::StaticTokenProvider::new(token)))
            }
            "mock" => {
                tracing::info!("Creating mock token provider");
                Ok(Box::new(mock::MockTokenProvider::new()))
            }
            provider => Err(CredentialError::Configuration(format!(
                "Unknown credential provider: {}. Supported providers: client-credentials, static, mock",
                provider
            ))),
        }
    }
}
