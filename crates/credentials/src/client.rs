//! OAuth2 Client-Credentials Provider
//!
//! Requests app-only tokens from `{authority}/{tenant}/oauth2/v2.0/token`
//! and caches them per scope set until shortly before expiry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{AccessToken, CredentialConfig, CredentialError, TokenProvider};

/// Tokens expiring within this window are refreshed before use.
const REFRESH_GRACE_MINUTES: i64 = 5;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace: Duration) -> bool {
        Utc::now() + grace >= self.expires_at
    }
}

/// Client-credentials token provider with an in-memory cache.
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Arc<RwLock<HashMap<String, CachedToken>>>,
    grace: Duration,
}

impl ClientCredentialsProvider {
    pub fn new(config: CredentialConfig) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            config.authority_host.trim_end_matches('/'),
            config.tenant_id
        );
        Self {
            http: reqwest::Client::new(),
            token_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            cache: Arc::new(RwLock::new(HashMap::new())),
            grace: Duration::minutes(REFRESH_GRACE_MINUTES),
        }
    }

    async fn request_token(&self, scope: &str) -> Result<CachedToken, CredentialError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CredentialError::Request(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".to_string());
            return Err(CredentialError::Response(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            CredentialError::Response(format!("Failed to parse token response: {}", e))
        })?;

        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                CredentialError::Response(format!(
                    "Token lifetime of {} seconds is out of range",
                    token.expires_in
                ))
            })?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn acquire_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        if scopes.is_empty() {
            return Err(CredentialError::Configuration(
                "At least one scope is required".to_string(),
            ));
        }
        let scope = scopes.join(" ");

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&scope) {
                if !cached.is_expired(self.grace) {
                    tracing::debug!(scope = %scope, "Using cached access token");
                    return Ok(AccessToken::new(
                        cached.access_token.clone(),
                        Some(cached.expires_at),
                    ));
                }
            }
        }

        tracing::debug!(scope = %scope, "Requesting new access token");
        let fresh = self.request_token(&scope).await?;
        let token = AccessToken::new(fresh.access_token.clone(), Some(fresh.expires_at));

        self.cache.write().await.insert(scope, fresh);

        Ok(token)
    }
}
