//! idbridge Directory Client
//!
//! Authenticated user and group operations against a remote graph API:
//! - Lookup by federated identity, creation from a JSON template, enable/disable
//! - Group membership (member or owner) and listing of users and groups
//! - Mock directory for testing and development
//!
//! Every call acquires its own bearer token from the injected
//! [`TokenProvider`]; token caching is the provider's concern.

pub mod graph;
pub mod mock;
pub mod template;
pub mod types;

use std::sync::Arc;

use idbridge_credentials::{CredentialError, TokenProvider};
use thiserror::Error;

pub use types::{DirectoryIdentity, FederatedIdentity, Group, MembershipRole};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory configuration error: {0}")]
    Configuration(String),

    /// Token acquisition failed; no request was sent.
    #[error("Directory authentication failed: {0}")]
    AuthFailed(String),

    /// The directory answered with a non-success status.
    #[error("Directory call failed with status {status}: {body}")]
    CallFailed { status: u16, body: String },

    #[error("Directory request error: {0}")]
    Request(String),

    #[error("Directory response error: {0}")]
    Response(String),
}

impl From<CredentialError> for DirectoryError {
    fn from(err: CredentialError) -> Self {
        DirectoryError::AuthFailed(err.to_string())
    }
}

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Directory service configuration
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Directory provider (graph, mock)
    pub provider: String,
    /// API base including version segment
    pub base_url: String,
    /// Scope requested from the credential provider
    pub scope: String,
    /// Issuer of locally-created accounts, e.g. `contoso.onmicrosoft.com`
    pub local_identity_issuer: Option<String>,
    /// Application id owning the directory extension attributes
    pub extension_app_id: Option<String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            scope: DEFAULT_GRAPH_SCOPE.to_string(),
            local_identity_issuer: None,
            extension_app_id: None,
        }
    }
}

impl DirectoryConfig {
    /// Create directory config from environment variables
    pub fn from_env() -> Result<Self, DirectoryError> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            provider: std::env::var("DIRECTORY_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
            base_url: non_empty("GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            scope: non_empty("GRAPH_SCOPE").unwrap_or_else(|| DEFAULT_GRAPH_SCOPE.to_string()),
            local_identity_issuer: non_empty("LOCAL_IDENTITY_ISSUER"),
            extension_app_id: non_empty("EXTENSION_APP_ID"),
        })
    }
}

/// Directory operations.
///
/// Lookups distinguish "no match" (`Ok(None)`) from a failed call (`Err`).
/// `disable_user` and `add_to_group` are best-effort: failures are logged
/// where they are detected and reported only as `()` / `false`.
#[async_trait::async_trait]
pub trait DirectoryService: Send + Sync {
    /// Find the identity bound to `(issuer, id_value)`. The issuer defaults to
    /// the configured local identity issuer.
    async fn find_user(
        &self,
        id_value: &str,
        id_issuer: Option<&str>,
    ) -> Result<Option<DirectoryIdentity>, DirectoryError>;

    /// Create a user from a JSON template and return the new object id.
    async fn new_user(&self, template_json: &str) -> Result<String, DirectoryError>;

    /// Set `accountEnabled = !is_blocked`.
    async fn disable_user(&self, identity_id: &str, is_blocked: bool);

    /// Add a directory object to a group as member or owner.
    async fn add_to_group(&self, group_id: &str, member_id: &str, role: MembershipRole) -> bool;

    /// List locally-created accounts.
    async fn get_users(&self) -> Result<Vec<DirectoryIdentity>, DirectoryError>;

    /// List groups.
    async fn get_groups(&self) -> Result<Vec<Group>, DirectoryError>;
}

/// Factory for creating DirectoryService implementations
pub struct DirectoryServiceFactory;

impl DirectoryServiceFactory {
    pub fn create(
        config: DirectoryConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Box<dyn DirectoryService>, DirectoryError> {
        match config.provider.as_str() {
            "graph" => {
                tracing::info!(base_url = %config.base_url, "Creating graph directory client");
                Ok(Box::new(graph::GraphDirectoryClient::new(config, tokens)))
            }
            "mock" => {
                tracing::info!("Creating mock directory service");
                Ok(Box::new(mock::MockDirectoryService::with_config(config)))
            }
            provider => Err(DirectoryError::Configuration(format!(
                "Unknown directory provider: {}. Supported providers: graph, mock",
                provider
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idbridge_credentials::mock::MockTokenProvider;
    use serial_test::serial;

    #[test]
    fn test_factory_graph_and_mock_succeed() {
        let tokens: Arc<dyn TokenProvider> = Arc::new(MockTokenProvider::new());

        let graph = DirectoryConfig {
            provider: "graph".to_string(),
            ..DirectoryConfig::default()
        };
        assert!(DirectoryServiceFactory::create(graph, tokens.clone()).is_ok());
        assert!(DirectoryServiceFactory::create(DirectoryConfig::default(), tokens).is_ok());
    }

    #[test]
    fn test_factory_unknown_provider() {
        let config = DirectoryConfig {
            provider: "ldap".to_string(),
            ..DirectoryConfig::default()
        };
        let err = match DirectoryServiceFactory::create(config, Arc::new(MockTokenProvider::new()))
        {
            Err(e) => e,
            Ok(_) => panic!("Expected error for unknown provider"),
        };
        assert!(err.to_string().contains("Unknown directory provider: ldap"));
    }

    #[test]
    #[serial]
    fn test_config_from_env_ignores_blank_values() {
        std::env::set_var("LOCAL_IDENTITY_ISSUER", "contoso.onmicrosoft.com");
        std::env::set_var("EXTENSION_APP_ID", "  ");
        std::env::remove_var("GRAPH_BASE_URL");

        let config = DirectoryConfig::from_env().unwrap();

        std::env::remove_var("LOCAL_IDENTITY_ISSUER");
        std::env::remove_var("EXTENSION_APP_ID");

        assert_eq!(
            config.local_identity_issuer.as_deref(),
            Some("contoso.onmicrosoft.com")
        );
        assert!(config.extension_app_id.is_none());
        assert_eq!(config.base_url, DEFAULT_GRAPH_BASE_URL);
    }

    #[test]
    fn test_error_display() {
        let err = DirectoryError::CallFailed {
            status: 403,
            body: "Authorization_RequestDenied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Directory call failed with status 403: Authorization_RequestDenied"
        );

        let err: DirectoryError = CredentialError::Request("offline".to_string()).into();
        assert!(matches!(err, DirectoryError::AuthFailed(_)));
    }
}
