//! idbridge application composition root
//!
//! Wires the credential provider, directory client, invitation issuer and
//! mail delivery into one [`AppState`] and exposes them over HTTP.

pub mod api;
pub mod flows;

use std::sync::Arc;

use axum::Router;
use idbridge_credentials::{CredentialConfig, TokenProvider, TokenProviderFactory};
use idbridge_directory::{DirectoryConfig, DirectoryService, DirectoryServiceFactory};
use idbridge_email::{EmailConfig, EmailService, EmailServiceFactory};
use idbridge_invitation::{InvitationConfig, InvitationService};

/// Services shared by every request
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn DirectoryService>,
    pub invitations: Arc<InvitationService>,
    pub email: Arc<dyn EmailService>,
}

impl AppState {
    /// Build every service from environment configuration
    pub async fn from_env() -> Result<Self, anyhow::Error> {
        let credential_config = CredentialConfig::from_env()?;
        let tokens: Arc<dyn TokenProvider> =
            Arc::from(TokenProviderFactory::create(credential_config)?);

        let directory_config = DirectoryConfig::from_env()?;
        let directory = DirectoryServiceFactory::create(directory_config, tokens)?;

        let invitations = InvitationService::new(InvitationConfig::from_env()?)?;

        let email_config = EmailConfig::from_env()?;
        let email = EmailServiceFactory::create(email_config).await?;

        Ok(Self {
            directory: Arc::from(directory),
            invitations: Arc::new(invitations),
            email: Arc::from(email),
        })
    }
}

/// Create the main application router from environment configuration
pub async fn create_app() -> Result<Router, anyhow::Error> {
    let state = AppState::from_env().await?;
    Ok(router(state))
}

/// Router over an already-built state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::routes().with_state(state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
