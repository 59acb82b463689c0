//! idbridge Invitation Token Issuer
//!
//! Builds single-use, time-bounded redirect URLs that hand an invitation or
//! login flow to a hosted B2C policy. The URL carries an HS256-signed client
//! assertion proving that this system invited a specific email; the token
//! itself is the state and expires on its own.
//!
//! Issuing is synchronous and touches no shared mutable state.

pub mod authorize;
pub mod claims;
mod token;

use std::collections::HashMap;

use chrono::{TimeDelta, Utc};
use thiserror::Error;

pub use claims::InvitationClaims;
use claims::RESERVED_CLAIMS;
use token::TokenSigner;

#[derive(Error, Debug)]
pub enum InvitationError {
    #[error("Invitation configuration error: {0}")]
    Configuration(String),

    #[error("Invitation validation error: {0}")]
    Validation(String),

    #[error("Invitation signing error: {0}")]
    Signing(String),

    #[error("Invalid invitation token: {0}")]
    InvalidToken(String),

    #[error("Invitation token expired")]
    Expired,
}

/// Invitation issuer configuration
#[derive(Clone)]
pub struct InvitationConfig {
    /// B2C tenant short name (`contoso` in `contoso.b2clogin.com`)
    pub tenant_name: String,
    /// Application registered in the B2C tenant
    pub client_id: String,
    /// `iss` of issued assertions
    pub issuer: String,
    /// `aud` of issued assertions
    pub audience: String,
    /// Custom policy handling the invitation
    pub policy: String,
    /// Shared HS256 key, also configured in the policy
    pub signing_key: String,
    /// Lifetime of an invitation in minutes
    pub validity_minutes: i64,
    /// Where the policy posts the authorization code
    pub redirect_uri: String,
    /// Lower-case email domain -> domain hint understood by the policy
    pub domain_mappings: HashMap<String, String>,
}

impl std::fmt::Debug for InvitationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationConfig")
            .field("tenant_name", &self.tenant_name)
            .field("client_id", &self.client_id)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("policy", &self.policy)
            .field("signing_key", &"[REDACTED]")
            .field("validity_minutes", &self.validity_minutes)
            .field("redirect_uri", &self.redirect_uri)
            .field("domain_mappings", &self.domain_mappings)
            .finish()
    }
}

fn required(key: &str) -> Result<String, InvitationError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| InvitationError::Configuration(format!("{} is required", key)))
}

/// Parse `domain=hint,domain=hint`. Domains are lower-cased.
pub fn parse_domain_mappings(raw: &str) -> Result<HashMap<String, String>, InvitationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (domain, hint) = entry.split_once('=').ok_or_else(|| {
                InvitationError::Configuration(format!(
                    "Invalid domain mapping '{}', expected domain=hint",
                    entry
                ))
            })?;
            Ok((domain.trim().to_lowercase(), hint.trim().to_string()))
        })
        .collect()
}

impl InvitationConfig {
    /// Create invitation config from environment variables
    pub fn from_env() -> Result<Self, InvitationError> {
        let validity_minutes = match std::env::var("INVITATION_VALIDITY_MINUTES") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                InvitationError::Configuration(format!(
                    "INVITATION_VALIDITY_MINUTES must be an integer, got {}",
                    raw
                ))
            })?,
            Err(_) => 60 * 24 * 7,
        };

        let domain_mappings = match std::env::var("INVITATION_DOMAIN_MAPPINGS") {
            Ok(raw) => parse_domain_mappings(&raw)?,
            Err(_) => HashMap::new(),
        };

        let config = Self {
            tenant_name: required("B2C_TENANT_NAME")?,
            client_id: required("B2C_CLIENT_ID")?,
            issuer: required("INVITATION_ISSUER")?,
            audience: required("INVITATION_AUDIENCE")?,
            policy: required("B2C_POLICY")?,
            signing_key: required("INVITATION_SIGNING_KEY")?,
            validity_minutes,
            redirect_uri: required("B2C_REDIRECT_URI")?,
            domain_mappings,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InvitationError> {
        if self.validity_minutes <= 0 {
            return Err(InvitationError::Configuration(format!(
                "Validity window must be positive, got {} minutes",
                self.validity_minutes
            )));
        }
        let fits = TimeDelta::try_minutes(self.validity_minutes)
            .and_then(|validity| Utc::now().checked_add_signed(validity))
            .is_some();
        if !fits {
            return Err(InvitationError::Configuration(format!(
                "Validity window of {} minutes is out of range",
                self.validity_minutes
            )));
        }
        for (name, value) in [
            ("tenant name", &self.tenant_name),
            ("client id", &self.client_id),
            ("policy", &self.policy),
            ("signing key", &self.signing_key),
        ] {
            if value.is_empty() {
                return Err(InvitationError::Configuration(format!(
                    "Invitation {} must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Issues invitation URLs and verifies the assertions they carry.
pub struct InvitationService {
    config: InvitationConfig,
    signer: TokenSigner,
}

impl InvitationService {
    pub fn new(config: InvitationConfig) -> Result<Self, InvitationError> {
        config.validate()?;
        let signer = TokenSigner::new(&config)?;
        Ok(Self { config, signer })
    }

    pub fn config(&self) -> &InvitationConfig {
        &self.config
    }

    /// Build the invitation URL for `email`.
    ///
    /// `additional_claims` are merged over the base `email` claim.
    /// `optional_params` are appended as `&key=value` without encoding; callers
    /// encode their own values. A `domain_hint` follows when the email's
    /// domain is mapped.
    pub fn invite(
        &self,
        email: &str,
        additional_claims: Option<&HashMap<String, String>>,
        optional_params: Option<&[(String, String)]>,
    ) -> Result<String, InvitationError> {
        let mut claims = InvitationClaims::new(email);
        if let Some(extra) = additional_claims {
            for (name, value) in extra {
                if RESERVED_CLAIMS.contains(&name.as_str()) {
                    return Err(InvitationError::Validation(format!(
                        "Claim '{}' is set by the issuer and cannot be supplied",
                        name
                    )));
                }
                claims.insert(name.as_str(), value.as_str());
            }
        }

        let assertion = self.signer.sign(claims)?;
        let mut url = authorize::authorize_url(&self.config, email, &assertion);

        if let Some(params) = optional_params {
            authorize::append_params(&mut url, params);
        }

        if let Some(hint) = authorize::domain_hint(&self.config.domain_mappings, email) {
            authorize::append_params(&mut url, &[("domain_hint", hint)]);
        }

        tracing::info!(
            policy = %self.config.policy,
            validity_minutes = self.config.validity_minutes,
            "Invitation issued"
        );
        Ok(url)
    }

    /// Verify an assertion issued by this service and return its claims.
    pub fn verify(&self, assertion: &str) -> Result<InvitationClaims, InvitationError> {
        self.signer.verify(assertion)
    }
}
