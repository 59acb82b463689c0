//! Invitation assertion signing and verification (HS256)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{AssertionPayload, InvitationClaims};
use crate::{InvitationConfig, InvitationError};

/// Signs and verifies invitation assertions with a shared symmetric key.
pub(crate) struct TokenSigner {
    issuer: String,
    audience: String,
    validity: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    pub fn new(config: &InvitationConfig) -> Result<Self, InvitationError> {
        let validity = Duration::try_minutes(config.validity_minutes).ok_or_else(|| {
            InvitationError::Configuration(format!(
                "Validity window of {} minutes is out of range",
                config.validity_minutes
            ))
        })?;
        let key = config.signing_key.as_bytes();
        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            validity,
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
        })
    }

    pub fn sign(&self, claims: InvitationClaims) -> Result<String, InvitationError> {
        self.sign_at(claims, Utc::now())
    }

    /// Sign with `iat = nbf = now` and `exp = now + validity`.
    pub fn sign_at(
        &self,
        claims: InvitationClaims,
        now: DateTime<Utc>,
    ) -> Result<String, InvitationError> {
        let issued_at = now.timestamp();
        let expires_at = now.checked_add_signed(self.validity).ok_or_else(|| {
            InvitationError::Signing(format!("Expiry overflows when issued at {now}"))
        })?;
        let payload = AssertionPayload {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at,
            nbf: issued_at,
            exp: expires_at.timestamp(),
            claims: claims.into_inner(),
        };

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| InvitationError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<InvitationClaims, InvitationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        let data = decode::<AssertionPayload>(token, &self.decoding_key, &validation).map_err(
            |e| {
                tracing::debug!(error = %e, "Invitation token validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => InvitationError::Expired,
                    _ => InvitationError::InvalidToken(e.to_string()),
                }
            },
        )?;

        Ok(InvitationClaims::from_inner(data.claims.claims))
    }
}
