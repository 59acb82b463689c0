//! HTTP surface over the directory, invitation and mail services

pub mod handlers;
mod routes;

pub use routes::routes;

use idbridge_common::Error;
use idbridge_directory::DirectoryError;
use idbridge_invitation::InvitationError;

/// Map a directory failure onto an API error. Remote failures become 502.
pub(crate) fn directory_error(err: DirectoryError) -> Error {
    match err {
        DirectoryError::Configuration(msg) => Error::Configuration(msg),
        DirectoryError::AuthFailed(_)
        | DirectoryError::CallFailed { .. }
        | DirectoryError::Request(_)
        | DirectoryError::Response(_) => Error::Upstream(err.to_string()),
    }
}

pub(crate) fn invitation_error(err: InvitationError) -> Error {
    match err {
        InvitationError::Configuration(msg) => Error::Configuration(msg),
        InvitationError::Validation(msg) | InvitationError::InvalidToken(msg) => {
            Error::Validation(msg)
        }
        InvitationError::Expired => Error::Validation(err.to_string()),
        InvitationError::Signing(msg) => Error::Internal(msg),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use idbridge_directory::mock::MockDirectoryService;
    use idbridge_directory::DirectoryConfig;
    use idbridge_email::mock::MockEmailService;
    use idbridge_invitation::{InvitationConfig, InvitationService};

    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::AppState;

    /// State over mock services, with handles kept for assertions
    pub(crate) struct Mocks {
        pub state: AppState,
        pub directory: MockDirectoryService,
        pub email: MockEmailService,
    }

    pub(crate) fn invitation_config() -> InvitationConfig {
        InvitationConfig {
            tenant_name: "contosob2c".to_string(),
            client_id: "00000000-1111-2222-3333-444444444444".to_string(),
            issuer: "https://app.example.com".to_string(),
            audience: "contosob2c-invitations".to_string(),
            policy: "B2C_1A_INVITATION".to_string(),
            signing_key: "test-signing-key-that-is-long-enough".to_string(),
            validity_minutes: 60,
            redirect_uri: "https://app.example.com/signin-oidc".to_string(),
            domain_mappings: HashMap::from([("contoso.com".to_string(), "contoso".to_string())]),
        }
    }

    pub(crate) fn mock_state() -> Mocks {
        let directory = MockDirectoryService::with_config(DirectoryConfig {
            local_identity_issuer: Some("contoso.onmicrosoft.com".to_string()),
            ..DirectoryConfig::default()
        });
        let email = MockEmailService::new();
        let invitations = InvitationService::new(invitation_config()).unwrap();

        Mocks {
            state: AppState {
                directory: Arc::new(directory.clone()),
                invitations: Arc::new(invitations),
                email: Arc::new(email.clone()),
            },
            directory,
            email,
        }
    }

    /// Run one request through the full router
    pub(crate) async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = crate::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub(crate) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_directory_errors_map_to_bad_gateway() {
        let call = directory_error(DirectoryError::CallFailed {
            status: 403,
            body: "Forbidden".to_string(),
        });
        assert_eq!(call.status_code(), StatusCode::BAD_GATEWAY);

        let auth = directory_error(DirectoryError::AuthFailed("no token".to_string()));
        assert_eq!(auth.status_code(), StatusCode::BAD_GATEWAY);

        let config = directory_error(DirectoryError::Configuration("no issuer".to_string()));
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invitation_errors_map_to_status() {
        let reserved = invitation_error(InvitationError::Validation("exp".to_string()));
        assert_eq!(reserved.status_code(), StatusCode::BAD_REQUEST);

        let expired = invitation_error(InvitationError::Expired);
        assert_eq!(expired.status_code(), StatusCode::BAD_REQUEST);

        let signing = invitation_error(InvitationError::Signing("bad key".to_string()));
        assert_eq!(signing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
