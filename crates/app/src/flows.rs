//! Multi-step operations spanning more than one service
//!
//! Neither flow retries or compensates. A mail that fails to send leaves the
//! issued URL valid, and a failed group add leaves the created user in place.

use std::collections::HashMap;

use idbridge_directory::{DirectoryError, MembershipRole};
use idbridge_invitation::InvitationError;

use crate::AppState;

/// Result of issuing and mailing an invitation
#[derive(Debug, Clone)]
pub struct InvitationOutcome {
    pub url: String,
    /// Whether the mail provider accepted the message
    pub sent: bool,
}

/// Result of creating a user
#[derive(Debug, Clone)]
pub struct ProvisionedUser {
    pub id: String,
    /// `None` when no group was requested
    pub added_to_group: Option<bool>,
}

/// Issue an invitation URL for `email` and mail it to the invitee.
pub async fn send_invitation(
    state: &AppState,
    email: &str,
    display_name: &str,
    claims: Option<&HashMap<String, String>>,
    params: Option<&[(String, String)]>,
) -> Result<InvitationOutcome, InvitationError> {
    let url = state.invitations.invite(email, claims, params)?;
    let sent = state.email.send_invitation(email, display_name, &url).await;

    if !sent {
        tracing::warn!(email = %email, "Invitation issued but not delivered");
    }

    Ok(InvitationOutcome { url, sent })
}

/// Create a user from `template_json`, then optionally add it to a group.
pub async fn provision_user(
    state: &AppState,
    template_json: &str,
    group_id: Option<&str>,
    role: MembershipRole,
) -> Result<ProvisionedUser, DirectoryError> {
    let id = state.directory.new_user(template_json).await?;

    let added_to_group = match group_id.filter(|g| !g.is_empty()) {
        Some(group_id) => Some(state.directory.add_to_group(group_id, &id, role).await),
        None => None,
    };

    Ok(ProvisionedUser { id, added_to_group })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{mock_state, Mocks};

    #[tokio::test]
    async fn test_send_invitation_mails_issued_url() {
        let Mocks { state, email, .. } = mock_state();

        let outcome = send_invitation(&state, "ada@example.com", "Ada", None, None)
            .await
            .unwrap();

        assert!(outcome.sent);
        assert_eq!(
            email.get_invitation_url_for("ada@example.com").as_deref(),
            Some(outcome.url.as_str())
        );
    }

    #[tokio::test]
    async fn test_send_invitation_reports_undelivered_mail() {
        let Mocks { mut state, .. } = mock_state();
        state.email = std::sync::Arc::new(idbridge_email::mock::MockEmailService::new_failing());

        let outcome = send_invitation(&state, "ada@example.com", "Ada", None, None)
            .await
            .unwrap();

        assert!(!outcome.sent);
        assert!(outcome.url.contains("login_hint=ada@example.com"));
    }

    #[tokio::test]
    async fn test_provision_user_adds_to_group_as_owner() {
        let Mocks {
            state, directory, ..
        } = mock_state();

        let user = provision_user(
            &state,
            r#"{"displayName":"Ada"}"#,
            Some("group-1"),
            MembershipRole::Owner,
        )
        .await
        .unwrap();

        assert_eq!(user.added_to_group, Some(true));
        assert_eq!(
            directory.memberships(),
            vec![("group-1".to_string(), user.id, MembershipRole::Owner)]
        );
    }

    #[tokio::test]
    async fn test_provision_user_without_group() {
        let Mocks {
            state, directory, ..
        } = mock_state();

        let user = provision_user(&state, r#"{"displayName":"Ada"}"#, None, MembershipRole::Member)
            .await
            .unwrap();

        assert_eq!(user.added_to_group, None);
        assert!(directory.memberships().is_empty());
        assert_eq!(directory.users().len(), 1);
    }
}
