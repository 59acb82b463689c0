//! Mock Directory Service Implementation
//!
//! In-memory users, groups and memberships for tests and local development.
//! Thread-safe via `Arc<Mutex<>>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use crate::template;
use crate::{
    DirectoryConfig, DirectoryError, DirectoryIdentity, DirectoryService, Group, MembershipRole,
};

#[derive(Debug, Default)]
struct MockDirectoryState {
    users: Vec<DirectoryIdentity>,
    groups: Vec<Group>,
    memberships: Vec<(String, String, MembershipRole)>,
    enabled: HashMap<String, bool>,
    fail_calls: bool,
}

/// In-memory directory that records mutations for test assertions.
#[derive(Debug, Clone, Default)]
pub struct MockDirectoryService {
    config: DirectoryConfig,
    state: Arc<Mutex<MockDirectoryState>>,
}

impl MockDirectoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve issuers and templates from `config` the way the Graph client does.
    pub fn with_config(config: DirectoryConfig) -> Self {
        Self {
            config,
            state: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockDirectoryState> {
        self.state
            .lock()
            .expect("directory lock poisoned")
    }

    /// Seed a user.
    pub fn insert_user(&self, user: DirectoryIdentity) {
        self.state().users.push(user);
    }

    /// Seed a group.
    pub fn insert_group(&self, group: Group) {
        self.state().groups.push(group);
    }

    /// Make every subsequent call fail as if the directory returned 503.
    pub fn set_failing(&self, failing: bool) {
        self.state().fail_calls = failing;
    }

    /// Recorded `(group_id, member_id, role)` relations.
    pub fn memberships(&self) -> Vec<(String, String, MembershipRole)> {
        self.state().memberships.clone()
    }

    /// Last enabled flag written for a user, if any.
    pub fn is_enabled(&self, user_id: &str) -> Option<bool> {
        self.state().enabled.get(user_id).copied()
    }

    pub fn users(&self) -> Vec<DirectoryIdentity> {
        self.state().users.clone()
    }

    fn unavailable() -> DirectoryError {
        DirectoryError::CallFailed {
            status: 503,
            body: "mock directory configured to fail".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl DirectoryService for MockDirectoryService {
    async fn find_user(
        &self,
        id_value: &str,
        id_issuer: Option<&str>,
    ) -> Result<Option<DirectoryIdentity>, DirectoryError> {
        let state = self.state();
        if state.fail_calls {
            return Err(Self::unavailable());
        }
        if id_value.is_empty() {
            return Ok(None);
        }
        let issuer = match id_issuer.filter(|i| !i.is_empty()) {
            Some(issuer) => issuer,
            None => self.config.local_identity_issuer.as_deref().ok_or_else(|| {
                DirectoryError::Configuration(
                    "No issuer given and LOCAL_IDENTITY_ISSUER is not configured".to_string(),
                )
            })?,
        };
        Ok(state
            .users
            .iter()
            .find(|u| u.has_identity(issuer, id_value))
            .cloned())
    }

    async fn new_user(&self, template_json: &str) -> Result<String, DirectoryError> {
        let mut state = self.state();
        if state.fail_calls {
            return Err(Self::unavailable());
        }

        let json = template::apply(
            template_json,
            self.config.local_identity_issuer.as_deref(),
            self.config.extension_app_id.as_deref(),
        );
        let mut user: DirectoryIdentity = serde_json::from_str(&json)
            .map_err(|e| DirectoryError::CallFailed {
                status: 400,
                body: format!("invalid user payload: {e}"),
            })?;
        user.id = Uuid::new_v4().to_string();
        user.extra.remove("passwordProfile");
        if !user.extra.contains_key("accountEnabled") {
            user.extra.insert("accountEnabled".to_string(), Value::Bool(true));
        }

        tracing::debug!(user_id = %user.id, "Mock directory: created user");
        let id = user.id.clone();
        state.users.push(user);
        Ok(id)
    }

    async fn disable_user(&self, identity_id: &str, is_blocked: bool) {
        let mut state = self.state();
        if state.fail_calls {
            tracing::warn!(user_id = %identity_id, "Mock directory: ignoring failed enable/disable");
            return;
        }
        state.enabled.insert(identity_id.to_string(), !is_blocked);
    }

    async fn add_to_group(&self, group_id: &str, member_id: &str, role: MembershipRole) -> bool {
        let mut state = self.state();
        if state.fail_calls {
            return false;
        }
        state
            .memberships
            .push((group_id.to_string(), member_id.to_string(), role));
        true
    }

    async fn get_users(&self) -> Result<Vec<DirectoryIdentity>, DirectoryError> {
        let state = self.state();
        if state.fail_calls {
            return Err(Self::unavailable());
        }
        Ok(state.users.clone())
    }

    async fn get_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        let state = self.state();
        if state.fail_calls {
            return Err(Self::unavailable());
        }
        Ok(state.groups.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FederatedIdentity;

    fn user(id: &str, issuer: &str, value: &str) -> DirectoryIdentity {
        DirectoryIdentity {
            id: id.to_string(),
            display_name: Some(format!("User {id}")),
            identities: vec![FederatedIdentity {
                sign_in_type: Some("emailAddress".to_string()),
                issuer: issuer.to_string(),
                issuer_assigned_id: Some(value.to_string()),
            }],
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_find_user_matches_issuer_and_value() {
        let directory = MockDirectoryService::new();
        directory.insert_user(user("u1", "contoso", "ada@example.com"));

        let found = directory
            .find_user("ada@example.com", Some("contoso"))
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some("u1".to_string()));

        let missing = directory
            .find_user("ada@example.com", Some("google.com"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_new_user_assigns_id_and_is_listed() {
        let directory = MockDirectoryService::new();
        let id = directory
            .new_user(r#"{"displayName":"Grace","identities":[{"issuer":"contoso","issuerAssignedId":"grace@example.com"}]}"#)
            .await
            .unwrap();

        let users = directory.get_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, id);
        assert_eq!(users[0].extra["accountEnabled"], Value::Bool(true));
    }

    fn configured() -> MockDirectoryService {
        MockDirectoryService::with_config(DirectoryConfig {
            local_identity_issuer: Some("contoso.onmicrosoft.com".to_string()),
            extension_app_id: Some("11112222-aaaa-bbbb-cccc-333344445555".to_string()),
            ..DirectoryConfig::default()
        })
    }

    #[tokio::test]
    async fn test_find_user_without_issuer_uses_local_issuer() {
        let directory = configured();
        directory.insert_user(user("u1", "contoso.onmicrosoft.com", "ada@example.com"));
        directory.insert_user(user("u2", "google.com", "grace@example.com"));

        let local = directory.find_user("ada@example.com", None).await.unwrap();
        assert_eq!(local.map(|u| u.id), Some("u1".to_string()));

        let federated = directory.find_user("grace@example.com", None).await.unwrap();
        assert!(federated.is_none());
    }

    #[tokio::test]
    async fn test_find_user_without_any_issuer_is_configuration_error() {
        let directory = MockDirectoryService::new();
        directory.insert_user(user("u1", "contoso.onmicrosoft.com", "ada@example.com"));

        let result = directory.find_user("ada@example.com", None).await;
        assert!(matches!(result, Err(DirectoryError::Configuration(_))));
        assert!(directory.find_user("", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_user_substitutes_issuer_and_extension_prefix() {
        let directory = configured();
        let id = directory
            .new_user(r#"{"displayName":"Grace","identities":[{"issuer":"{issuer}","issuerAssignedId":"grace@example.com"}],"extension_role":"admin"}"#)
            .await
            .unwrap();

        let found = directory
            .find_user("grace@example.com", Some("contoso.onmicrosoft.com"))
            .await
            .unwrap();
        assert_eq!(found.as_ref().map(|u| u.id.as_str()), Some(id.as_str()));
        let created = found.unwrap();
        assert_eq!(
            created.extra["extension_11112222aaaabbbbcccc333344445555_role"],
            Value::String("admin".to_string())
        );
        assert!(!created.extra.contains_key("extension_role"));
    }

    #[tokio::test]
    async fn test_mutations_are_recorded() {
        let directory = MockDirectoryService::new();

        directory.disable_user("u1", true).await;
        assert!(directory.add_to_group("g1", "u1", MembershipRole::Owner).await);

        assert_eq!(directory.is_enabled("u1"), Some(false));
        assert_eq!(
            directory.memberships(),
            vec![("g1".to_string(), "u1".to_string(), MembershipRole::Owner)]
        );
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let directory = MockDirectoryService::new();
        directory.set_failing(true);

        assert!(directory.get_groups().await.is_err());
        assert!(directory.find_user("x", None).await.is_err());
        assert!(!directory.add_to_group("g1", "u1", MembershipRole::Member).await);
        directory.disable_user("u1", true).await;
        assert_eq!(directory.is_enabled("u1"), None);
    }
}
