//! Directory object types

use serde::{Deserialize, Serialize};

/// A (issuer, issuer-assigned id) binding on a directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_type: Option<String>,
    pub issuer: String,
    pub issuer_assigned_id: Option<String>,
}

/// A user as returned by the directory.
///
/// Fields the directory returns beyond these are kept in `extra` so that
/// nothing is lost when the object is handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryIdentity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub identities: Vec<FederatedIdentity>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DirectoryIdentity {
    /// Whether this user carries a binding for `(issuer, value)`.
    pub fn has_identity(&self, issuer: &str, value: &str) -> bool {
        self.identities
            .iter()
            .any(|i| i.issuer == issuer && i.issuer_assigned_id.as_deref() == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Relation used when adding an object to a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    #[default]
    Member,
    Owner,
}

impl MembershipRole {
    pub fn from_owner_flag(as_owner: bool) -> Self {
        if as_owner {
            MembershipRole::Owner
        } else {
            MembershipRole::Member
        }
    }

    /// Navigation property on the group: `members` or `owners`.
    pub fn relation(self) -> &'static str {
        match self {
            MembershipRole::Member => "members",
            MembershipRole::Owner => "owners",
        }
    }

    /// Owners must be users; members may be any directory object.
    pub fn object_type(self) -> &'static str {
        match self {
            MembershipRole::Member => "directoryObjects",
            MembershipRole::Owner => "users",
        }
    }
}
