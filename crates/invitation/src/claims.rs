//! Invitation claim set and JWT payload

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Claim that must always be present.
pub const EMAIL_CLAIM: &str = "email";

/// Registered claim names set from configuration; callers cannot supply them.
pub const RESERVED_CLAIMS: [&str; 5] = ["iss", "aud", "iat", "nbf", "exp"];

/// Claims embedded in an invitation token.
///
/// Keys are unique; inserting an existing key overwrites its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationClaims(BTreeMap<String, String>);

impl InvitationClaims {
    pub fn new(email: impl Into<String>) -> Self {
        let mut claims = BTreeMap::new();
        claims.insert(EMAIL_CLAIM.to_string(), email.into());
        Self(claims)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_CLAIM)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    pub(crate) fn from_inner(claims: BTreeMap<String, String>) -> Self {
        Self(claims)
    }
}

/// Wire payload of an invitation assertion.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionPayload {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub claims: BTreeMap<String, String>,
}
