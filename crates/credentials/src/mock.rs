//! Static and Mock Token Providers
//!
//! `StaticTokenProvider` hands out a fixed token (local development against
//! a real API with a pre-issued token). `MockTokenProvider` records every
//! requested scope set and can be switched into a failing mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{AccessToken, CredentialError, TokenProvider};

/// Always returns the same token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire_token(&self, _scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new(self.token.clone(), None))
    }
}

/// Mock provider that records requests for test assertions.
#[derive(Debug, Clone)]
pub struct MockTokenProvider {
    requests: Arc<Mutex<Vec<Vec<String>>>>,
    failing: Arc<AtomicBool>,
}

impl MockTokenProvider {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make subsequent acquisitions fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every scope set requested so far, in order.
    pub fn recorded_requests(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .clone()
    }

    /// Number of tokens handed out so far.
    pub fn issued_count(&self) -> usize {
        self.recorded_requests().len()
    }
}

impl Default for MockTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TokenProvider for MockTokenProvider {
    async fn acquire_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        if self.failing.load(Ordering::SeqCst) {
            tracing::debug!("Mock token provider: failing acquisition");
            return Err(CredentialError::Request(
                "mock token provider configured to fail".to_string(),
            ));
        }

        let mut requests = self
            .requests
            .lock()
            .map_err(|e| CredentialError::Request(format!("requests lock poisoned: {e}")))?;
        requests.push(scopes.iter().map(|s| s.to_string()).collect());
        let token = format!("mock-token-{}", requests.len());

        tracing::debug!(count = requests.len(), "Mock token provider: issued token");
        Ok(AccessToken::new(token, None))
    }
}
