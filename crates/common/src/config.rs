//! Server configuration following 12-factor app principles
//!
//! Service-specific settings live with each integration crate
//! (`DirectoryConfig`, `InvitationConfig`, ...). This holds only what the
//! HTTP host itself needs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the local server binds to
    pub port: u16,

    /// Default tracing filter when RUST_LOG is unset
    pub rust_log: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got {raw}"))?,
            Err(_) => 3000,
        };

        Ok(Self {
            port,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "idbridge=debug".to_string()),
        })
    }
}
