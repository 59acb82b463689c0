//! Shared configuration and error handling for idbridge
//!
//! - Server configuration loaded from the environment
//! - The HTTP-facing error type and result alias

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::{Error, Result};
