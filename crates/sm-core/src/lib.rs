//! sm-core: Configuration and shared types for the synthetic monitoring agent
//!
//! This crate holds the pieces the agent binary and the API dialer both
//! need: the agent configuration, its error type, and the redacted API
//! token wrapper.

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::ApiToken;
