//! Caller-side connection management for the API server
//!
//! The dialer in [`crate::grpc`] makes exactly one attempt. This module
//! owns the retry policy the agent applies on top of it.

mod connector;
mod reconnect;

pub use connector::ApiConnector;
pub use reconnect::ExponentialBackoff;
