//! sm-agent: Synthetic monitoring agent API connection
//!
//! The agent dials the control-plane API server over gRPC, optionally
//! with TLS, and authenticates every call with a bearer token. The
//! resulting [`ApiChannel`] is handed to the generated RPC clients.

pub mod connection;
pub mod grpc;

pub use connection::{ApiConnector, ExponentialBackoff};
pub use grpc::{dial, resolve_host, ApiChannel, DialError, Dialer};
