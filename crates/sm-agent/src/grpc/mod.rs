//! gRPC channel establishment for the API server
//!
//! Dials the control-plane API with either TLS (server name taken from the
//! endpoint) or plaintext, and attaches the agent's bearer token to every
//! call made on the resulting channel.

mod address;
mod credentials;
mod dialer;

pub use address::resolve_host;
pub use credentials::{BearerToken, CredentialsInterceptor, PerRpcCredentials, AUTHORIZATION_KEY};
pub use dialer::{
    dial, ApiChannel, AuthenticatedChannel, DialError, Dialer, TransportSecurity, DEFAULT_PORT,
};
pub(crate) use dialer::error_chain;
