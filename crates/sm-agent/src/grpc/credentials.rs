//! Per-call credentials attached to every request on an API channel

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// Metadata key carrying the bearer token
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Authentication material the transport attaches to each outbound call.
///
/// The dialer queries `requires_transport_security` once per dial; the
/// interceptor calls `request_metadata` for every request on the channel.
pub trait PerRpcCredentials: Send + Sync + 'static {
    /// Metadata entries to add to the next request.
    fn request_metadata(&self) -> Result<HashMap<String, String>, Status>;

    /// Whether these credentials may only be sent over an encrypted channel.
    fn requires_transport_security(&self) -> bool;
}

/// Bearer token credentials for the API server.
///
/// # Security
///
/// `requires_transport_security` always returns `false`. When the operator
/// dials with `allow_insecure`, the token is sent in plaintext. The dialer
/// logs a warning in that case; nothing here refuses it.
#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    /// Bind credentials to `token`. The token is not validated.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl PerRpcCredentials for BearerToken {
    fn request_metadata(&self) -> Result<HashMap<String, String>, Status> {
        Ok(HashMap::from([(
            AUTHORIZATION_KEY.to_string(),
            format!("Bearer {}", self.token),
        )]))
    }

    fn requires_transport_security(&self) -> bool {
        tracing::info!(
            credentials = "bearer",
            requires_transport_security = false,
            "Bearer token credentials permit plaintext transport"
        );
        false
    }
}

/// Adapts [`PerRpcCredentials`] to a tonic interceptor.
///
/// Clones of one channel share the same credentials.
pub struct CredentialsInterceptor<C> {
    credentials: Arc<C>,
}

impl<C: PerRpcCredentials> CredentialsInterceptor<C> {
    pub fn new(credentials: C) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }
}

impl<C> Clone for CredentialsInterceptor<C> {
    fn clone(&self) -> Self {
        Self {
            credentials: Arc::clone(&self.credentials),
        }
    }
}

impl<C> fmt::Debug for CredentialsInterceptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsInterceptor").finish_non_exhaustive()
    }
}

impl<C: PerRpcCredentials> Interceptor for CredentialsInterceptor<C> {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        for (name, value) in self.credentials.request_metadata()? {
            let key = AsciiMetadataKey::from_bytes(name.as_bytes()).map_err(|e| {
                Status::unauthenticated(format!("invalid credential metadata key {name:?}: {e}"))
            })?;
            let mut value = AsciiMetadataValue::try_from(value.as_str()).map_err(|e| {
                Status::unauthenticated(format!("invalid credential metadata value for {name:?}: {e}"))
            })?;
            value.set_sensitive(true);
            request.metadata_mut().insert(key, value);
        }
        Ok(request)
    }
}
