//! Blocking dial of an authenticated API channel

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tonic::codegen::InterceptedService;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, info, warn};

use sm_core::config::AgentConfig;

use super::address::resolve_host;
use super::credentials::{BearerToken, CredentialsInterceptor, PerRpcCredentials};

/// Port dialed when the address names none
pub const DEFAULT_PORT: u16 = 443;

/// A connected channel whose every call carries `C`'s metadata
pub type AuthenticatedChannel<C> = InterceptedService<Channel, CredentialsInterceptor<C>>;

/// Channel handle to the API server, authenticated with a bearer token.
///
/// Cheap to clone; clones share the underlying HTTP/2 connection and can be
/// used concurrently. Pass it to any tonic-generated client's `new`.
pub type ApiChannel = AuthenticatedChannel<BearerToken>;

/// Errors returned by a dial attempt
#[derive(Debug, Error)]
pub enum DialError {
    /// The address could not be turned into a URI
    #[error("invalid API server address {address:?}")]
    InvalidEndpoint {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// TLS could not be configured for the server name
    #[error("TLS setup for {server_name:?} failed")]
    Tls {
        server_name: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// Network, handshake, or certificate verification failure
    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// Plaintext was selected for credentials that forbid it
    #[error("credentials require transport security, but an insecure connection was requested")]
    TransportSecurityRequired,

    /// The caller cancelled the dial
    #[error("dial cancelled")]
    Cancelled,

    /// The connect timeout elapsed before the connection was established
    #[error("dial timed out after {0:?}")]
    DeadlineExceeded(Duration),
}

impl DialError {
    /// True for caller-initiated aborts (cancellation or deadline)
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DialError::Cancelled | DialError::DeadlineExceeded(_))
    }

    /// True when dialing again later might succeed.
    ///
    /// Only consulted by callers that implement a retry policy; the dialer
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DialError::Connect { .. } | DialError::DeadlineExceeded(_)
        )
    }
}

/// Transport security chosen for a dial
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSecurity {
    /// Unencrypted HTTP/2, no server identity check
    Plaintext,
    /// TLS with the peer certificate checked against `server_name`
    Tls { server_name: String },
}

impl TransportSecurity {
    /// Pick transport security for `address`.
    ///
    /// TLS uses [`resolve_host`] of the address as the expected server name.
    pub fn select(address: &str, allow_insecure: bool) -> Self {
        if allow_insecure {
            TransportSecurity::Plaintext
        } else {
            TransportSecurity::Tls {
                server_name: resolve_host(address).to_string(),
            }
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, TransportSecurity::Tls { .. })
    }

    pub fn server_name(&self) -> Option<&str> {
        match self {
            TransportSecurity::Plaintext => None,
            TransportSecurity::Tls { server_name } => Some(server_name),
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            TransportSecurity::Plaintext => "http",
            TransportSecurity::Tls { .. } => "https",
        }
    }

    /// Build the tonic endpoint for `address` under this policy.
    ///
    /// An address without a port gets [`DEFAULT_PORT`] in both modes, not
    /// the scheme default of 80 for plaintext.
    pub fn endpoint(&self, address: &str) -> Result<Endpoint, DialError> {
        let invalid = |source: tonic::transport::Error| DialError::InvalidEndpoint {
            address: address.to_string(),
            source,
        };

        let mut endpoint =
            Endpoint::from_shared(format!("{}://{}", self.scheme(), address)).map_err(invalid)?;
        if endpoint.uri().port_u16().is_none() {
            let separator = if address.ends_with(':') { "" } else { ":" };
            endpoint = Endpoint::from_shared(format!(
                "{}://{}{}{}",
                self.scheme(),
                address,
                separator,
                DEFAULT_PORT
            ))
            .map_err(invalid)?;
        }

        match self {
            TransportSecurity::Plaintext => Ok(endpoint),
            TransportSecurity::Tls { server_name } => {
                let tls = ClientTlsConfig::new()
                    .domain_name(server_name.clone())
                    .with_native_roots();
                endpoint.tls_config(tls).map_err(|source| DialError::Tls {
                    server_name: server_name.clone(),
                    source,
                })
            }
        }
    }
}

/// Dials the API server.
///
/// A `Dialer` holds only connection parameters; credentials are passed per
/// dial so each channel gets its own provider.
#[derive(Debug, Clone)]
pub struct Dialer {
    address: String,
    allow_insecure: bool,
    connect_timeout: Option<Duration>,
}

impl Dialer {
    /// Dialer for `address` (`host` or `host:port`).
    ///
    /// A bare `host` is dialed on port 443, with or without TLS.
    pub fn new(address: impl Into<String>, allow_insecure: bool) -> Self {
        Self {
            address: address.into(),
            allow_insecure,
            connect_timeout: None,
        }
    }

    /// Dialer using the agent configuration's address, mode and timeout
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.api_server_address.clone(), config.allow_insecure)
            .connect_timeout(config.connect_timeout)
    }

    /// Give up with [`DialError::DeadlineExceeded`] after `timeout`
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn transport_security(&self) -> TransportSecurity {
        TransportSecurity::select(&self.address, self.allow_insecure)
    }

    /// Connect and attach `credentials` to every call on the channel.
    ///
    /// Does not return until the connection is up, `cancel` fires, the
    /// connect timeout elapses, or the connection fails. Dropping the
    /// in-flight connect on cancellation tears down any partial connection.
    pub async fn dial<C: PerRpcCredentials>(
        &self,
        cancel: &CancellationToken,
        credentials: C,
    ) -> Result<AuthenticatedChannel<C>, DialError> {
        let security = self.transport_security();

        if credentials.requires_transport_security() && !security.is_secure() {
            return Err(DialError::TransportSecurityRequired);
        }
        if !security.is_secure() {
            warn!(
                address = %self.address,
                "Dialing API server without transport security; the API token will be sent in plaintext"
            );
        }

        let endpoint = security.endpoint(&self.address)?;

        info!(
            address = %self.address,
            secure = security.is_secure(),
            server_name = security.server_name().unwrap_or_default(),
            "Dialing API server"
        );

        let connect = async {
            let attempt = endpoint.connect();
            let result = match self.connect_timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => return Err(DialError::DeadlineExceeded(limit)),
                },
                None => attempt.await,
            };
            result.map_err(|source| DialError::Connect {
                address: self.address.clone(),
                source,
            })
        };

        let channel = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(address = %self.address, "Dial cancelled");
                return Err(DialError::Cancelled);
            }
            result = connect => result?,
        };

        info!(address = %self.address, "Connected to API server");
        Ok(InterceptedService::new(
            channel,
            CredentialsInterceptor::new(credentials),
        ))
    }
}

/// Dial the API server at `endpoint`, authenticating every call with `token`.
///
/// A portless `endpoint` is dialed on port 443 in either mode.
/// With `allow_insecure` the connection is plaintext and the token is sent
/// unencrypted; otherwise TLS verifies the server against
/// [`resolve_host`]`(endpoint)`.
pub async fn dial(
    cancel: &CancellationToken,
    endpoint: &str,
    allow_insecure: bool,
    token: &str,
) -> Result<ApiChannel, DialError> {
    Dialer::new(endpoint, allow_insecure)
        .dial(cancel, BearerToken::new(token))
        .await
}

/// Render an error and its sources as `outer -> inner -> ...`.
///
/// tonic's transport errors only say "transport error" at the top level.
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        chain.push_str(" -> ");
        chain.push_str(&inner.to_string());
        source = inner.source();
    }
    chain
}
