//! API server connector with retry
//!
//! Establishes the authenticated channel the agent's RPC clients run on.

use tokio_util::sync::CancellationToken;

use sm_core::config::AgentConfig;

use super::reconnect::ExponentialBackoff;
use crate::grpc::{error_chain, ApiChannel, BearerToken, DialError, Dialer};

/// Dials the API server described by an [`AgentConfig`]
pub struct ApiConnector {
    config: AgentConfig,
    dialer: Dialer,
}

impl ApiConnector {
    pub fn new(config: AgentConfig) -> Self {
        let dialer = Dialer::from_config(&config);
        Self { config, dialer }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Make a single dial attempt with a fresh credential provider
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<ApiChannel, DialError> {
        let credentials = BearerToken::new(self.config.api_token.expose());
        self.dialer.dial(cancel, credentials).await
    }

    /// Dial until connected, sleeping `backoff` between transient failures.
    ///
    /// Returns immediately on errors that a retry cannot fix (bad address,
    /// TLS setup, credential policy) and on cancellation, including
    /// cancellation during a backoff sleep.
    pub async fn connect_with_retry(
        &self,
        cancel: &CancellationToken,
        mut backoff: ExponentialBackoff,
    ) -> Result<ApiChannel, DialError> {
        loop {
            match self.connect(cancel).await {
                Ok(channel) => {
                    if backoff.attempts() > 0 {
                        tracing::info!(
                            address = %self.config.api_server_address,
                            retries = backoff.attempts(),
                            "Connected after retrying"
                        );
                    }
                    return Ok(channel);
                }
                Err(_) if cancel.is_cancelled() => return Err(DialError::Cancelled),
                Err(e) if !e.is_retryable() => {
                    tracing::error!(
                        error = %error_chain(&e),
                        "Giving up on API server connection"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        "Connection failed: {}. Retrying in {:?}",
                        error_chain(&e),
                        delay
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(DialError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_for(address: &str) -> AgentConfig {
        AgentConfig {
            api_server_address: address.to_string(),
            api_token: "token".into(),
            allow_insecure: true,
            connect_timeout: Duration::from_secs(5),
            ..AgentConfig::default()
        }
    }

    fn fast_backoff() -> ExponentialBackoff {
        ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(20), 2.0, 0.0)
    }

    #[tokio::test]
    async fn test_invalid_address_is_not_retried() {
        let connector = ApiConnector::new(config_for("bad host:80"));
        let cancel = CancellationToken::new();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            connector.connect_with_retry(&cancel, fast_backoff()),
        )
        .await
        .expect("non-retryable error should return immediately");
        assert!(matches!(result, Err(DialError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_retry_loop_stops_on_cancel() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let connector = ApiConnector::new(config_for(&address));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            connector.connect_with_retry(&cancel, fast_backoff()),
        )
        .await
        .expect("cancellation should end the retry loop");
        assert!(matches!(result, Err(e) if e.is_cancelled()));
    }
}
