//! ngrok tunnels opened in-process.
//!
//! One session per job: authenticate with the token, listen on an https
//! endpoint, and forward every connection to the local port. The session is
//! held by a background task until the [`Tunnel`] is closed or dropped.

use ngrok::prelude::*;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::config::TunnelConfig;
use crate::gossip::TunnelUrl;
use crate::tunnel::provider::{Tunnel, TunnelProvider};
use crate::tunnel::TunnelError;

/// Opens ngrok http endpoints forwarding to a local service.
#[derive(Debug, Clone)]
pub struct NgrokTunnels {
    forward_host: String,
    startup_timeout: Duration,
}

impl NgrokTunnels {
    pub fn new(config: &TunnelConfig) -> Self {
        Self {
            forward_host: config.forward_host.clone(),
            startup_timeout: Duration::from_secs(config.startup_timeout_secs),
        }
    }
}

impl TunnelProvider for NgrokTunnels {
    async fn open(&self, local_port: u16, auth_token: &str) -> Result<Tunnel, TunnelError> {
        let upstream = forward_url(&self.forward_host, local_port)?;

        let connect = async {
            let session = ngrok::Session::builder()
                .authtoken(auth_token.to_string())
                .connect()
                .await
                .map_err(|e| TunnelError::Connect(e.to_string()))?;
            tracing::debug!("Tunnel session established");

            let forwarder = session
                .http_endpoint()
                .listen_and_forward(upstream)
                .await
                .map_err(|e| TunnelError::Listen(e.to_string()))?;
            Ok::<_, TunnelError>((session, forwarder))
        };

        let (mut session, forwarder) = timeout(self.startup_timeout, connect)
            .await
            .map_err(|_| TunnelError::Timeout(self.startup_timeout))??;

        let public_url =
            TunnelUrl::parse(forwarder.url()).map_err(|e| TunnelError::Listen(e.to_string()))?;

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            // Fires on close() and when the tunnel is dropped.
            let _ = stopped.await;
            drop(forwarder);
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "Failed to close tunnel session");
            }
        });

        Ok(Tunnel::with_keepalive(public_url, local_port, stop, task))
    }
}

/// Upstream address the endpoint forwards to.
fn forward_url(host: &str, local_port: u16) -> Result<url::Url, TunnelError> {
    url::Url::parse(&format!("http://{}:{}", host, local_port))
        .map_err(|e| TunnelError::Listen(format!("invalid upstream {}:{}: {}", host, local_port, e)))
}
