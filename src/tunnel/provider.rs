//! Reverse tunnel abstraction.

use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::gossip::TunnelUrl;
use crate::observability::metrics;
use crate::tunnel::TunnelError;

/// Something that can expose a local port on a public URL.
pub trait TunnelProvider: Send + Sync {
    fn open(
        &self,
        local_port: u16,
        auth_token: &str,
    ) -> impl Future<Output = Result<Tunnel, TunnelError>> + Send;
}

/// An open tunnel. Closing or dropping it tears the forward down.
#[derive(Debug)]
pub struct Tunnel {
    public_url: TunnelUrl,
    local_port: u16,
    keepalive: Option<Keepalive>,
}

/// Background task holding a provider session open until `stop` fires or
/// is dropped.
#[derive(Debug)]
struct Keepalive {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Tunnel {
    /// A tunnel with nothing to keep alive (provider-managed or test double).
    pub fn new(public_url: TunnelUrl, local_port: u16) -> Self {
        Self {
            public_url,
            local_port,
            keepalive: None,
        }
    }

    /// A tunnel whose session lives in `task`; `task` must finish once
    /// `stop` fires or is dropped.
    pub fn with_keepalive(
        public_url: TunnelUrl,
        local_port: u16,
        stop: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            public_url,
            local_port,
            keepalive: Some(Keepalive { stop, task }),
        }
    }

    pub fn public_url(&self) -> &TunnelUrl {
        &self.public_url
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Stop forwarding and wait for the session to shut down.
    pub async fn close(mut self) {
        if let Some(Keepalive { stop, task }) = self.keepalive.take() {
            let _ = stop.send(());
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Tunnel session task failed");
            }
        }
        tracing::info!(url = %self.public_url, "Tunnel closed");
    }
}

/// Expose `local_port` publicly and return the open tunnel.
pub async fn open_tunnel<P: TunnelProvider>(
    provider: &P,
    local_port: u16,
    auth_token: &str,
) -> Result<Tunnel, TunnelError> {
    if auth_token.trim().is_empty() {
        metrics::record_tunnel_open("rejected");
        return Err(TunnelError::Rejected("empty auth token".to_string()));
    }

    match provider.open(local_port, auth_token).await {
        Ok(tunnel) => {
            metrics::record_tunnel_open("ok");
            tracing::info!(port = local_port, url = %tunnel.public_url(), "Port forwarded");
            Ok(tunnel)
        }
        Err(e) => {
            metrics::record_tunnel_open("failed");
            tracing::error!(port = local_port, error = %e, "Failed to open tunnel");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        calls: AtomicUsize,
    }

    impl TunnelProvider for FixedProvider {
        async fn open(&self, local_port: u16, _auth_token: &str) -> Result<Tunnel, TunnelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Tunnel::new(
                TunnelUrl::parse("https://abc123.ngrok.io").unwrap(),
                local_port,
            ))
        }
    }

    #[tokio::test]
    async fn test_open_tunnel_returns_provider_url() {
        let provider = FixedProvider { calls: AtomicUsize::new(0) };
        let tunnel = open_tunnel(&provider, 11434, "tok").await.unwrap();
        assert_eq!(tunnel.public_url().as_str(), "https://abc123.ngrok.io");
        assert_eq!(tunnel.local_port(), 11434);
        tunnel.close().await;
    }

    #[tokio::test]
    async fn test_empty_token_never_reaches_provider() {
        let provider = FixedProvider { calls: AtomicUsize::new(0) };
        let err = open_tunnel(&provider, 11434, "  ").await.unwrap_err();
        assert!(matches!(err, TunnelError::Rejected(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    fn session_task() -> (oneshot::Sender<()>, JoinHandle<()>, oneshot::Receiver<bool>) {
        let (stop, stopped) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let explicit = stopped.await.is_ok();
            let _ = done_tx.send(explicit);
        });
        (stop, task, done_rx)
    }

    #[tokio::test]
    async fn test_close_stops_session() {
        let (stop, task, done) = session_task();
        let tunnel = Tunnel::with_keepalive(
            TunnelUrl::parse("https://abc123.ngrok.io").unwrap(),
            11434,
            stop,
            task,
        );

        tunnel.close().await;
        assert!(done.await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_stops_session() {
        let (stop, task, done) = session_task();
        let tunnel = Tunnel::with_keepalive(
            TunnelUrl::parse("https://abc123.ngrok.io").unwrap(),
            11434,
            stop,
            task,
        );

        drop(tunnel);
        assert!(!done.await.unwrap());
    }
}
