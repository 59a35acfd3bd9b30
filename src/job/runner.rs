//! The job's run sequence.

use alloy::primitives::TxHash;
use std::future::Future;

use crate::blockchain::BlockchainError;
use crate::crypto::SessionPublicKey;
use crate::job::output::JobOutput;
use crate::job::secrets::{AppSecrets, SecretsError};
use crate::job::JobError;
use crate::tunnel::{open_tunnel, GossipSender, PublishError, Tunnel, TunnelProvider, TunnelPublisher};

/// A tunnel that has been announced. Keep it alive to keep serving.
#[derive(Debug)]
pub struct LiveTunnel {
    pub tunnel: Tunnel,
    pub tx_hash: TxHash,
}

/// Runs secrets → session key → tunnel → publish, and always leaves a
/// status artifact behind.
#[derive(Debug)]
pub struct JobRunner<P> {
    provider: P,
    output: JobOutput,
    local_port: u16,
}

impl<P: TunnelProvider> JobRunner<P> {
    pub fn new(provider: P, output: JobOutput, local_port: u16) -> Self {
        Self {
            provider,
            output,
            local_port,
        }
    }

    /// Execute the job.
    ///
    /// `connect` builds the gossip sender from the gossip account key found
    /// in the secrets. The outcome is written to the output directory in
    /// every case: if the success artifacts cannot be written, the failure
    /// artifact is attempted instead. A failure to write that is only logged.
    pub async fn run<G, F, Fut>(
        &self,
        secrets: Result<AppSecrets, SecretsError>,
        session_public_key: &str,
        connect: F,
    ) -> Result<LiveTunnel, JobError>
    where
        G: GossipSender,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<G, BlockchainError>>,
    {
        match self.announce(secrets, session_public_key, connect).await {
            Ok(live) => match self.output.write_success().await {
                Ok(()) => {
                    tracing::info!(url = %live.tunnel.public_url(), tx_hash = %live.tx_hash, "Tunnel open");
                    Ok(live)
                }
                Err(e) => {
                    let e = JobError::from(e);
                    self.record_failure(&e).await;
                    Err(e)
                }
            },
            Err(e) => {
                self.record_failure(&e).await;
                Err(e)
            }
        }
    }

    async fn record_failure(&self, e: &JobError) {
        tracing::error!(error = %e, "Job failed");
        if let Err(write_err) = self.output.write_failure(&e.to_string()).await {
            tracing::error!(error = %write_err, "Failed to write failure artifact");
        }
    }

    async fn announce<G, F, Fut>(
        &self,
        secrets: Result<AppSecrets, SecretsError>,
        session_public_key: &str,
        connect: F,
    ) -> Result<LiveTunnel, JobError>
    where
        G: GossipSender,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<G, BlockchainError>>,
    {
        let secrets = secrets?;
        tracing::info!("App secrets loaded");

        let recipient = SessionPublicKey::from_base64(session_public_key)?;
        let sender = connect(secrets.gossip_private_key.clone())
            .await
            .map_err(PublishError::from)?;
        let publisher = TunnelPublisher::new(sender);

        let tunnel = open_tunnel(&self.provider, self.local_port, &secrets.ngrok_token).await?;
        let tx_hash = publisher.publish_url(tunnel.public_url(), &recipient).await?;

        Ok(LiveTunnel { tunnel, tx_hash })
    }
}
