//! Worker job entry point.
//!
//! ```text
//! argv[1] session public key ─┐
//! IEXEC_APP_DEVELOPER_SECRET ─┼─▶ open tunnel ─▶ publish URL ─▶ IEXEC_OUT artifacts
//! config file (optional)     ─┘                                   │
//!                                                  hold tunnel open until timeout/SIGTERM
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tunnel_gossip::blockchain::BlockchainClient;
use tunnel_gossip::config;
use tunnel_gossip::job::{AppSecrets, JobOutput, JobRunner};
use tunnel_gossip::lifecycle::{spawn_signal_listener, Shutdown};
use tunnel_gossip::observability::logging;
use tunnel_gossip::tunnel::{ChainGossipSender, NgrokTunnels};

#[derive(Parser)]
#[command(name = "tunnel-gossip")]
#[command(about = "Expose the local agent and announce its URL to one session", long_about = None)]
struct Args {
    /// Session public key (base64 PEM) supplied by the requester.
    session_public_key: String,

    /// Optional TOML configuration file.
    #[arg(short, long, env = "TUNNEL_GOSSIP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version are not failures.
            if e.use_stderr() {
                record_setup_failure(&e.to_string()).await;
            }
            e.exit();
        }
    };

    let config = match config::load_or_default(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            record_setup_failure(&e.to_string()).await;
            return Err(e.into());
        }
    };
    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tunnel-gossip job starting");

    let output = JobOutput::resolve(&config.job.output_dir)?;
    let runner = JobRunner::new(NgrokTunnels::new(&config.tunnel), output, config.tunnel.local_port);

    let chain = config.chain.clone();
    let live = runner
        .run(AppSecrets::from_env(), &args.session_public_key, move |key| async move {
            let client = BlockchainClient::new(chain).await?;
            ChainGossipSender::from_private_key(client, &key)
        })
        .await?;

    let shutdown = Shutdown::new();
    let stopped = shutdown.notified();
    spawn_signal_listener(shutdown.clone());

    let hold = Duration::from_secs(config.job.hold_secs);
    tracing::info!(hold_secs = hold.as_secs(), "Serving through tunnel");
    tokio::select! {
        _ = tokio::time::sleep(hold) => tracing::info!("Hold period over"),
        _ = stopped => tracing::info!("Shutdown requested"),
    }

    live.tunnel.close().await;
    tracing::info!("Job complete");
    Ok(())
}

/// Failure artifact for errors raised before the configured output
/// directory is known. Only `IEXEC_OUT` is consulted.
async fn record_setup_failure(message: &str) {
    if let Ok(output) = JobOutput::resolve("") {
        if let Err(e) = output.write_failure(message).await {
            eprintln!("Failed to write failure artifact: {}", e);
        }
    }
}
