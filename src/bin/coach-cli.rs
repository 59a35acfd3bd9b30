//! Client-side tool: session keys, tunnel discovery, and chat.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use tunnel_gossip::chat::{ChatClient, ChatSession};
use tunnel_gossip::config::{self, GossipConfig};
use tunnel_gossip::crypto::{SessionKeyPair, SessionPrivateKey};
use tunnel_gossip::discovery::{AlloyChainSource, ChainWatcher};
use tunnel_gossip::gossip::{GossipAddress, TunnelUrl};
use tunnel_gossip::lifecycle::{spawn_signal_listener, Shutdown};
use tunnel_gossip::observability::logging;

#[derive(Parser)]
#[command(name = "coach-cli")]
#[command(about = "Discover a coaching agent's tunnel URL and talk to it", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, global = true, env = "TUNNEL_GOSSIP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a session key pair and print both halves
    Keygen,
    /// Wait for the tunnel URL encrypted for a private key
    Watch {
        /// Session private key (base64 PEM)
        #[arg(long, env = "SESSION_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        /// Override the discovery timeout (0 = wait forever)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Generate keys, print the public half for the job, then watch
    Session {
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Chat with the agent behind a tunnel URL (one prompt per stdin line)
    Chat {
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_or_default(cli.config.as_deref())?;
    logging::init(&config.observability);

    match cli.command {
        Commands::Keygen => {
            let keys = SessionKeyPair::generate_with_bits(config.gossip.key_bits)?;
            println!("public:  {}", keys.public_key().to_base64()?);
            println!("private: {}", keys.private_key().to_base64()?);
        }
        Commands::Watch {
            private_key,
            timeout_secs,
        } => {
            let key = SessionPrivateKey::from_base64(&private_key)?;
            let url = watch(&config, key, timeout_secs).await?;
            println!("{}", url);
        }
        Commands::Session { timeout_secs } => {
            let (public, private) = SessionKeyPair::generate_with_bits(config.gossip.key_bits)?.into_parts();
            println!("Start the job with this argument:\n{}", public.to_base64()?);
            let url = watch(&config, private, timeout_secs).await?;
            println!("{}", url);
        }
        Commands::Chat { url } => {
            let url = TunnelUrl::parse(&url)?;
            chat(&config, &url).await?;
        }
    }

    Ok(())
}

async fn watch(
    config: &GossipConfig,
    key: SessionPrivateKey,
    timeout_override: Option<u64>,
) -> Result<TunnelUrl, Box<dyn std::error::Error>> {
    let gossip = GossipAddress::parse(&config.gossip.address)?;
    let source = AlloyChainSource::connect(
        &config.chain.ws_url,
        Duration::from_secs(config.chain.rpc_timeout_secs),
    )
    .await?;

    let mut watcher = ChainWatcher::new(source, gossip, key);
    match timeout_override.unwrap_or(config.discovery.timeout_secs) {
        0 => {}
        secs => watcher = watcher.with_deadline(Duration::from_secs(secs)),
    }

    let shutdown = Shutdown::new();
    let stopped = shutdown.notified();
    spawn_signal_listener(shutdown.clone());

    Ok(watcher.discover_until(stopped).await?)
}

async fn chat(config: &GossipConfig, url: &TunnelUrl) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ChatSession::new(ChatClient::new(url, &config.chat)?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        match session.ask(prompt).await {
            Ok(reply) => println!("{}", reply.content),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
