//! # Discovery Node
//!
//! Runs the fork-aware discovery engine as a standalone process.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (TOML file given as first argument, else defaults)
//! 2. Load or generate the node key
//! 3. Attach the fork entry to the local record
//! 4. Bind the UDP engine and ping bootstrap nodes
//! 5. Run random lookups until Ctrl+C, logging compatible peers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fork_discovery::{
    CompatibilityGate, ConfigProvider, DiscoveryPipeline, LocalIdentity, NodeId, NodeRecord,
    NodeRecordConfig, RecordSigner, Secp256k1Signer, SharedNetworkConfig, StaticConfigProvider,
    SystemTimeSource, TomlConfigProvider, UdpDiscovery,
};

/// Pause between random lookups.
const LOOKUP_INTERVAL: Duration = Duration::from_secs(30);

fn load_config() -> Result<Box<dyn ConfigProvider>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let provider = TomlConfigProvider::load(&path)
                .with_context(|| format!("loading config from {path}"))?;
            info!(%path, "configuration loaded");
            Ok(Box::new(provider))
        }
        None => {
            warn!("no config file given, using defaults (pre-genesis, no bootstrap nodes)");
            Ok(Box::new(StaticConfigProvider::new()))
        }
    }
}

fn load_signer(config: &dyn ConfigProvider) -> Result<Secp256k1Signer> {
    match config.node_key() {
        Some(key) => Secp256k1Signer::from_bytes(key).context("invalid node_key"),
        None => {
            warn!("no node_key configured, using an ephemeral identity");
            Ok(Secp256k1Signer::random())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    let signer = Arc::new(load_signer(config.as_ref())?);

    let record = NodeRecord::new_unsigned(NodeRecordConfig {
        seq: 1,
        pubkey: signer.public_key(),
        ip: None,
        udp_port: None,
        tcp_port: None,
    });
    let identity = Arc::new(
        LocalIdentity::new(
            record,
            signer,
            SharedNetworkConfig::new(config.network_config()),
            config.genesis(),
            Arc::new(SystemTimeSource::new()),
        )
        .context("attaching fork entry to local record")?,
    );

    let engine = Arc::new(
        UdpDiscovery::start(
            config.discovery_config(),
            identity.clone(),
            &config.bootstrap_records(),
        )
        .await?,
    );
    let enr = engine
        .local_record()
        .to_text()
        .context("encoding local record")?;
    info!(%enr, "local node record");

    let pipeline = DiscoveryPipeline::new(
        engine.clone(),
        Arc::new(CompatibilityGate::new(identity.clone())),
    );

    info!("Node is running. Press Ctrl+C to stop.");
    let mut ticker = tokio::time::interval(LOOKUP_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = ticker.tick() => {
                let dialable = pipeline.discover(NodeId::random()).await;
                let stats = pipeline.stats();
                info!(
                    dialable = dialable.len(),
                    known_nodes = engine.known_nodes().await,
                    accepted = stats.accepted,
                    warned = stats.warned,
                    rejected = stats.rejected,
                    fork_digest = %identity.announced_fork_id().fork_digest,
                    "lookup finished"
                );
            }
        }
    }

    // Graceful shutdown
    engine.close().await;
    info!("discovery node stopped");
    Ok(())
}
