//! # Filler Mesh Node
//!
//! ```text
//! node-runtime                 # run a node
//! node-runtime keygen <dir>    # write a fresh encrypted keystore
//! ```
//!
//! Configuration comes from the TOML file named by `FM_CONFIG` plus
//! environment overrides. The account key comes from `FM_IDENTITY_KEY` or
//! the V3 keystore at `identity.keystore`, unlocked with
//! `FM_KEYSTORE_PASSPHRASE`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use fm_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::keystore::PASSPHRASE_ENV;
use node_runtime::{
    generate_key_file, load_config, load_local_identity, spawn, NodeEvent, NodeHandle,
};
use zeroize::Zeroizing;
use shared_crypto::SigningIdentity;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => run().await,
        Some("keygen") => keygen(args.get(1)),
        Some(other) => bail!("unknown command {:?} (expected no arguments or `keygen <dir>`)", other),
    }
}

fn keygen(dir: Option<&String>) -> Result<()> {
    let Some(dir) = dir else {
        bail!("usage: {}=<passphrase> node-runtime keygen <dir>", PASSPHRASE_ENV);
    };
    let passphrase = std::env::var(PASSPHRASE_ENV)
        .map(Zeroizing::new)
        .with_context(|| format!("{} must hold the keystore passphrase", PASSPHRASE_ENV))?;
    if passphrase.is_empty() {
        bail!("{} must not be empty", PASSPHRASE_ENV);
    }

    let (identity, path) = generate_key_file(&PathBuf::from(dir), &passphrase)
        .context("Failed to generate keystore")?;
    println!("Wrote {}", path.display());
    println!("Address: {}", identity.address());
    Ok(())
}

async fn run() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Filler Mesh Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = load_config().context("Failed to load configuration")?;
    let identity =
        load_local_identity(&config.identity).context("Refusing to start without an account key")?;

    let mut node = spawn(config, identity).context("Failed to start node")?;
    info!(
        peer_id = %node.peer_id(),
        address = %node.address(),
        "Node running. Press Ctrl+C to stop."
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl+C")?;
                info!("Received shutdown signal");
                break;
            }
            event = node.next_event() => match event {
                Some(event) => report(&node, event),
                None => break,
            },
        }
    }

    node.shutdown().await;
    Ok(())
}

fn report(node: &NodeHandle, event: NodeEvent) {
    match event {
        NodeEvent::PeerVerified { peer, address } => info!(
            %peer,
            %address,
            verified_peers = node.registry().len(),
            "Peer bound to account"
        ),
        other => debug!(event = ?other, "Node event"),
    }
}
