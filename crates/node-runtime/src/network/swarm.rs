//! Swarm construction.
//!
//! TCP with Noise and Yamux, DNS resolution, and a bare `libp2p_stream`
//! behaviour. The handshake protocol is registered on the stream control
//! rather than as a `NetworkBehaviour`.

use std::time::Duration;

use libp2p::{identity::Keypair, noise, tcp, yamux, Swarm};

use super::NodeError;

/// The behaviour driven by the node's swarm.
pub type NodeBehaviour = libp2p_stream::Behaviour;

/// Build a swarm for `keypair`.
pub fn build_swarm(
    keypair: Keypair,
    idle_connection_timeout: Duration,
) -> Result<Swarm<NodeBehaviour>, NodeError> {
    let swarm = libp2p::SwarmBuilder::with_existing_identity(keypair)
        .with_tokio()
        .with_tcp(
            tcp::Config::default(),
            noise::Config::new,
            yamux::Config::default,
        )
        .map_err(|e| NodeError::Transport(e.to_string()))?
        .with_dns()
        .map_err(|e| NodeError::Transport(e.to_string()))?
        .with_behaviour(|_| libp2p_stream::Behaviour::new())
        .map_err(|e| NodeError::Transport(e.to_string()))?
        .with_swarm_config(|c| c.with_idle_connection_timeout(idle_connection_timeout))
        .build();

    Ok(swarm)
}
