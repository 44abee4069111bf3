//! # Live Nodes
//!
//! Full nodes started through `node_runtime::spawn`, talking over
//! localhost TCP with Noise and Yamux.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fm_01_handshake::{keypair_from_identity, peer_identity_of, HandshakeRole};
    use libp2p::{Multiaddr, PeerId};
    use node_runtime::{spawn, ConfigError, NodeConfig, NodeError, NodeEvent, NodeHandle};
    use shared_crypto::{Secp256k1Identity, SigningIdentity};
    use shared_types::AccountAddress;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(30);

    fn local_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.network.listen_addrs = vec!["/ip4/127.0.0.1/tcp/0".to_string()];
        config
    }

    async fn listen_addr(node: &mut NodeHandle) -> Multiaddr {
        timeout(WAIT, async {
            loop {
                match node.next_event().await {
                    Some(NodeEvent::Listening { address }) => return address,
                    Some(_) => continue,
                    None => panic!("node stopped before listening"),
                }
            }
        })
        .await
        .expect("no listen address")
    }

    async fn verified(node: &mut NodeHandle, remote: PeerId) -> AccountAddress {
        timeout(WAIT, async {
            loop {
                match node.next_event().await {
                    Some(NodeEvent::PeerVerified { peer, address }) if peer == remote => {
                        return address
                    }
                    Some(_) => continue,
                    None => panic!("node stopped before verifying {}", remote),
                }
            }
        })
        .await
        .expect("peer was not verified in time")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_nodes_bind_each_other() {
        let alice_key = Secp256k1Identity::generate();
        let bob_key = Secp256k1Identity::generate();
        let alice_peer = keypair_from_identity(&alice_key)
            .unwrap()
            .public()
            .to_peer_id();
        let alice_address = alice_key.address();
        let bob_address = bob_key.address();

        let mut alice = spawn(local_config(), alice_key).unwrap();
        let mut bob = spawn(local_config(), bob_key).unwrap();
        assert_eq!(alice.peer_id(), alice_peer);
        assert_eq!(alice.address(), alice_address);

        let addr = listen_addr(&mut alice).await;
        bob.dial(addr).unwrap();

        let bob_peer = bob.peer_id();
        assert_eq!(verified(&mut alice, bob_peer).await, bob_address);
        assert_eq!(verified(&mut bob, alice_peer).await, alice_address);

        assert_eq!(
            alice.registry().lookup(&peer_identity_of(&bob_peer)),
            Some(bob_address)
        );
        assert_eq!(
            bob.registry().lookup(&peer_identity_of(&alice_peer)),
            Some(alice_address)
        );

        alice.shutdown().await;
        bob.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bootstrap_nodes_are_dialed_at_startup() {
        let mut alice = spawn(local_config(), Secp256k1Identity::generate()).unwrap();
        let addr = listen_addr(&mut alice).await;

        let mut config = local_config();
        config.network.bootstrap_nodes = vec!["not-a-multiaddr".to_string(), addr.to_string()];
        let bob_key = Secp256k1Identity::generate();
        let bob_address = bob_key.address();
        let bob = spawn(config, bob_key).unwrap();

        assert_eq!(verified(&mut alice, bob.peer_id()).await, bob_address);

        alice.shutdown().await;
        bob.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_protocol_mismatch_binds_nobody() {
        let mut alice = spawn(local_config(), Secp256k1Identity::generate()).unwrap();
        let addr = listen_addr(&mut alice).await;

        let mut config = local_config();
        config.handshake.protocol = "/someoneElse/handshake/1.0.0".to_string();
        let bob = spawn(config, Secp256k1Identity::generate()).unwrap();
        bob.dial(addr).unwrap();

        let bob_peer = bob.peer_id();
        let event = timeout(WAIT, async {
            loop {
                match alice.next_event().await {
                    Some(event @ NodeEvent::HandshakeFailed { .. }) => return event,
                    Some(NodeEvent::PeerVerified { .. }) => panic!("peer verified across protocols"),
                    Some(_) => continue,
                    None => panic!("node stopped"),
                }
            }
        })
        .await
        .expect("handshake did not fail in time");

        match event {
            NodeEvent::HandshakeFailed { peer, role, .. } => {
                assert_eq!(peer, bob_peer);
                assert_eq!(role, HandshakeRole::Initiator);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(alice.registry().is_empty());
        assert!(bob.registry().is_empty());

        alice.shutdown().await;
        bob.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_settings_fail_startup() {
        let mut config = local_config();
        config.handshake.protocol = "gaslessOrder".to_string();
        assert!(matches!(
            spawn(config, Secp256k1Identity::generate()),
            Err(NodeError::Config(ConfigError::Invalid(_)))
        ));

        let mut config = local_config();
        config.network.listen_addrs = vec!["/ip4/127.0.0.1/udp/0".to_string()];
        assert!(matches!(
            spawn(config, Secp256k1Identity::generate()),
            Err(NodeError::Listen { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_intervals_fail_startup_instead_of_panicking() {
        let mut config = local_config();
        config.network.status_interval_secs = 0;
        assert!(matches!(
            spawn(config, Secp256k1Identity::generate()),
            Err(NodeError::Config(_))
        ));

        let mut config = local_config();
        config.network.idle_connection_timeout_secs = 0;
        assert!(matches!(
            spawn(config, Secp256k1Identity::generate()),
            Err(NodeError::Config(_))
        ));

        let mut config = local_config();
        config.handshake.io_timeout_secs = 0;
        assert!(matches!(
            spawn(config, Secp256k1Identity::generate()),
            Err(NodeError::Config(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_handle_stops_the_swarm() {
        let mut alice = spawn(local_config(), Secp256k1Identity::generate()).unwrap();
        let addr = listen_addr(&mut alice).await;
        drop(alice);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // With the swarm loop gone, nothing answers the handshake.
        let mut bob = spawn(local_config(), Secp256k1Identity::generate()).unwrap();
        bob.dial(addr).unwrap();
        let outcome = timeout(Duration::from_secs(5), async {
            loop {
                match bob.next_event().await {
                    Some(NodeEvent::PeerVerified { .. }) => return true,
                    Some(_) => continue,
                    None => return false,
                }
            }
        })
        .await;
        assert!(!matches!(outcome, Ok(true)));
        assert!(bob.registry().is_empty());

        bob.shutdown().await;
    }
}
