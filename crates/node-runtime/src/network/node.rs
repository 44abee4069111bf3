//! Node task wiring: swarm loop, stream accept loop and per-peer handshakes.

use std::sync::Arc;
use std::time::Duration;

use fm_01_handshake::{
    keypair_from_identity, peer_identity_of, wait_for_shutdown, HandshakeError, HandshakeRole,
    HandshakeService, PeerAddressRegistry, PeerStream,
};
use fm_telemetry::{
    encode_metrics, log_peer_event, metric_inc, time_histogram, CONNECTED_PEERS,
    HANDSHAKES_TOTAL, HANDSHAKE_DURATION, REGISTERED_PEERS,
};
use futures::StreamExt;
use libp2p::swarm::{NetworkBehaviour, SwarmEvent};
use libp2p::{Multiaddr, PeerId, StreamProtocol, Swarm};
use shared_crypto::{Secp256k1Identity, SigningIdentity};
use shared_types::AccountAddress;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::swarm::{build_swarm, NodeBehaviour};
use super::NodeError;
use crate::container::{ConfigError, NodeConfig};

/// Upper bound on waiting for background tasks at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Events buffered for the handle. Further events are dropped until the
/// consumer catches up.
pub const EVENT_BUFFER: usize = 1024;

/// Something observable happened on the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A listener is up.
    Listening {
        /// Bound address.
        address: Multiaddr,
    },
    /// First connection to a peer opened.
    PeerConnected {
        /// Remote peer.
        peer: PeerId,
    },
    /// Last connection to a peer closed.
    PeerDisconnected {
        /// Remote peer.
        peer: PeerId,
    },
    /// Our handshake was delivered to a peer.
    HandshakeSent {
        /// Remote peer.
        peer: PeerId,
    },
    /// A peer proved control of an account address.
    PeerVerified {
        /// Remote peer.
        peer: PeerId,
        /// Verified account address.
        address: AccountAddress,
    },
    /// A handshake in either direction failed.
    HandshakeFailed {
        /// Remote peer.
        peer: PeerId,
        /// Which side we played.
        role: HandshakeRole,
        /// Failure description.
        error: String,
    },
}

enum Command {
    Dial(Multiaddr),
}

/// Handle to a running node.
///
/// Dropping the handle stops the swarm without waiting for it; use
/// [`NodeHandle::shutdown`] for an orderly stop.
pub struct NodeHandle {
    peer_id: PeerId,
    address: AccountAddress,
    registry: Arc<PeerAddressRegistry>,
    events: mpsc::Receiver<NodeEvent>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeHandle {
    /// Our transport peer id.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Our account address.
    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// Peers verified so far.
    pub fn registry(&self) -> &Arc<PeerAddressRegistry> {
        &self.registry
    }

    /// Wait for the next node event. `None` once the node has stopped.
    ///
    /// At most [`EVENT_BUFFER`] events are held; a consumer that falls
    /// further behind misses events but never stalls the node.
    pub async fn next_event(&mut self) -> Option<NodeEvent> {
        self.events.recv().await
    }

    /// Dial a peer.
    pub fn dial(&self, addr: Multiaddr) -> Result<(), NodeError> {
        self.commands
            .send(Command::Dial(addr))
            .map_err(|_| NodeError::Stopped)
    }

    /// Cancel in-flight handshakes, close the swarm and wait for the tasks.
    pub async fn shutdown(self) {
        info!("Initiating node shutdown...");
        let _ = self.shutdown.send(true);

        for task in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!(%error, "Node task ended abnormally"),
                Err(_) => warn!("Node task did not stop in time"),
            }
        }
        info!("Node stopped");
    }
}

/// Start a node: bind listeners, dial bootstrap peers and begin
/// handshaking with every peer that connects.
///
/// The configuration is validated first, so a hand-built config gets the
/// same checks as one from [`crate::load_config`].
///
/// Must be called from within a tokio runtime.
pub fn spawn(config: NodeConfig, identity: Secp256k1Identity) -> Result<NodeHandle, NodeError> {
    config.validate()?;

    let keypair = keypair_from_identity(&identity)?;
    let peer_id = keypair.public().to_peer_id();
    let address = identity.address();

    let handshake = config.handshake.to_handshake_config();
    let protocol = StreamProtocol::try_from_owned(handshake.protocol.clone())
        .map_err(|_| {
            ConfigError::Invalid(format!("handshake.protocol {:?}", handshake.protocol))
        })?;

    let mut swarm = build_swarm(
        keypair,
        Duration::from_secs(config.network.idle_connection_timeout_secs),
    )?;

    for addr in &config.network.listen_addrs {
        let multiaddr: Multiaddr = addr.parse().map_err(|e: libp2p::multiaddr::Error| {
            NodeError::Listen {
                addr: addr.clone(),
                reason: e.to_string(),
            }
        })?;
        swarm
            .listen_on(multiaddr)
            .map_err(|e| NodeError::Listen {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
    }

    for addr in &config.network.bootstrap_nodes {
        dial_best_effort(&mut swarm, addr);
    }

    let mut control = swarm.behaviour().new_control();
    let incoming = control
        .accept(protocol.clone())
        .map_err(|_| NodeError::ProtocolRegistered(protocol.to_string()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let registry = Arc::new(PeerAddressRegistry::new());
    let service = Arc::new(HandshakeService::new(
        Arc::new(identity),
        peer_identity_of(&peer_id),
        registry.clone(),
        handshake,
        shutdown_rx.clone(),
    ));

    info!(
        %peer_id,
        %address,
        protocol = %protocol,
        "Node starting"
    );

    let accept_task = tokio::spawn(accept_loop(
        incoming,
        service.clone(),
        events_tx.clone(),
        shutdown_rx.clone(),
    ));

    let swarm_task = tokio::spawn(
        SwarmLoop {
            swarm,
            control,
            protocol,
            service,
            events: events_tx,
            commands: commands_rx,
            shutdown: shutdown_rx,
            status_interval: Duration::from_secs(config.network.status_interval_secs),
        }
        .run(),
    );

    Ok(NodeHandle {
        peer_id,
        address,
        registry,
        events: events_rx,
        commands: commands_tx,
        shutdown: shutdown_tx,
        tasks: vec![swarm_task, accept_task],
    })
}

fn dial_best_effort(swarm: &mut Swarm<NodeBehaviour>, addr: &str) {
    match addr.parse::<Multiaddr>() {
        Ok(multiaddr) => {
            if let Err(error) = swarm.dial(multiaddr) {
                warn!(addr, %error, "Bootstrap dial failed");
            }
        }
        Err(error) => warn!(addr, %error, "Skipping unparseable bootstrap address"),
    }
}

struct SwarmLoop {
    swarm: Swarm<NodeBehaviour>,
    control: libp2p_stream::Control,
    protocol: StreamProtocol,
    service: Arc<HandshakeService<Secp256k1Identity>>,
    events: mpsc::Sender<NodeEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: watch::Receiver<bool>,
    status_interval: Duration,
}

impl SwarmLoop {
    async fn run(mut self) {
        let mut status = tokio::time::interval_at(
            tokio::time::Instant::now() + self.status_interval,
            self.status_interval,
        );

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    debug!("Swarm loop shutting down");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(Command::Dial(addr)) => {
                        if let Err(error) = self.swarm.dial(addr.clone()) {
                            warn!(%addr, %error, "Dial failed");
                        }
                    }
                    None => {
                        debug!("Node handle dropped, swarm loop stopping");
                        break;
                    }
                },
                _ = status.tick() => self.log_status(),
                event = self.swarm.select_next_some() => self.on_swarm_event(event),
            }
        }
    }

    fn log_status(&self) {
        info!(
            connected = self.swarm.connected_peers().count(),
            verified = self.service.registry().len(),
            "Node status"
        );
        if let Some(text) = metrics_snapshot() {
            debug!(metrics = %text, "Metrics snapshot");
        }
    }

    fn on_swarm_event(&mut self, event: SwarmEvent<<NodeBehaviour as NetworkBehaviour>::ToSwarm>) {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(%address, "Listening");
                emit(&self.events, NodeEvent::Listening { address });
            }
            SwarmEvent::ConnectionEstablished {
                peer_id,
                num_established,
                endpoint,
                ..
            } => {
                if num_established.get() != 1 {
                    return;
                }
                CONNECTED_PEERS.inc();
                log_peer_event!(info, "Peer connected", peer_id, remote = %endpoint.get_remote_address());
                emit(&self.events, NodeEvent::PeerConnected { peer: peer_id });
                self.start_initiator(peer_id);
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                num_established,
                cause,
                ..
            } => {
                if num_established != 0 {
                    return;
                }
                CONNECTED_PEERS.dec();
                log_peer_event!(info, "Peer disconnected", peer_id, cause = ?cause);
                emit(&self.events, NodeEvent::PeerDisconnected { peer: peer_id });
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                warn!(?peer_id, %error, "Outgoing connection failed");
            }
            SwarmEvent::IncomingConnectionError {
                send_back_addr,
                error,
                ..
            } => {
                debug!(%send_back_addr, %error, "Incoming connection failed");
            }
            SwarmEvent::ListenerError { error, .. } => {
                warn!(%error, "Listener error");
            }
            _ => {}
        }
    }

    fn start_initiator(&self, peer: PeerId) {
        let control = self.control.clone();
        let protocol = self.protocol.clone();
        let service = self.service.clone();
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(initiate(peer, control, protocol, service, events, shutdown));
    }
}

async fn accept_loop(
    mut incoming: libp2p_stream::IncomingStreams,
    service: Arc<HandshakeService<Secp256k1Identity>>,
    events: mpsc::Sender<NodeEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let next = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            next = incoming.next() => next,
        };
        let Some((peer, stream)) = next else {
            debug!("Incoming handshake streams exhausted");
            break;
        };
        log_peer_event!(debug, "Accepted handshake stream", peer);
        tokio::spawn(respond(peer, stream, service.clone(), events.clone()));
    }
}

async fn respond(
    peer: PeerId,
    stream: libp2p::Stream,
    service: Arc<HandshakeService<Secp256k1Identity>>,
    events: mpsc::Sender<NodeEvent>,
) {
    let role = HandshakeRole::Responder;
    let _timer = time_histogram!(HANDSHAKE_DURATION, role.as_str());

    let event = match service
        .run_responder(PeerStream::from_peer_id(&peer, stream))
        .await
    {
        Ok(address) => {
            metric_inc!(HANDSHAKES_TOTAL, &[role.as_str(), "verified"]);
            REGISTERED_PEERS.set(service.registry().len() as f64);
            NodeEvent::PeerVerified { peer, address }
        }
        Err(error) => failed(peer, role, error),
    };
    emit(&events, event);
}

async fn initiate(
    peer: PeerId,
    mut control: libp2p_stream::Control,
    protocol: StreamProtocol,
    service: Arc<HandshakeService<Secp256k1Identity>>,
    events: mpsc::Sender<NodeEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let role = HandshakeRole::Initiator;
    let _timer = time_histogram!(HANDSHAKE_DURATION, role.as_str());
    let io_timeout = service.config().io_timeout;

    let opened = tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown) => Err(HandshakeError::Cancelled),
        res = tokio::time::timeout(io_timeout, control.open_stream(peer, protocol)) => match res {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(error)) => Err(HandshakeError::Transport(error.to_string())),
            Err(_) => Err(HandshakeError::TimedOut),
        },
    };

    let result = match opened {
        Ok(stream) => service
            .run_initiator(PeerStream::from_peer_id(&peer, stream))
            .await
            .map(|_| ()),
        Err(error) => Err(error),
    };

    let event = match result {
        Ok(()) => {
            metric_inc!(HANDSHAKES_TOTAL, &[role.as_str(), "sent"]);
            NodeEvent::HandshakeSent { peer }
        }
        Err(error) => failed(peer, role, error),
    };
    emit(&events, event);
}

/// Hand an event to the node handle without waiting. Dropped if the buffer
/// is full or the handle is gone.
fn emit(events: &mpsc::Sender<NodeEvent>, event: NodeEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(event)) => {
            debug!(?event, "Event buffer full, dropping event");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

fn metrics_snapshot() -> Option<String> {
    match encode_metrics() {
        Ok(text) => Some(text),
        Err(error) => {
            warn!(%error, "Failed to encode metrics");
            None
        }
    }
}

fn failed(peer: PeerId, role: HandshakeRole, error: HandshakeError) -> NodeEvent {
    metric_inc!(HANDSHAKES_TOTAL, &[role.as_str(), error.outcome()]);
    log_peer_event!(debug, "Handshake failed", peer, %role, outcome = error.outcome());
    NodeEvent::HandshakeFailed {
        peer,
        role,
        error: error.to_string(),
    }
}
