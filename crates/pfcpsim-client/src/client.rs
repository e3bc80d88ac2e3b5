use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use dashmap::DashMap;
use pfcpsim_client_core::{
    AssociationAction, AssociationFsm, AssociationState, PendingRequest, RetryPolicy,
    SequenceAllocator, Session,
};
use pfcpsim_core::{message, MessageType, NodeId, PfcpPacket, RecoveryTimeStamp, Transport};
use pfcpsim_metrics::{
    ACTIVE_SESSIONS, PFCP_REQUESTS_TOTAL, PFCP_RETRANSMISSIONS_TOTAL, PFCP_TIMEOUTS_TOTAL,
    RESPONSE_LATENCY_SECONDS,
};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::store::{Completion, Delivery, FailReason, PendingStore};

const MAX_DATAGRAM: usize = 65_535;
const EVENT_CAPACITY: usize = 64;

/// Notifications about association health
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Associated { peer_recovery: Option<RecoveryTimeStamp> },
    /// Heartbeats went unanswered; the listed sessions were dropped
    AssociationLost { sessions: Vec<u64> },
    PeerRestarted { recovery: RecoveryTimeStamp },
    Released,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    transport: Arc<dyn Transport>,
    pub(crate) local_address: IpAddr,
    pub(crate) node_id: NodeId,
    pub(crate) recovery: RecoveryTimeStamp,

    // Wire
    send_lock: Mutex<()>,
    sequences: SequenceAllocator,
    pending: PendingStore,

    // State
    pub(crate) association: parking_lot::Mutex<AssociationFsm>,
    pub(crate) sessions: DashMap<u64, Session>,
    next_seid: AtomicU64,

    pub(crate) shutdown: CancellationToken,
    pub(crate) heartbeat: parking_lot::Mutex<Option<CancellationToken>>,
    events: broadcast::Sender<ClientEvent>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Handle to a PFCP client. Clones share the socket and all state.
#[derive(Clone)]
pub struct PfcpClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for PfcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PfcpClient")
            .field("peer", &self.inner.config.peer_address)
            .field("local_address", &self.inner.local_address)
            .field("association", &self.association_state())
            .field("sessions", &self.inner.sessions.len())
            .finish()
    }
}

/// Removes the pending entry and frees its sequence number however the request ends
struct PendingGuard<'a> {
    inner: &'a ClientInner,
    sequence: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending.remove(self.sequence);
        self.inner.sequences.release(self.sequence);
    }
}

impl PfcpClient {
    /// Bind a UDP socket and start the receive loop
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let local_ip = match config.local_address {
            Some(ip) => ip,
            None => route_to(config.peer_address).await?,
        };
        let socket = UdpSocket::bind(SocketAddr::new(local_ip, config.local_port)).await?;
        info!(
            local = %socket.local_addr()?,
            peer = %config.peer_address,
            "PFCP socket bound"
        );
        Self::with_transport(config, Arc::new(socket))
    }

    /// Run over an existing transport. Must be called within a Tokio runtime.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let local_address = match config.local_address {
            Some(ip) => ip,
            None => transport.local_addr()?.ip(),
        };
        let node_id = config
            .node_id
            .clone()
            .unwrap_or_else(|| NodeId::from(local_address));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new(ClientInner {
            association: parking_lot::Mutex::new(AssociationFsm::new(
                config.max_missed_heartbeats,
            )),
            config,
            transport: transport.clone(),
            local_address,
            node_id,
            recovery: RecoveryTimeStamp::now(),
            send_lock: Mutex::new(()),
            sequences: SequenceAllocator::new(),
            pending: PendingStore::new(),
            sessions: DashMap::new(),
            next_seid: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
            heartbeat: parking_lot::Mutex::new(None),
            events,
        });

        tokio::spawn(run_reader(
            Arc::downgrade(&inner),
            transport,
            inner.shutdown.clone(),
        ));

        Ok(Self { inner })
    }

    // ========================================
    // Request / response
    // ========================================

    pub(crate) async fn send(&self, payload: &[u8], target: SocketAddr) -> Result<()> {
        let _guard = self.inner.send_lock.lock().await;
        self.inner.transport.send_to(payload, target).await?;
        Ok(())
    }

    /// Send a request and wait for the response that carries its sequence number.
    ///
    /// The datagram is resent as-is after each timeout until the policy is
    /// exhausted. Dropping the returned future releases the sequence number.
    pub(crate) async fn request<F>(&self, build: F, policy: RetryPolicy) -> Result<PfcpPacket>
    where
        F: FnOnce(u32) -> PfcpPacket,
    {
        if self.inner.shutdown.is_cancelled() {
            return Err(ClientError::ShuttingDown);
        }

        let sequence = self.inner.sequences.next()?;
        let _guard = PendingGuard {
            inner: &self.inner,
            sequence,
        };

        let packet = build(sequence);
        let message_type = packet.message_type();
        let payload = packet.serialize();

        let (tx, mut rx) = oneshot::channel();
        self.inner.pending.register(PendingRequest::new(
            sequence,
            message_type,
            payload.clone(),
            tx,
        ));
        PFCP_REQUESTS_TOTAL
            .with_label_values(&[message_type.name()])
            .inc();

        let started = Instant::now();
        let peer = self.inner.config.peer_address;
        for attempt in 0..policy.attempts() {
            if attempt > 0 {
                self.inner.pending.record_retransmission(sequence);
                PFCP_RETRANSMISSIONS_TOTAL.inc();
                debug!(sequence, attempt, message = message_type.name(), "Retransmitting request");
            }
            self.send(&payload, peer).await?;

            match tokio::time::timeout(policy.delay_for(attempt), &mut rx).await {
                Ok(Ok(Delivery::Response(response))) => {
                    RESPONSE_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());
                    debug!(sequence, message = response.message_type().name(), "Response received");
                    return Ok(response);
                }
                Ok(Ok(Delivery::Failed(FailReason::AssociationLost))) => {
                    return Err(ClientError::AssociationLost);
                }
                Ok(Ok(Delivery::Failed(FailReason::ShuttingDown))) | Ok(Err(_)) => {
                    return Err(ClientError::ShuttingDown);
                }
                Err(_) => continue,
            }
        }

        PFCP_TIMEOUTS_TOTAL.inc();
        warn!(
            sequence,
            message = message_type.name(),
            attempts = policy.attempts(),
            "Request timed out"
        );
        Err(ClientError::RequestTimedOut {
            sequence,
            attempts: policy.attempts(),
        })
    }

    pub(crate) fn allocate_seid(&self) -> u64 {
        self.inner.next_seid.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Run the side effects the association state machine asked for
    pub(crate) fn apply_association_actions(&self, actions: Vec<AssociationAction>) {
        for action in actions {
            match action {
                AssociationAction::StartHeartbeat => self.start_heartbeat(),
                AssociationAction::StopHeartbeat => self.stop_heartbeat(),
                AssociationAction::NotifyAssociationLost => {
                    let failed = self.inner.pending.fail_all(FailReason::AssociationLost);
                    let sessions = self.drop_sessions();
                    error!(
                        peer = %self.inner.config.peer_address,
                        in_flight = failed,
                        sessions = sessions.len(),
                        "Association lost"
                    );
                    self.emit(ClientEvent::AssociationLost { sessions });
                }
                AssociationAction::PeerRestarted => {
                    if let Some(recovery) = self.inner.association.lock().peer_recovery() {
                        warn!(recovery = recovery.0, "Peer recovery timestamp changed");
                        self.emit(ClientEvent::PeerRestarted { recovery });
                    }
                }
                // Sent by the caller that stepped the state machine
                AssociationAction::SendSetupRequest | AssociationAction::SendReleaseRequest => {}
            }
        }
    }

    /// Forget every session, returning their local SEIDs
    pub(crate) fn drop_sessions(&self) -> Vec<u64> {
        let seids: Vec<u64> = self.inner.sessions.iter().map(|s| *s.key()).collect();
        for seid in &seids {
            if self.inner.sessions.remove(seid).is_some() {
                ACTIVE_SESSIONS.dec();
            }
        }
        seids
    }

    // ========================================
    // Inspection
    // ========================================

    pub fn session(&self, local_seid: u64) -> Option<Session> {
        self.inner.sessions.get(&local_seid).map(|s| s.clone())
    }

    pub fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> =
            self.inner.sessions.iter().map(|s| s.value().clone()).collect();
        sessions.sort_by_key(|s| s.local_seid());
        sessions
    }

    pub fn association_state(&self) -> AssociationState {
        self.inner.association.lock().state()
    }

    pub fn local_address(&self) -> IpAddr {
        self.inner.local_address
    }

    /// Address the transport is bound to
    pub fn local_socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.transport.local_addr()?)
    }

    pub fn peer_address(&self) -> SocketAddr {
        self.inner.config.peer_address
    }

    pub fn node_id(&self) -> &NodeId {
        &self.inner.node_id
    }

    pub fn recovery_time_stamp(&self) -> RecoveryTimeStamp {
        self.inner.recovery
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn sequences_in_flight(&self) -> usize {
        self.inner.sequences.in_flight()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Stop background tasks and fail everything in flight
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        info!(peer = %self.inner.config.peer_address, "Shutting down PFCP client");
        self.stop_heartbeat();
        self.inner.shutdown.cancel();
        self.inner.pending.fail_all(FailReason::ShuttingDown);
    }
}

/// Local address the OS would use towards `peer`
async fn route_to(peer: SocketAddr) -> Result<IpAddr> {
    let unspecified: IpAddr = match peer {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    let probe = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
    probe.connect(peer).await?;
    Ok(probe.local_addr()?.ip())
}

/// Single reader: answers peer heartbeats and routes responses to their waiters
async fn run_reader(
    client: Weak<ClientInner>,
    transport: Arc<dyn Transport>,
    shutdown: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = transport.recv_from(&mut buf) => received,
        };

        let (len, from) = match received {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "Receive failed");
                continue;
            }
        };

        let Some(inner) = client.upgrade() else {
            break;
        };

        let packet = match PfcpPacket::parse(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%from, len, error = %e, "Discarding undecodable datagram");
                continue;
            }
        };

        if packet.message_type().is_request() {
            handle_peer_request(&PfcpClient { inner }, packet, from).await;
            continue;
        }

        let sequence = packet.sequence_number();
        let message_type = packet.message_type();
        match inner.pending.complete(packet) {
            Completion::Delivered => {}
            Completion::Unmatched => {
                warn!(%from, sequence, message = message_type.name(), "No pending request for response");
            }
            Completion::WrongType => {
                warn!(%from, sequence, message = message_type.name(), "Response type does not match pending request");
            }
        }
    }

    debug!("PFCP reader stopped");
}

async fn handle_peer_request(client: &PfcpClient, request: PfcpPacket, from: SocketAddr) {
    match request.message_type() {
        MessageType::HeartbeatRequest => {
            let response =
                message::heartbeat_response(request.sequence_number(), client.inner.recovery);
            debug!(%from, sequence = request.sequence_number(), "Answering peer heartbeat");
            if let Err(e) = client.send(&response.serialize(), from).await {
                warn!(%from, error = %e, "Failed to answer heartbeat");
            }
        }
        other => {
            warn!(%from, message = other.name(), "Ignoring unsupported peer request");
        }
    }
}
