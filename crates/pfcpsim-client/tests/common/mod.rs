//! Scripted UPF answering on a loopback UDP socket

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pfcpsim_client::{ClientConfig, RetryPolicy};
use pfcpsim_core::{message, Cause, FSeid, MessageType, NodeId, PfcpPacket, RecoveryTimeStamp};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// Flag set on the UP SEID derived from the CP SEID
pub const UP_SEID_FLAG: u64 = 0x8000_0000_0000_0000;

/// How the mock answers. `None` means never answer that request.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub association_cause: Option<u8>,
    pub establishment_cause: Option<u8>,
    pub modification_cause: Option<u8>,
    pub deletion_cause: Option<u8>,
    pub release_cause: Option<u8>,
    pub heartbeat: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        let accepted = Some(Cause::REQUEST_ACCEPTED.0);
        Self {
            association_cause: accepted,
            establishment_cause: accepted,
            modification_cause: accepted,
            deletion_cause: accepted,
            release_cause: accepted,
            heartbeat: true,
        }
    }
}

pub struct MockUpf {
    pub addr: SocketAddr,
    socket: Arc<UdpSocket>,
    behaviour: Arc<Mutex<Behaviour>>,
    received: Arc<Mutex<Vec<PfcpPacket>>>,
    task: JoinHandle<()>,
}

impl MockUpf {
    pub async fn start(behaviour: Behaviour) -> Self {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = socket.local_addr().unwrap();
        let behaviour = Arc::new(Mutex::new(behaviour));
        let received = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn(serve(socket.clone(), behaviour.clone(), received.clone()));

        Self {
            addr,
            socket,
            behaviour,
            received,
            task,
        }
    }

    pub async fn accepting() -> Self {
        Self::start(Behaviour::default()).await
    }

    /// Client settings with short timers suitable for tests
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.addr)
            .with_local_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_heartbeat_interval(Duration::from_secs(30))
            .with_retry(RetryPolicy::fixed(2, Duration::from_millis(100)))
            .with_heartbeat_retry(RetryPolicy::fixed(0, Duration::from_millis(100)))
    }

    pub fn update(&self, change: impl FnOnce(&mut Behaviour)) {
        change(&mut self.behaviour.lock());
    }

    pub fn received(&self) -> Vec<PfcpPacket> {
        self.received.lock().clone()
    }

    pub fn received_of(&self, message_type: MessageType) -> Vec<PfcpPacket> {
        self.received
            .lock()
            .iter()
            .filter(|p| p.message_type() == message_type)
            .cloned()
            .collect()
    }

    /// Send a heartbeat request to `target` and wait for the answer
    pub async fn probe_heartbeat(&self, target: SocketAddr, sequence: u32) -> Option<PfcpPacket> {
        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let request = message::heartbeat_request(sequence, RecoveryTimeStamp::now());
        probe.send_to(&request.serialize(), target).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), probe.recv_from(&mut buf))
            .await
            .ok()?
            .ok()?;
        PfcpPacket::parse(&buf[..len]).ok()
    }

    pub async fn send_raw(&self, data: &[u8], target: SocketAddr) {
        self.socket.send_to(data, target).await.unwrap();
    }
}

impl Drop for MockUpf {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: Arc<UdpSocket>,
    behaviour: Arc<Mutex<Behaviour>>,
    received: Arc<Mutex<Vec<PfcpPacket>>>,
) {
    let node_id = NodeId::Ipv4(Ipv4Addr::LOCALHOST);
    let recovery = RecoveryTimeStamp::now();
    let mut buf = vec![0u8; 65_535];

    loop {
        let Ok((len, from)) = socket.recv_from(&mut buf).await else {
            continue;
        };
        let Ok(request) = PfcpPacket::parse(&buf[..len]) else {
            continue;
        };
        received.lock().push(request.clone());

        let seq = request.sequence_number();
        let cp_seid = request
            .f_seid()
            .ok()
            .flatten()
            .map(|f| f.seid)
            .unwrap_or_else(|| request.header.seid.unwrap_or_default() & !UP_SEID_FLAG);
        let current = behaviour.lock().clone();

        let response = match request.message_type() {
            MessageType::HeartbeatRequest if current.heartbeat => {
                Some(message::heartbeat_response(seq, recovery))
            }
            MessageType::AssociationSetupRequest => current.association_cause.map(|cause| {
                message::association_setup_response(seq, &node_id, Cause(cause), recovery)
            }),
            MessageType::AssociationReleaseRequest => current
                .release_cause
                .map(|cause| message::association_release_response(seq, &node_id, Cause(cause))),
            MessageType::SessionEstablishmentRequest => {
                current.establishment_cause.map(|cause| {
                    let cause = Cause(cause);
                    let up_fseid = FSeid::new(cp_seid | UP_SEID_FLAG, IpAddr::V4(Ipv4Addr::LOCALHOST));
                    let up_fseid = cause.is_accepted().then_some(up_fseid);
                    message::session_establishment_response(
                        seq,
                        cp_seid,
                        &node_id,
                        cause,
                        up_fseid.as_ref(),
                    )
                })
            }
            MessageType::SessionModificationRequest => current.modification_cause.map(|cause| {
                message::session_response(
                    MessageType::SessionModificationResponse,
                    seq,
                    cp_seid,
                    Cause(cause),
                )
            }),
            MessageType::SessionDeletionRequest => current.deletion_cause.map(|cause| {
                message::session_response(
                    MessageType::SessionDeletionResponse,
                    seq,
                    cp_seid,
                    Cause(cause),
                )
            }),
            _ => None,
        };

        if let Some(response) = response {
            let _ = socket.send_to(&response.serialize(), from).await;
        }
    }
}
