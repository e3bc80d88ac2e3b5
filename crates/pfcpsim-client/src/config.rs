use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use pfcpsim_client_core::RetryPolicy;
use pfcpsim_core::NodeId;

use crate::error::{ClientError, Result};

/// Runtime settings of one client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub peer_address: SocketAddr,
    /// Derived from the route towards the peer when unset
    pub local_address: Option<IpAddr>,
    /// 0 picks an ephemeral port
    pub local_port: u16,
    /// Defaults to the local address
    pub node_id: Option<NodeId>,
    pub heartbeat_interval: Duration,
    pub max_missed_heartbeats: u32,
    /// Association and session requests
    pub retry: RetryPolicy,
    pub heartbeat_retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(peer_address: SocketAddr) -> Self {
        Self {
            peer_address,
            local_address: None,
            local_port: 0,
            node_id: None,
            heartbeat_interval: Duration::from_secs(5),
            max_missed_heartbeats: 3,
            retry: RetryPolicy::default(),
            heartbeat_retry: RetryPolicy::fixed(0, Duration::from_secs(3)),
        }
    }

    pub fn with_local_address(mut self, address: IpAddr) -> Self {
        self.local_address = Some(address);
        self
    }

    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_max_missed_heartbeats(mut self, max_missed: u32) -> Self {
        self.max_missed_heartbeats = max_missed;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_heartbeat_retry(mut self, retry: RetryPolicy) -> Self {
        self.heartbeat_retry = retry;
        self
    }

    /// Reject settings the runtime tasks cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(ClientError::InvalidConfig(
                "heartbeat interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
