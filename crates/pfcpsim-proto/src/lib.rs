// Request/response types of the simulator control surface

use serde::{Deserialize, Serialize};

// ========================================
// Association
// ========================================

/// Peer settings applied before associating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureRequest {
    /// `ip` or `ip:port` of the UPF PFCP endpoint
    pub remote_peer_address: String,

    /// UPF N3 address placed in uplink F-TEIDs
    pub upf_n3_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociateRequest {
    /// Overrides the configured peer for this association
    #[serde(default)]
    pub peer_address: Option<String>,
}

// ========================================
// Sessions
// ========================================

/// Create `count` sessions with IDs `base_id..base_id + count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub count: u32,
    pub base_id: u32,

    /// gNodeB address used as downlink tunnel endpoint
    pub gnb_address: String,

    /// IPv4 prefix UE addresses are taken from, e.g. `17.0.0.0/24`
    pub ue_address_pool: String,

    /// QoS flow identifier of the session QER
    #[serde(default)]
    pub qfi: u8,
}

/// Point the downlink FAR of each session to a new tunnel, or buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifySessionRequest {
    pub count: u32,
    pub base_id: u32,
    pub gnb_address: String,

    #[serde(default)]
    pub buffer: bool,

    /// Ask the UPF to report the first buffered packet
    #[serde(default)]
    pub notify_cp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSessionRequest {
    pub count: u32,
    pub base_id: u32,
}

// ========================================
// Response
// ========================================

/// Outcome classes, numbered like gRPC status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    Internal,
    Unavailable,
}

impl StatusCode {
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::ResourceExhausted => 8,
            Self::FailedPrecondition => 9,
            Self::Aborted => 10,
            Self::Internal => 13,
            Self::Unavailable => 14,
        }
    }
}

/// Result of every control operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status_code: StatusCode,
    pub message: String,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Ok,
            message: message.into(),
        }
    }

    pub fn error(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::Ok
    }
}
