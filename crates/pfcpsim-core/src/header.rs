use bytes::{Buf, BufMut, BytesMut};
use pfcpsim_shared::{MAX_SEQUENCE_NUMBER, PFCP_VERSION};

use crate::error::{PfcpsimError, Result};

/// Header length without SEID
pub const HEADER_LEN: usize = 8;

/// Header length with SEID
pub const HEADER_LEN_WITH_SEID: usize = 16;

// First octet flags
pub const FLAG_SEID: u8 = 0x01;
pub const FLAG_MESSAGE_PRIORITY: u8 = 0x02;

/// PFCP message types handled by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    HeartbeatRequest = 1,
    HeartbeatResponse = 2,
    AssociationSetupRequest = 5,
    AssociationSetupResponse = 6,
    AssociationReleaseRequest = 9,
    AssociationReleaseResponse = 10,
    SessionEstablishmentRequest = 50,
    SessionEstablishmentResponse = 51,
    SessionModificationRequest = 52,
    SessionModificationResponse = 53,
    SessionDeletionRequest = 54,
    SessionDeletionResponse = 55,
}

impl TryFrom<u8> for MessageType {
    type Error = PfcpsimError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::HeartbeatRequest),
            2 => Ok(Self::HeartbeatResponse),
            5 => Ok(Self::AssociationSetupRequest),
            6 => Ok(Self::AssociationSetupResponse),
            9 => Ok(Self::AssociationReleaseRequest),
            10 => Ok(Self::AssociationReleaseResponse),
            50 => Ok(Self::SessionEstablishmentRequest),
            51 => Ok(Self::SessionEstablishmentResponse),
            52 => Ok(Self::SessionModificationRequest),
            53 => Ok(Self::SessionModificationResponse),
            54 => Ok(Self::SessionDeletionRequest),
            55 => Ok(Self::SessionDeletionResponse),
            _ => Err(PfcpsimError::UnknownMessageType(value)),
        }
    }
}

impl MessageType {
    /// Session related messages carry a SEID in the header
    pub fn has_seid(&self) -> bool {
        matches!(
            self,
            Self::SessionEstablishmentRequest
                | Self::SessionEstablishmentResponse
                | Self::SessionModificationRequest
                | Self::SessionModificationResponse
                | Self::SessionDeletionRequest
                | Self::SessionDeletionResponse
        )
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::HeartbeatRequest
                | Self::AssociationSetupRequest
                | Self::AssociationReleaseRequest
                | Self::SessionEstablishmentRequest
                | Self::SessionModificationRequest
                | Self::SessionDeletionRequest
        )
    }

    /// Response type answering this request, `None` for responses
    pub fn response_type(&self) -> Option<MessageType> {
        match self {
            Self::HeartbeatRequest => Some(Self::HeartbeatResponse),
            Self::AssociationSetupRequest => Some(Self::AssociationSetupResponse),
            Self::AssociationReleaseRequest => Some(Self::AssociationReleaseResponse),
            Self::SessionEstablishmentRequest => Some(Self::SessionEstablishmentResponse),
            Self::SessionModificationRequest => Some(Self::SessionModificationResponse),
            Self::SessionDeletionRequest => Some(Self::SessionDeletionResponse),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HeartbeatRequest => "Heartbeat Request",
            Self::HeartbeatResponse => "Heartbeat Response",
            Self::AssociationSetupRequest => "Association Setup Request",
            Self::AssociationSetupResponse => "Association Setup Response",
            Self::AssociationReleaseRequest => "Association Release Request",
            Self::AssociationReleaseResponse => "Association Release Response",
            Self::SessionEstablishmentRequest => "Session Establishment Request",
            Self::SessionEstablishmentResponse => "Session Establishment Response",
            Self::SessionModificationRequest => "Session Modification Request",
            Self::SessionModificationResponse => "Session Modification Response",
            Self::SessionDeletionRequest => "Session Deletion Request",
            Self::SessionDeletionResponse => "Session Deletion Response",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// PFCP message header (8 bytes, 16 with SEID)
///
/// ```text
/// | Ver | Spare | MP | S |  Message Type  |     Message Length      |
/// |                  SEID (8 bytes, if S = 1)                        |
/// |          Sequence Number (3 bytes)         | Priority / Spare   |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfcpHeader {
    pub version: u8,
    pub message_type: MessageType,
    /// Message length excluding the first 4 bytes
    pub length: u16,
    pub seid: Option<u64>,
    pub sequence_number: u32,
    pub priority: Option<u8>,
}

impl PfcpHeader {
    /// Create a node related header (no SEID)
    pub fn new(message_type: MessageType, sequence_number: u32) -> Self {
        Self {
            version: PFCP_VERSION,
            message_type,
            length: 0,
            seid: None,
            sequence_number: sequence_number & MAX_SEQUENCE_NUMBER,
            priority: None,
        }
    }

    /// Create a session related header
    pub fn with_seid(message_type: MessageType, seid: u64, sequence_number: u32) -> Self {
        Self {
            seid: Some(seid),
            ..Self::new(message_type, sequence_number)
        }
    }

    pub fn header_len(&self) -> usize {
        if self.seid.is_some() {
            HEADER_LEN_WITH_SEID
        } else {
            HEADER_LEN
        }
    }

    /// Parse header from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(PfcpsimError::BufferTooShort {
                needed: HEADER_LEN,
                available: data.len(),
            });
        }

        let mut buf = data;
        let flags = buf.get_u8();
        let version = flags >> 5;
        if version != PFCP_VERSION {
            return Err(PfcpsimError::VersionNotSupported(version));
        }
        let has_seid = flags & FLAG_SEID != 0;
        let has_priority = flags & FLAG_MESSAGE_PRIORITY != 0;

        let message_type = MessageType::try_from(buf.get_u8())?;
        let length = buf.get_u16();

        let seid = if has_seid {
            if data.len() < HEADER_LEN_WITH_SEID {
                return Err(PfcpsimError::BufferTooShort {
                    needed: HEADER_LEN_WITH_SEID,
                    available: data.len(),
                });
            }
            Some(buf.get_u64())
        } else {
            None
        };

        let mut seq_bytes = [0u8; 4];
        buf.copy_to_slice(&mut seq_bytes[1..4]);
        let sequence_number = u32::from_be_bytes(seq_bytes);

        let last = buf.get_u8();
        let priority = has_priority.then_some(last >> 4);

        Ok(Self {
            version,
            message_type,
            length,
            seid,
            sequence_number,
            priority,
        })
    }

    /// Serialize header into the buffer
    pub fn serialize(&self, buf: &mut BytesMut) {
        let mut flags = (self.version & 0x07) << 5;
        if self.seid.is_some() {
            flags |= FLAG_SEID;
        }
        if self.priority.is_some() {
            flags |= FLAG_MESSAGE_PRIORITY;
        }
        buf.put_u8(flags);
        buf.put_u8(self.message_type as u8);
        buf.put_u16(self.length);

        if let Some(seid) = self.seid {
            buf.put_u64(seid);
        }

        let seq_bytes = self.sequence_number.to_be_bytes();
        buf.put_slice(&seq_bytes[1..4]);
        buf.put_u8(self.priority.unwrap_or(0) << 4);
    }
}
