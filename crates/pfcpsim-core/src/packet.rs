use bytes::{Bytes, BytesMut};
use pfcpsim_shared::{Ie, IE_CAUSE, IE_F_SEID, IE_NODE_ID, IE_RECOVERY_TIME_STAMP};

use crate::error::{PfcpsimError, Result};
use crate::header::{MessageType, PfcpHeader};
use crate::ie::{decode_ies, encode_ies};
use crate::types::{Cause, FSeid, NodeId, RecoveryTimeStamp};

/// Complete PFCP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfcpPacket {
    pub header: PfcpHeader,
    pub ies: Vec<Ie>,
}

impl PfcpPacket {
    pub fn new(header: PfcpHeader, ies: Vec<Ie>) -> Self {
        Self { header, ies }
    }

    /// Parse complete packet from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = PfcpHeader::parse(data)?;

        let total = 4 + header.length as usize;
        if total < header.header_len() {
            return Err(PfcpsimError::InvalidPacket(format!(
                "Length {} shorter than header",
                header.length
            )));
        }
        if data.len() < total {
            return Err(PfcpsimError::InvalidPacket("Packet truncated".to_string()));
        }

        let body = Bytes::copy_from_slice(&data[header.header_len()..total]);
        let ies = decode_ies(body)?;

        Ok(Self { header, ies })
    }

    /// Serialize packet to bytes, recalculating the header length
    pub fn serialize(&self) -> Bytes {
        let mut body = BytesMut::new();
        encode_ies(&self.ies, &mut body);

        let mut header = self.header.clone();
        header.length = (header.header_len() - 4 + body.len()) as u16;

        let mut buf = BytesMut::with_capacity(header.header_len() + body.len());
        header.serialize(&mut buf);
        buf.extend_from_slice(&body);
        buf.freeze()
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    pub fn sequence_number(&self) -> u32 {
        self.header.sequence_number
    }

    /// Find top-level IE by type
    pub fn find_ie(&self, ie_type: u16) -> Option<&Ie> {
        self.ies.iter().find(|ie| ie.ie_type == ie_type)
    }

    /// Get all top-level IEs with specific type
    pub fn find_all_ies(&self, ie_type: u16) -> Vec<&Ie> {
        self.ies.iter().filter(|ie| ie.ie_type == ie_type).collect()
    }

    pub fn cause(&self) -> Option<Cause> {
        self.find_ie(IE_CAUSE).and_then(Ie::as_u8).map(Cause)
    }

    pub fn f_seid(&self) -> Result<Option<FSeid>> {
        self.find_ie(IE_F_SEID).map(FSeid::from_ie).transpose()
    }

    pub fn node_id(&self) -> Result<Option<NodeId>> {
        self.find_ie(IE_NODE_ID).map(NodeId::from_ie).transpose()
    }

    pub fn recovery_time_stamp(&self) -> Option<RecoveryTimeStamp> {
        self.find_ie(IE_RECOVERY_TIME_STAMP)
            .and_then(Ie::as_u32)
            .map(RecoveryTimeStamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_shared::CAUSE_REQUEST_ACCEPTED;

    #[test]
    fn test_packet_parse() {
        let data = vec![
            0x20, 6, 0, 9, // Version 1, Association Setup Response, Length (9)
            0, 0, 9, 0, // Sequence (9)
            0, 19, 0, 1, 1, // Cause (accepted)
        ];

        let packet = PfcpPacket::parse(&data).unwrap();
        assert_eq!(packet.message_type(), MessageType::AssociationSetupResponse);
        assert_eq!(packet.sequence_number(), 9);
        assert_eq!(packet.cause(), Some(Cause(CAUSE_REQUEST_ACCEPTED)));
        assert_eq!(packet.serialize().to_vec(), data);
    }

    #[test]
    fn test_packet_length_with_seid() {
        let header = PfcpHeader::with_seid(MessageType::SessionDeletionRequest, 42, 3);
        let packet = PfcpPacket::new(header, Vec::new());
        let bytes = packet.serialize();

        assert_eq!(bytes.len(), 16);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 12);

        let parsed = PfcpPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.header.seid, Some(42));
        assert!(parsed.ies.is_empty());
    }

    #[test]
    fn test_truncated_packet() {
        let data = vec![0x20, 2, 0, 20, 0, 0, 1, 0];
        assert!(matches!(
            PfcpPacket::parse(&data),
            Err(PfcpsimError::InvalidPacket(_))
        ));
    }
}
