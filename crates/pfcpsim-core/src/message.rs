//! Constructors for the node and session messages the simulator exchanges.
//!
//! Session request bodies are assembled by the rule crate; the functions
//! here only frame them with the right header.

use pfcpsim_shared::Ie;

use crate::header::{MessageType, PfcpHeader};
use crate::packet::PfcpPacket;
use crate::types::{Cause, FSeid, NodeId, RecoveryTimeStamp};

pub fn heartbeat_request(sequence: u32, recovery: RecoveryTimeStamp) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::new(MessageType::HeartbeatRequest, sequence),
        vec![recovery.to_ie()],
    )
}

pub fn heartbeat_response(sequence: u32, recovery: RecoveryTimeStamp) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::new(MessageType::HeartbeatResponse, sequence),
        vec![recovery.to_ie()],
    )
}

pub fn association_setup_request(
    sequence: u32,
    node_id: &NodeId,
    recovery: RecoveryTimeStamp,
) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::new(MessageType::AssociationSetupRequest, sequence),
        vec![node_id.to_ie(), recovery.to_ie()],
    )
}

pub fn association_setup_response(
    sequence: u32,
    node_id: &NodeId,
    cause: Cause,
    recovery: RecoveryTimeStamp,
) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::new(MessageType::AssociationSetupResponse, sequence),
        vec![node_id.to_ie(), cause.to_ie(), recovery.to_ie()],
    )
}

pub fn association_release_request(sequence: u32, node_id: &NodeId) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::new(MessageType::AssociationReleaseRequest, sequence),
        vec![node_id.to_ie()],
    )
}

pub fn association_release_response(sequence: u32, node_id: &NodeId, cause: Cause) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::new(MessageType::AssociationReleaseResponse, sequence),
        vec![node_id.to_ie(), cause.to_ie()],
    )
}

/// Session request framed with the peer's SEID (0 for establishment)
pub fn session_request(
    message_type: MessageType,
    seid: u64,
    sequence: u32,
    ies: Vec<Ie>,
) -> PfcpPacket {
    PfcpPacket::new(PfcpHeader::with_seid(message_type, seid, sequence), ies)
}

pub fn session_establishment_response(
    sequence: u32,
    cp_seid: u64,
    node_id: &NodeId,
    cause: Cause,
    up_fseid: Option<&FSeid>,
) -> PfcpPacket {
    let mut ies = vec![node_id.to_ie(), cause.to_ie()];
    if let Some(fseid) = up_fseid {
        ies.push(fseid.to_ie());
    }
    PfcpPacket::new(
        PfcpHeader::with_seid(MessageType::SessionEstablishmentResponse, cp_seid, sequence),
        ies,
    )
}

/// Modification and deletion responses only carry a cause
pub fn session_response(
    message_type: MessageType,
    sequence: u32,
    cp_seid: u64,
    cause: Cause,
) -> PfcpPacket {
    PfcpPacket::new(
        PfcpHeader::with_seid(message_type, cp_seid, sequence),
        vec![cause.to_ie()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_association_setup_request() {
        let node = NodeId::Ipv4(Ipv4Addr::new(10, 0, 0, 2));
        let packet = association_setup_request(1, &node, RecoveryTimeStamp(3_900_000_000));
        let bytes = packet.serialize();

        let parsed = PfcpPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.message_type(), MessageType::AssociationSetupRequest);
        assert_eq!(parsed.node_id().unwrap(), Some(node));
        assert_eq!(
            parsed.recovery_time_stamp(),
            Some(RecoveryTimeStamp(3_900_000_000))
        );
        assert!(parsed.header.seid.is_none());
    }

    #[test]
    fn test_session_establishment_response() {
        let node = NodeId::Ipv4(Ipv4Addr::new(10, 0, 0, 9));
        let up = FSeid::new(0x99, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)));
        let packet = session_establishment_response(4, 0x11, &node, Cause::REQUEST_ACCEPTED, Some(&up));

        let parsed = PfcpPacket::parse(&packet.serialize()).unwrap();
        assert_eq!(parsed.header.seid, Some(0x11));
        assert_eq!(parsed.cause(), Some(Cause::REQUEST_ACCEPTED));
        assert_eq!(parsed.f_seid().unwrap(), Some(up));
    }
}
