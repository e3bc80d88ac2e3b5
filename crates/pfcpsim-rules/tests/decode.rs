use std::net::{IpAddr, Ipv4Addr};

use bytes::BytesMut;
use pfcpsim_core::ie::{decode_ies, encode_ies};
use pfcpsim_core::{ApplyAction, FSeid, GateStatus, Interface, NodeId, PdnType, PfcpPacket};
use pfcpsim_rules::*;
use pfcpsim_shared::*;

/// Encode IEs to bytes and parse them back
fn over_the_wire(ies: &[Ie]) -> Vec<Ie> {
    let mut buf = BytesMut::new();
    encode_ies(ies, &mut buf);
    decode_ies(buf.freeze()).unwrap()
}

#[test]
fn test_far_survives_the_wire() {
    let rule = FarBuilder::new()
        .with_id(1)
        .with_action(ApplyAction::FORWARD)
        .with_dst_interface(Interface::Core)
        .with_teid(0x1234)
        .with_downlink_ip(Ipv4Addr::new(10, 0, 0, 1))
        .build(IeMethod::Create)
        .unwrap();

    let decoded = over_the_wire(&[rule.ie.clone()]);
    let (method, far) = FarConfig::from_ie(&decoded[0]).unwrap();

    assert_eq!(method, IeMethod::Create);
    assert_eq!(far.id, 1);
    assert_eq!(far.apply_action, Some(ACTION_FORWARD));
    assert_eq!(far.dst_interface, Some(INTERFACE_CORE));
    assert_eq!(far.teid, 0x1234);
    assert_eq!(far.downlink_ip, Some(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(RuleDefinition::Far(far), rule.definition);
}

#[test]
fn test_pdr_survives_the_wire() {
    let rule = PdrBuilder::uplink(3, 100, 0x55, Ipv4Addr::new(198, 18, 0, 1))
        .with_far_id(1)
        .add_qer_id(1)
        .with_sdf_filter("permit out ip from any to assigned")
        .with_network_instance("internet")
        .build(IeMethod::Create)
        .unwrap();

    let decoded = over_the_wire(&[rule.ie.clone()]);
    let built = BuiltRule::decode(&decoded[0]).unwrap();

    assert_eq!(built.kind(), RuleKind::Pdr);
    assert_eq!(built.id(), 3);
    assert_eq!(built.definition, rule.definition);
}

#[test]
fn test_qer_survives_the_wire() {
    let rule = QerBuilder::new()
        .with_id(4)
        .with_gate_status(GateStatus::OPEN)
        .with_mbr(1_000, 2_000)
        .with_qfi(9)
        .build(IeMethod::Update)
        .unwrap();

    let decoded = over_the_wire(&[rule.ie.clone()]);
    let (method, qer) = QerConfig::from_ie(&decoded[0]).unwrap();
    assert_eq!(method, IeMethod::Update);
    assert_eq!(RuleDefinition::Qer(qer), rule.definition);
}

#[test]
fn test_fuzzed_far_keeps_injected_bits() {
    let rule = FarBuilder::new()
        .with_id(2)
        .with_dst_interface(Interface::Access)
        .fuzz(FarFuzz::WithAction, 0x03)
        .build(IeMethod::Create)
        .unwrap();

    let decoded = over_the_wire(&[rule.ie]);
    let (_, far) = FarConfig::from_ie(&decoded[0]).unwrap();
    assert_eq!(far.apply_action, Some(ACTION_DROP | ACTION_FORWARD));
}

#[test]
fn test_establishment_packet_decodes_to_its_rules() {
    let pdr = PdrBuilder::new()
        .with_id(1)
        .with_precedence(100)
        .with_source_interface(Interface::Access)
        .with_far_id(1)
        .build(IeMethod::Create)
        .unwrap();
    let far = FarBuilder::new()
        .with_id(1)
        .with_action(ApplyAction::FORWARD)
        .with_dst_interface(Interface::Core)
        .with_teid(0x1234)
        .with_downlink_ip(Ipv4Addr::new(10, 0, 0, 1))
        .build(IeMethod::Create)
        .unwrap();

    let node = NodeId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));
    let fseid = FSeid::new(7, IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
    let request = SessionBuilder::new(node.clone())
        .with_local_fseid(fseid.clone())
        .with_pdn_type(PdnType::Ipv4)
        .add_rules([pdr, far])
        .build_establishment()
        .unwrap();

    let bytes = request.to_packet(11).serialize();
    let packet = PfcpPacket::parse(&bytes).unwrap();

    assert_eq!(packet.sequence_number(), 11);
    assert_eq!(packet.node_id().unwrap(), Some(node));
    assert_eq!(packet.f_seid().unwrap(), Some(fseid));

    let rules: Vec<BuiltRule> = packet
        .ies
        .iter()
        .filter(|ie| RuleKind::from_envelope(ie.ie_type).is_some())
        .map(|ie| BuiltRule::decode(ie).unwrap())
        .collect();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules, request.rules);
}
