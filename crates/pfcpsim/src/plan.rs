//! Rule templates used for simulated UE sessions.
//!
//! Every session gets the same rule IDs: an uplink PDR/FAR pair, a downlink
//! PDR/FAR pair and one QER shared by both directions. The session index
//! selects the tunnel IDs and the UE address.

use std::net::Ipv4Addr;

use pfcpsim_core::{ApplyAction, GateStatus, Interface};
use pfcpsim_rules::{BuiltRule, FarBuilder, IeMethod, PdrBuilder, QerBuilder, RuleError};

pub const UPLINK_PDR_ID: u32 = 1;
pub const DOWNLINK_PDR_ID: u32 = 2;
pub const UPLINK_FAR_ID: u32 = 1;
pub const DOWNLINK_FAR_ID: u32 = 2;
pub const SESSION_QER_ID: u32 = 1;

pub const PRECEDENCE: u32 = 100;
pub const SDF_FILTER: &str = "permit out ip from any to assigned";

/// Addresses shared by every session of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub upf_n3: Ipv4Addr,
    pub gnb: Ipv4Addr,
}

/// Full rule set of session `index`
pub fn session_rules(
    index: u32,
    endpoints: Endpoints,
    ue_address: Ipv4Addr,
    qfi: u8,
) -> Result<Vec<BuiltRule>, RuleError> {
    let uplink_pdr = PdrBuilder::uplink(UPLINK_PDR_ID, PRECEDENCE, index, endpoints.upf_n3)
        .with_sdf_filter(SDF_FILTER)
        .with_far_id(UPLINK_FAR_ID)
        .add_qer_id(SESSION_QER_ID)
        .build(IeMethod::Create)?;

    let downlink_pdr = PdrBuilder::downlink(DOWNLINK_PDR_ID, PRECEDENCE, ue_address)
        .with_sdf_filter(SDF_FILTER)
        .with_far_id(DOWNLINK_FAR_ID)
        .add_qer_id(SESSION_QER_ID)
        .build(IeMethod::Create)?;

    let uplink_far = FarBuilder::new()
        .with_id(UPLINK_FAR_ID)
        .with_action(ApplyAction::FORWARD)
        .with_dst_interface(Interface::Core)
        .build(IeMethod::Create)?;

    let downlink_far = FarBuilder::new()
        .with_id(DOWNLINK_FAR_ID)
        .with_action(ApplyAction::FORWARD)
        .with_dst_interface(Interface::Access)
        .with_teid(index)
        .with_downlink_ip(endpoints.gnb)
        .build(IeMethod::Create)?;

    let qer = QerBuilder::new()
        .with_id(SESSION_QER_ID)
        .with_gate_status(GateStatus::OPEN)
        .with_qfi(qfi)
        .build(IeMethod::Create)?;

    Ok(vec![uplink_pdr, downlink_pdr, uplink_far, downlink_far, qer])
}

/// Downlink FAR change: a new tunnel towards `gnb`, or buffering
pub fn downlink_update(
    index: u32,
    gnb: Ipv4Addr,
    buffer: bool,
    notify_cp: bool,
) -> Result<BuiltRule, RuleError> {
    let mut action = if buffer {
        ApplyAction::BUFFER
    } else {
        ApplyAction::FORWARD
    };
    if notify_cp {
        action = action | ApplyAction::NOTIFY_CP;
    }

    let mut far = FarBuilder::new()
        .with_id(DOWNLINK_FAR_ID)
        .with_action(action)
        .with_dst_interface(Interface::Access);
    if !buffer {
        far = far.with_teid(index).with_downlink_ip(gnb);
    }
    far.build(IeMethod::Update)
}

/// Host `index` of the pool; the network and broadcast addresses are never handed out
pub fn ue_address(network: Ipv4Addr, prefix_len: u8, index: u32) -> Option<Ipv4Addr> {
    let host_bits = 32 - u32::from(prefix_len.min(32));
    let hosts = 1u64 << host_bits;
    if index == 0 || u64::from(index) >= hosts.saturating_sub(1) {
        return None;
    }
    let mask = if host_bits == 32 { 0 } else { u32::MAX << host_bits };
    let base = u32::from(network) & mask;
    Some(Ipv4Addr::from(base | index))
}
