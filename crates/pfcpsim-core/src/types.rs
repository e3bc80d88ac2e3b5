use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::BitOr;

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, TimeZone, Utc};
use pfcpsim_shared::*;
use serde::{Deserialize, Serialize};

use crate::error::{PfcpsimError, Result};

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
pub const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

fn payload(ie: &Ie, expected: u16) -> Result<&[u8]> {
    if ie.ie_type != expected {
        return Err(PfcpsimError::UnexpectedIe {
            expected,
            found: ie.ie_type,
        });
    }
    ie.data()
        .map(|d| &d[..])
        .ok_or_else(|| PfcpsimError::InvalidIeValue {
            ie_type: expected,
            reason: "grouped IE where a value was expected".to_string(),
        })
}

fn need(ie_type: u16, data: &[u8], len: usize) -> Result<()> {
    if data.len() < len {
        return Err(PfcpsimError::InvalidIeValue {
            ie_type,
            reason: format!("needs {len} bytes, got {}", data.len()),
        });
    }
    Ok(())
}

fn get_ipv4(buf: &mut &[u8]) -> Ipv4Addr {
    let mut octets = [0u8; 4];
    buf.copy_to_slice(&mut octets);
    Ipv4Addr::from(octets)
}

fn get_ipv6(buf: &mut &[u8]) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    buf.copy_to_slice(&mut octets);
    Ipv6Addr::from(octets)
}

// ========================================
// Interfaces and actions
// ========================================

/// Source/Destination Interface value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    Access,
    Core,
    SgiLan,
    CpFunction,
}

impl From<Interface> for u8 {
    fn from(value: Interface) -> Self {
        match value {
            Interface::Access => INTERFACE_ACCESS,
            Interface::Core => INTERFACE_CORE,
            Interface::SgiLan => INTERFACE_SGI_LAN,
            Interface::CpFunction => INTERFACE_CP_FUNCTION,
        }
    }
}

impl TryFrom<u8> for Interface {
    type Error = PfcpsimError;

    fn try_from(value: u8) -> Result<Self> {
        match value & 0x0F {
            INTERFACE_ACCESS => Ok(Self::Access),
            INTERFACE_CORE => Ok(Self::Core),
            INTERFACE_SGI_LAN => Ok(Self::SgiLan),
            INTERFACE_CP_FUNCTION => Ok(Self::CpFunction),
            other => Err(PfcpsimError::InvalidIeValue {
                ie_type: IE_SOURCE_INTERFACE,
                reason: format!("unknown interface value {other}"),
            }),
        }
    }
}

/// Apply Action bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ApplyAction(pub u8);

impl ApplyAction {
    pub const DROP: Self = Self(ACTION_DROP);
    pub const FORWARD: Self = Self(ACTION_FORWARD);
    pub const BUFFER: Self = Self(ACTION_BUFFER);
    pub const NOTIFY_CP: Self = Self(ACTION_NOTIFY_CP);
    pub const DUPLICATE: Self = Self(ACTION_DUPLICATE);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: ApplyAction) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ApplyAction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::DROP, "DROP"),
            (Self::FORWARD, "FORW"),
            (Self::BUFFER, "BUFF"),
            (Self::NOTIFY_CP, "NOCP"),
            (Self::DUPLICATE, "DUPL"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "{:#04x}", self.0)
        } else {
            f.write_str(&set.join("|"))
        }
    }
}

// ========================================
// Cause
// ========================================

/// Cause IE value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cause(pub u8);

impl Cause {
    pub const REQUEST_ACCEPTED: Self = Self(CAUSE_REQUEST_ACCEPTED);
    pub const REQUEST_REJECTED: Self = Self(CAUSE_REQUEST_REJECTED);
    pub const RULE_CREATION_MODIFICATION_FAILURE: Self =
        Self(CAUSE_RULE_CREATION_MODIFICATION_FAILURE);

    pub fn is_accepted(&self) -> bool {
        self.0 == CAUSE_REQUEST_ACCEPTED
    }

    pub fn name(&self) -> &'static str {
        cause_name(self.0)
    }

    pub fn to_ie(&self) -> Ie {
        Ie::from_u8(IE_CAUSE, self.0)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

// ========================================
// Node ID
// ========================================

/// Node ID IE
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Fqdn(String),
}

impl From<IpAddr> for NodeId {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::Ipv4(v4),
            IpAddr::V6(v6) => Self::Ipv6(v6),
        }
    }
}

impl NodeId {
    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::new();
        match self {
            Self::Ipv4(addr) => {
                buf.put_u8(0);
                buf.put_slice(&addr.octets());
            }
            Self::Ipv6(addr) => {
                buf.put_u8(1);
                buf.put_slice(&addr.octets());
            }
            Self::Fqdn(name) => {
                buf.put_u8(2);
                for label in name.split('.').filter(|l| !l.is_empty()) {
                    buf.put_u8(label.len() as u8);
                    buf.put_slice(label.as_bytes());
                }
            }
        }
        Ie::raw(IE_NODE_ID, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = payload(ie, IE_NODE_ID)?;
        need(IE_NODE_ID, data, 1)?;
        let mut buf = &data[1..];
        match data[0] & 0x0F {
            0 => {
                need(IE_NODE_ID, buf, 4)?;
                Ok(Self::Ipv4(get_ipv4(&mut buf)))
            }
            1 => {
                need(IE_NODE_ID, buf, 16)?;
                Ok(Self::Ipv6(get_ipv6(&mut buf)))
            }
            2 => {
                let mut labels = Vec::new();
                while buf.has_remaining() {
                    let len = buf.get_u8() as usize;
                    need(IE_NODE_ID, buf, len)?;
                    labels.push(String::from_utf8_lossy(&buf[..len]).into_owned());
                    buf.advance(len);
                }
                Ok(Self::Fqdn(labels.join(".")))
            }
            other => Err(PfcpsimError::InvalidIeValue {
                ie_type: IE_NODE_ID,
                reason: format!("unknown node id type {other}"),
            }),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(addr) => write!(f, "{addr}"),
            Self::Ipv6(addr) => write!(f, "{addr}"),
            Self::Fqdn(name) => f.write_str(name),
        }
    }
}

// ========================================
// F-SEID / F-TEID
// ========================================

/// Fully qualified SEID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FSeid {
    pub seid: u64,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl FSeid {
    const FLAG_V6: u8 = 0x01;
    const FLAG_V4: u8 = 0x02;

    pub fn new(seid: u64, addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self {
                seid,
                ipv4: Some(v4),
                ipv6: None,
            },
            IpAddr::V6(v6) => Self {
                seid,
                ipv4: None,
                ipv6: Some(v6),
            },
        }
    }

    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(29);
        let mut flags = 0;
        if self.ipv4.is_some() {
            flags |= Self::FLAG_V4;
        }
        if self.ipv6.is_some() {
            flags |= Self::FLAG_V6;
        }
        buf.put_u8(flags);
        buf.put_u64(self.seid);
        if let Some(addr) = self.ipv4 {
            buf.put_slice(&addr.octets());
        }
        if let Some(addr) = self.ipv6 {
            buf.put_slice(&addr.octets());
        }
        Ie::raw(IE_F_SEID, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = payload(ie, IE_F_SEID)?;
        need(IE_F_SEID, data, 9)?;
        let mut buf = data;
        let flags = buf.get_u8();
        let seid = buf.get_u64();

        let ipv4 = if flags & Self::FLAG_V4 != 0 {
            need(IE_F_SEID, buf, 4)?;
            Some(get_ipv4(&mut buf))
        } else {
            None
        };
        let ipv6 = if flags & Self::FLAG_V6 != 0 {
            need(IE_F_SEID, buf, 16)?;
            Some(get_ipv6(&mut buf))
        } else {
            None
        };

        Ok(Self { seid, ipv4, ipv6 })
    }
}

/// Fully qualified TEID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FTeid {
    pub teid: u32,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    /// CH flag: the UP function allocates the TEID
    pub choose: bool,
    pub choose_id: Option<u8>,
}

impl FTeid {
    const FLAG_V4: u8 = 0x01;
    const FLAG_V6: u8 = 0x02;
    const FLAG_CH: u8 = 0x04;
    const FLAG_CHID: u8 = 0x08;

    pub fn new(teid: u32, addr: Ipv4Addr) -> Self {
        Self {
            teid,
            ipv4: Some(addr),
            ipv6: None,
            choose: false,
            choose_id: None,
        }
    }

    /// F-TEID asking the UP function to allocate
    pub fn choose(choose_id: Option<u8>) -> Self {
        Self {
            teid: 0,
            ipv4: None,
            ipv6: None,
            choose: true,
            choose_id,
        }
    }

    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(26);
        let mut flags = 0;
        if self.ipv4.is_some() {
            flags |= Self::FLAG_V4;
        }
        if self.ipv6.is_some() {
            flags |= Self::FLAG_V6;
        }
        if self.choose {
            flags |= Self::FLAG_CH | Self::FLAG_V4;
            if self.choose_id.is_some() {
                flags |= Self::FLAG_CHID;
            }
        }
        buf.put_u8(flags);

        if self.choose {
            if let Some(id) = self.choose_id {
                buf.put_u8(id);
            }
        } else {
            buf.put_u32(self.teid);
            if let Some(addr) = self.ipv4 {
                buf.put_slice(&addr.octets());
            }
            if let Some(addr) = self.ipv6 {
                buf.put_slice(&addr.octets());
            }
        }
        Ie::raw(IE_F_TEID, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = payload(ie, IE_F_TEID)?;
        need(IE_F_TEID, data, 1)?;
        let mut buf = data;
        let flags = buf.get_u8();

        if flags & Self::FLAG_CH != 0 {
            let choose_id = if flags & Self::FLAG_CHID != 0 {
                need(IE_F_TEID, buf, 1)?;
                Some(buf.get_u8())
            } else {
                None
            };
            return Ok(Self::choose(choose_id));
        }

        need(IE_F_TEID, buf, 4)?;
        let teid = buf.get_u32();
        let ipv4 = if flags & Self::FLAG_V4 != 0 {
            need(IE_F_TEID, buf, 4)?;
            Some(get_ipv4(&mut buf))
        } else {
            None
        };
        let ipv6 = if flags & Self::FLAG_V6 != 0 {
            need(IE_F_TEID, buf, 16)?;
            Some(get_ipv6(&mut buf))
        } else {
            None
        };

        Ok(Self {
            teid,
            ipv4,
            ipv6,
            choose: false,
            choose_id: None,
        })
    }
}

// ========================================
// Forwarding
// ========================================

/// Outer Header Creation (GTP-U/UDP/IPv4 only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OuterHeaderCreation {
    pub description: u16,
    pub teid: u32,
    pub ipv4: Ipv4Addr,
}

impl OuterHeaderCreation {
    pub fn gtpu(teid: u32, ipv4: Ipv4Addr) -> Self {
        Self {
            description: OUTER_HEADER_CREATION_GTPU_UDP_IPV4,
            teid,
            ipv4,
        }
    }

    /// Description set, TEID 0 and address 0.0.0.0
    pub fn zero_based() -> Self {
        Self::gtpu(0, Ipv4Addr::UNSPECIFIED)
    }

    pub fn to_ie(&self) -> Ie {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u16(self.description);
        buf.put_u32(self.teid);
        buf.put_slice(&self.ipv4.octets());
        Ie::raw(IE_OUTER_HEADER_CREATION, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = payload(ie, IE_OUTER_HEADER_CREATION)?;
        need(IE_OUTER_HEADER_CREATION, data, 10)?;
        let mut buf = data;
        let description = buf.get_u16();
        let teid = buf.get_u32();
        let ipv4 = get_ipv4(&mut buf);
        Ok(Self {
            description,
            teid,
            ipv4,
        })
    }
}

/// UE IP Address (IPv4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UeIpAddress {
    pub ipv4: Ipv4Addr,
    /// S/D flag: address is the destination (downlink)
    pub destination: bool,
}

impl UeIpAddress {
    const FLAG_V4: u8 = 0x02;
    const FLAG_SD: u8 = 0x04;

    pub fn to_ie(&self) -> Ie {
        let mut flags = Self::FLAG_V4;
        if self.destination {
            flags |= Self::FLAG_SD;
        }
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(flags);
        buf.put_slice(&self.ipv4.octets());
        Ie::raw(IE_UE_IP_ADDRESS, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = payload(ie, IE_UE_IP_ADDRESS)?;
        need(IE_UE_IP_ADDRESS, data, 1)?;
        let mut buf = data;
        let flags = buf.get_u8();
        if flags & Self::FLAG_V4 == 0 {
            return Err(PfcpsimError::InvalidIeValue {
                ie_type: IE_UE_IP_ADDRESS,
                reason: "only IPv4 UE addresses are supported".to_string(),
            });
        }
        need(IE_UE_IP_ADDRESS, buf, 4)?;
        Ok(Self {
            ipv4: get_ipv4(&mut buf),
            destination: flags & Self::FLAG_SD != 0,
        })
    }
}

/// SDF Filter carrying a flow description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SdfFilter {
    pub flow_description: String,
}

impl SdfFilter {
    const FLAG_FD: u8 = 0x01;

    pub fn to_ie(&self) -> Ie {
        let fd = self.flow_description.as_bytes();
        let mut buf = BytesMut::with_capacity(4 + fd.len());
        buf.put_u8(Self::FLAG_FD);
        buf.put_u8(0);
        buf.put_u16(fd.len() as u16);
        buf.put_slice(fd);
        Ie::raw(IE_SDF_FILTER, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = payload(ie, IE_SDF_FILTER)?;
        need(IE_SDF_FILTER, data, 2)?;
        let mut buf = data;
        let flags = buf.get_u8();
        buf.advance(1);
        if flags & Self::FLAG_FD == 0 {
            return Ok(Self {
                flow_description: String::new(),
            });
        }
        need(IE_SDF_FILTER, buf, 2)?;
        let len = buf.get_u16() as usize;
        need(IE_SDF_FILTER, buf, len)?;
        Ok(Self {
            flow_description: String::from_utf8_lossy(&buf[..len]).into_owned(),
        })
    }
}

// ========================================
// QoS
// ========================================

/// MBR/GBR value pair in kbps (40 bits each on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bitrate {
    pub uplink: u64,
    pub downlink: u64,
}

impl Bitrate {
    pub const MAX: u64 = 0xFF_FFFF_FFFF;

    pub fn new(uplink: u64, downlink: u64) -> Self {
        Self { uplink, downlink }
    }

    pub fn to_ie(&self, ie_type: u16) -> Ie {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_slice(&self.uplink.min(Self::MAX).to_be_bytes()[3..]);
        buf.put_slice(&self.downlink.min(Self::MAX).to_be_bytes()[3..]);
        Ie::raw(ie_type, buf.freeze())
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        let data = ie.data().ok_or_else(|| PfcpsimError::InvalidIeValue {
            ie_type: ie.ie_type,
            reason: "grouped IE where a bitrate was expected".to_string(),
        })?;
        need(ie.ie_type, data, 10)?;
        let read = |bytes: &[u8]| {
            let mut octets = [0u8; 8];
            octets[3..].copy_from_slice(bytes);
            u64::from_be_bytes(octets)
        };
        Ok(Self {
            uplink: read(&data[0..5]),
            downlink: read(&data[5..10]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Open,
    Closed,
}

/// Gate Status IE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GateStatus {
    pub uplink: Gate,
    pub downlink: Gate,
}

impl GateStatus {
    pub const OPEN: Self = Self {
        uplink: Gate::Open,
        downlink: Gate::Open,
    };

    pub fn bits(&self) -> u8 {
        let bit = |gate: Gate| match gate {
            Gate::Open => 0,
            Gate::Closed => 1,
        };
        (bit(self.uplink) << 2) | bit(self.downlink)
    }

    pub fn from_bits(bits: u8) -> Self {
        let gate = |value: u8| if value & 0x03 == 0 { Gate::Open } else { Gate::Closed };
        Self {
            uplink: gate(bits >> 2),
            downlink: gate(bits),
        }
    }
}

/// PDN Type IE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdnType {
    Ipv4 = 1,
    Ipv6 = 2,
    Ipv4v6 = 3,
    NonIp = 4,
    Ethernet = 5,
}

impl PdnType {
    pub fn to_ie(&self) -> Ie {
        Ie::from_u8(IE_PDN_TYPE, *self as u8)
    }
}

// ========================================
// Recovery Time Stamp
// ========================================

/// Recovery Time Stamp in NTP seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecoveryTimeStamp(pub u32);

impl RecoveryTimeStamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self((at.timestamp() + NTP_UNIX_OFFSET) as u32)
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0 as i64 - NTP_UNIX_OFFSET, 0).single()
    }

    pub fn to_ie(&self) -> Ie {
        Ie::from_u32(IE_RECOVERY_TIME_STAMP, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_action_flags() {
        let action = ApplyAction::DROP | ApplyAction::FORWARD;
        assert_eq!(action.bits(), 0x03);
        assert!(action.contains(ApplyAction::DROP));
        assert!(!action.contains(ApplyAction::BUFFER));
        assert_eq!(action.to_string(), "DROP|FORW");
        assert_eq!(ApplyAction(0x80).to_string(), "0x80");
    }

    #[test]
    fn test_interface_conversion() {
        assert_eq!(u8::from(Interface::Core), 1);
        assert_eq!(Interface::try_from(0).unwrap(), Interface::Access);
        assert!(Interface::try_from(9).is_err());
    }

    #[test]
    fn test_cause_display() {
        assert!(Cause::REQUEST_ACCEPTED.is_accepted());
        assert_eq!(
            Cause::RULE_CREATION_MODIFICATION_FAILURE.to_string(),
            "Rule creation/modification failure (73)"
        );
    }

    #[test]
    fn test_node_id_roundtrip() {
        for node in [
            NodeId::Ipv4(Ipv4Addr::new(10, 0, 0, 1)),
            NodeId::Ipv6(Ipv6Addr::LOCALHOST),
            NodeId::Fqdn("smf.example.org".to_string()),
        ] {
            assert_eq!(NodeId::from_ie(&node.to_ie()).unwrap(), node);
        }
    }

    #[test]
    fn test_f_seid_encoding() {
        let fseid = FSeid::new(0x1122, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)));
        let ie = fseid.to_ie();
        let data = ie.data().unwrap();
        assert_eq!(data[0], 0x02);
        assert_eq!(data.len(), 13);
        assert_eq!(FSeid::from_ie(&ie).unwrap(), fseid);
    }

    #[test]
    fn test_f_teid_encoding() {
        let fteid = FTeid::new(0x1234, Ipv4Addr::new(198, 18, 0, 1));
        let ie = fteid.to_ie();
        assert_eq!(
            ie.data().unwrap().to_vec(),
            vec![0x01, 0, 0, 0x12, 0x34, 198, 18, 0, 1]
        );
        assert_eq!(FTeid::from_ie(&ie).unwrap(), fteid);

        let choose = FTeid::choose(Some(5));
        assert_eq!(choose.to_ie().data().unwrap().to_vec(), vec![0x0D, 5]);
        assert_eq!(FTeid::from_ie(&choose.to_ie()).unwrap(), choose);
    }

    #[test]
    fn test_outer_header_creation() {
        let ohc = OuterHeaderCreation::gtpu(0x1234, Ipv4Addr::new(10, 0, 0, 1));
        let ie = ohc.to_ie();
        assert_eq!(
            ie.data().unwrap().to_vec(),
            vec![0x01, 0x00, 0, 0, 0x12, 0x34, 10, 0, 0, 1]
        );
        assert_eq!(OuterHeaderCreation::from_ie(&ie).unwrap(), ohc);

        let zero = OuterHeaderCreation::zero_based();
        assert_eq!(zero.teid, 0);
        assert_eq!(zero.ipv4, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_bitrate_is_40_bits() {
        let mbr = Bitrate::new(1_000_000, u64::MAX);
        let ie = mbr.to_ie(IE_MBR);
        assert_eq!(ie.data().unwrap().len(), 10);
        let decoded = Bitrate::from_ie(&ie).unwrap();
        assert_eq!(decoded.uplink, 1_000_000);
        assert_eq!(decoded.downlink, Bitrate::MAX);
    }

    #[test]
    fn test_gate_status_bits() {
        let status = GateStatus {
            uplink: Gate::Closed,
            downlink: Gate::Open,
        };
        assert_eq!(status.bits(), 0x04);
        assert_eq!(GateStatus::from_bits(0x04), status);
        assert_eq!(GateStatus::OPEN.bits(), 0);
    }

    #[test]
    fn test_ue_ip_and_sdf() {
        let ue = UeIpAddress {
            ipv4: Ipv4Addr::new(17, 0, 0, 1),
            destination: true,
        };
        assert_eq!(ue.to_ie().data().unwrap()[0], 0x06);
        assert_eq!(UeIpAddress::from_ie(&ue.to_ie()).unwrap(), ue);

        let sdf = SdfFilter {
            flow_description: "permit out ip from any to assigned".to_string(),
        };
        assert_eq!(SdfFilter::from_ie(&sdf.to_ie()).unwrap(), sdf);
    }

    #[test]
    fn test_recovery_time_stamp() {
        let at = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 10).unwrap();
        let ts = RecoveryTimeStamp::from_datetime(at);
        assert_eq!(ts.0, 2_208_988_810);
        assert_eq!(ts.to_datetime(), Some(at));
    }

    #[test]
    fn test_wrong_ie_type() {
        let ie = Ie::from_u32(IE_FAR_ID, 1);
        assert!(matches!(
            FSeid::from_ie(&ie),
            Err(PfcpsimError::UnexpectedIe { expected: IE_F_SEID, found: IE_FAR_ID })
        ));
    }
}
