use bytes::{BufMut, Bytes, BytesMut};

pub const PFCP_VERSION: u8 = 1;
pub const PFCP_PORT: u16 = 8805;

/// Largest value of the 24-bit sequence number space
pub const MAX_SEQUENCE_NUMBER: u32 = 0x00FF_FFFF;

// IE Types (TS 29.244 table 8.1.2-1)
pub const IE_CREATE_PDR: u16 = 1;
pub const IE_PDI: u16 = 2;
pub const IE_CREATE_FAR: u16 = 3;
pub const IE_FORWARDING_PARAMETERS: u16 = 4;
pub const IE_CREATE_QER: u16 = 7;
pub const IE_CREATED_PDR: u16 = 8;
pub const IE_UPDATE_PDR: u16 = 9;
pub const IE_UPDATE_FAR: u16 = 10;
pub const IE_UPDATE_FORWARDING_PARAMETERS: u16 = 11;
pub const IE_UPDATE_QER: u16 = 14;
pub const IE_REMOVE_PDR: u16 = 15;
pub const IE_REMOVE_FAR: u16 = 16;
pub const IE_REMOVE_QER: u16 = 18;
pub const IE_CAUSE: u16 = 19;
pub const IE_SOURCE_INTERFACE: u16 = 20;
pub const IE_F_TEID: u16 = 21;
pub const IE_NETWORK_INSTANCE: u16 = 22;
pub const IE_SDF_FILTER: u16 = 23;
pub const IE_GATE_STATUS: u16 = 25;
pub const IE_MBR: u16 = 26;
pub const IE_GBR: u16 = 27;
pub const IE_PRECEDENCE: u16 = 29;
pub const IE_DESTINATION_INTERFACE: u16 = 42;
pub const IE_APPLY_ACTION: u16 = 44;
pub const IE_PDR_ID: u16 = 56;
pub const IE_F_SEID: u16 = 57;
pub const IE_NODE_ID: u16 = 60;
pub const IE_OUTER_HEADER_CREATION: u16 = 84;
pub const IE_UE_IP_ADDRESS: u16 = 93;
pub const IE_OUTER_HEADER_REMOVAL: u16 = 95;
pub const IE_RECOVERY_TIME_STAMP: u16 = 96;
pub const IE_FAR_ID: u16 = 108;
pub const IE_QER_ID: u16 = 109;
pub const IE_PDN_TYPE: u16 = 113;
pub const IE_QFI: u16 = 124;

// Cause values (TS 29.244 table 8.2.1-1)
pub const CAUSE_REQUEST_ACCEPTED: u8 = 1;
pub const CAUSE_REQUEST_REJECTED: u8 = 64;
pub const CAUSE_SESSION_CONTEXT_NOT_FOUND: u8 = 65;
pub const CAUSE_MANDATORY_IE_MISSING: u8 = 66;
pub const CAUSE_CONDITIONAL_IE_MISSING: u8 = 67;
pub const CAUSE_INVALID_LENGTH: u8 = 68;
pub const CAUSE_MANDATORY_IE_INCORRECT: u8 = 69;
pub const CAUSE_INVALID_FORWARDING_POLICY: u8 = 70;
pub const CAUSE_INVALID_F_TEID_ALLOCATION_OPTION: u8 = 71;
pub const CAUSE_NO_ESTABLISHED_PFCP_ASSOCIATION: u8 = 72;
pub const CAUSE_RULE_CREATION_MODIFICATION_FAILURE: u8 = 73;
pub const CAUSE_PFCP_ENTITY_IN_CONGESTION: u8 = 74;
pub const CAUSE_NO_RESOURCES_AVAILABLE: u8 = 75;
pub const CAUSE_SERVICE_NOT_SUPPORTED: u8 = 76;
pub const CAUSE_SYSTEM_FAILURE: u8 = 77;

// Interface values (Source/Destination Interface IE)
pub const INTERFACE_ACCESS: u8 = 0;
pub const INTERFACE_CORE: u8 = 1;
pub const INTERFACE_SGI_LAN: u8 = 2;
pub const INTERFACE_CP_FUNCTION: u8 = 3;

// Apply Action flags
pub const ACTION_DROP: u8 = 0x01;
pub const ACTION_FORWARD: u8 = 0x02;
pub const ACTION_BUFFER: u8 = 0x04;
pub const ACTION_NOTIFY_CP: u8 = 0x08;
pub const ACTION_DUPLICATE: u8 = 0x10;

// Outer Header Creation description (octets 5-6)
pub const OUTER_HEADER_CREATION_GTPU_UDP_IPV4: u16 = 0x0100;
pub const OUTER_HEADER_CREATION_GTPU_UDP_IPV6: u16 = 0x0200;

// Outer Header Removal description
pub const OUTER_HEADER_REMOVAL_GTPU_UDP_IPV4: u8 = 0;

/// Whether an IE type carries nested IEs instead of a value
pub fn is_grouped_ie(ie_type: u16) -> bool {
    matches!(
        ie_type,
        IE_CREATE_PDR
            | IE_PDI
            | IE_CREATE_FAR
            | IE_FORWARDING_PARAMETERS
            | IE_CREATE_QER
            | IE_CREATED_PDR
            | IE_UPDATE_PDR
            | IE_UPDATE_FAR
            | IE_UPDATE_FORWARDING_PARAMETERS
            | IE_UPDATE_QER
            | IE_REMOVE_PDR
            | IE_REMOVE_FAR
            | IE_REMOVE_QER
    )
}

/// Human readable cause name, used in logs and error messages
pub fn cause_name(cause: u8) -> &'static str {
    match cause {
        CAUSE_REQUEST_ACCEPTED => "Request accepted",
        CAUSE_REQUEST_REJECTED => "Request rejected",
        CAUSE_SESSION_CONTEXT_NOT_FOUND => "Session context not found",
        CAUSE_MANDATORY_IE_MISSING => "Mandatory IE missing",
        CAUSE_CONDITIONAL_IE_MISSING => "Conditional IE missing",
        CAUSE_INVALID_LENGTH => "Invalid length",
        CAUSE_MANDATORY_IE_INCORRECT => "Mandatory IE incorrect",
        CAUSE_INVALID_FORWARDING_POLICY => "Invalid forwarding policy",
        CAUSE_INVALID_F_TEID_ALLOCATION_OPTION => "Invalid F-TEID allocation option",
        CAUSE_NO_ESTABLISHED_PFCP_ASSOCIATION => "No established PFCP association",
        CAUSE_RULE_CREATION_MODIFICATION_FAILURE => "Rule creation/modification failure",
        CAUSE_PFCP_ENTITY_IN_CONGESTION => "PFCP entity in congestion",
        CAUSE_NO_RESOURCES_AVAILABLE => "No resources available",
        CAUSE_SERVICE_NOT_SUPPORTED => "Service not supported",
        CAUSE_SYSTEM_FAILURE => "System failure",
        _ => "Unknown cause",
    }
}

/// Payload of an information element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IeValue {
    Raw(Bytes), // Zero-copy friendly
    Grouped(Vec<Ie>),
}

/// PFCP information element, possibly grouped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ie {
    pub ie_type: u16,
    pub value: IeValue,
}

impl Ie {
    pub fn raw(ie_type: u16, data: impl Into<Bytes>) -> Self {
        Self {
            ie_type,
            value: IeValue::Raw(data.into()),
        }
    }

    pub fn grouped(ie_type: u16, children: Vec<Ie>) -> Self {
        Self {
            ie_type,
            value: IeValue::Grouped(children),
        }
    }

    pub fn from_u8(ie_type: u16, value: u8) -> Self {
        Self::raw(ie_type, vec![value])
    }

    pub fn from_u16(ie_type: u16, value: u16) -> Self {
        Self::raw(ie_type, value.to_be_bytes().to_vec())
    }

    pub fn from_u32(ie_type: u16, value: u32) -> Self {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u32(value);
        Self::raw(ie_type, buf.freeze())
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.value, IeValue::Grouped(_))
    }

    /// Raw payload, `None` for grouped IEs
    pub fn data(&self) -> Option<&Bytes> {
        match &self.value {
            IeValue::Raw(data) => Some(data),
            IeValue::Grouped(_) => None,
        }
    }

    /// Nested IEs, empty for raw IEs
    pub fn children(&self) -> &[Ie] {
        match &self.value {
            IeValue::Grouped(children) => children,
            IeValue::Raw(_) => &[],
        }
    }

    // Helper: Get first nested IE of a type
    pub fn find(&self, ie_type: u16) -> Option<&Ie> {
        self.children().iter().find(|ie| ie.ie_type == ie_type)
    }

    // Helper: Get every nested IE of a type
    pub fn find_all(&self, ie_type: u16) -> impl Iterator<Item = &Ie> {
        self.children().iter().filter(move |ie| ie.ie_type == ie_type)
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.data().and_then(|d| d.first().copied())
    }

    pub fn as_u16(&self) -> Option<u16> {
        let d = self.data()?;
        (d.len() >= 2).then(|| u16::from_be_bytes([d[0], d[1]]))
    }

    pub fn as_u32(&self) -> Option<u32> {
        let d = self.data()?;
        (d.len() >= 4).then(|| u32::from_be_bytes([d[0], d[1], d[2], d[3]]))
    }

    /// Encoded length of the whole IE including its 4 byte header
    pub fn encoded_len(&self) -> usize {
        4 + self.payload_len()
    }

    pub fn payload_len(&self) -> usize {
        match &self.value {
            IeValue::Raw(data) => data.len(),
            IeValue::Grouped(children) => children.iter().map(Ie::encoded_len).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_lookup() {
        let far = Ie::grouped(
            IE_CREATE_FAR,
            vec![
                Ie::from_u32(IE_FAR_ID, 7),
                Ie::from_u8(IE_APPLY_ACTION, ACTION_FORWARD),
            ],
        );

        assert!(far.is_grouped());
        assert_eq!(far.find(IE_FAR_ID).and_then(Ie::as_u32), Some(7));
        assert_eq!(far.find(IE_APPLY_ACTION).and_then(Ie::as_u8), Some(ACTION_FORWARD));
        assert!(far.find(IE_QER_ID).is_none());
        assert_eq!(far.encoded_len(), 4 + (4 + 4) + (4 + 1));
    }

    #[test]
    fn test_short_payload_accessors() {
        let ie = Ie::raw(IE_PRECEDENCE, vec![0x00, 0x01]);
        assert_eq!(ie.as_u16(), Some(1));
        assert_eq!(ie.as_u32(), None);
    }

    #[test]
    fn test_is_grouped_ie() {
        assert!(is_grouped_ie(IE_PDI));
        assert!(is_grouped_ie(IE_UPDATE_FORWARDING_PARAMETERS));
        assert!(!is_grouped_ie(IE_F_TEID));
        assert_eq!(cause_name(CAUSE_RULE_CREATION_MODIFICATION_FAILURE), "Rule creation/modification failure");
    }
}
