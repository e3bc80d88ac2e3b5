use std::collections::HashSet;

use pfcpsim_core::{message, FSeid, MessageType, NodeId, PdnType, PfcpPacket};
use pfcpsim_shared::Ie;
use tracing::{debug, error};

use crate::error::{RuleError, PROGRAMMER_ERROR_TARGET};
use crate::rule::{BuiltRule, IeMethod, RuleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionRequestKind {
    Establishment,
    Modification,
    Deletion,
}

impl SessionRequestKind {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Establishment => MessageType::SessionEstablishmentRequest,
            Self::Modification => MessageType::SessionModificationRequest,
            Self::Deletion => MessageType::SessionDeletionRequest,
        }
    }
}

/// A session request body ready to be framed with a sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub kind: SessionRequestKind,
    /// SEID carried in the header: the peer's SEID, 0 on establishment
    pub seid: u64,
    pub ies: Vec<Ie>,
    /// Rules in the order they were encoded
    pub rules: Vec<BuiltRule>,
}

impl SessionRequest {
    pub fn message_type(&self) -> MessageType {
        self.kind.message_type()
    }

    pub fn to_packet(&self, sequence: u32) -> PfcpPacket {
        message::session_request(self.message_type(), self.seid, sequence, self.ies.clone())
    }
}

/// Assembles session establishment, modification and deletion bodies
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    node_id: NodeId,
    local_fseid: Option<FSeid>,
    remote_seid: Option<u64>,
    pdn_type: Option<PdnType>,
    rules: Vec<BuiltRule>,
}

fn invalid(reason: impl Into<String>) -> RuleError {
    let reason = reason.into();
    error!(target: PROGRAMMER_ERROR_TARGET, reason = %reason, "Rejected session request");
    RuleError::InvalidSessionRequest(reason)
}

impl SessionBuilder {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            local_fseid: None,
            remote_seid: None,
            pdn_type: None,
            rules: Vec::new(),
        }
    }

    pub fn with_local_fseid(mut self, fseid: FSeid) -> Self {
        self.local_fseid = Some(fseid);
        self
    }

    pub fn with_remote_seid(mut self, seid: u64) -> Self {
        self.remote_seid = Some(seid);
        self
    }

    pub fn with_pdn_type(mut self, pdn_type: PdnType) -> Self {
        self.pdn_type = Some(pdn_type);
        self
    }

    pub fn add_rule(mut self, rule: BuiltRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn add_rules(mut self, rules: impl IntoIterator<Item = BuiltRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    fn require_local_fseid(&self) -> Result<&FSeid, RuleError> {
        self.local_fseid
            .as_ref()
            .ok_or_else(|| invalid("local F-SEID is not set"))
    }

    fn require_remote_seid(&self) -> Result<u64, RuleError> {
        self.remote_seid
            .ok_or_else(|| invalid("remote SEID is not set"))
    }

    fn check_unique_ids(&self) -> Result<(), RuleError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert((rule.kind(), rule.id())) {
                return Err(invalid(format!(
                    "{} {} appears more than once",
                    rule.kind(),
                    rule.id()
                )));
            }
        }
        Ok(())
    }

    /// Rule IEs of one kind, in insertion order
    fn rule_ies(&self, kind: RuleKind, method: Option<IeMethod>) -> impl Iterator<Item = &BuiltRule> {
        self.rules
            .iter()
            .filter(move |r| r.kind() == kind && method.map_or(true, |m| r.method == m))
    }

    pub fn build_establishment(&self) -> Result<SessionRequest, RuleError> {
        let fseid = self.require_local_fseid()?;

        if let Some(rule) = self.rules.iter().find(|r| r.method != IeMethod::Create) {
            return Err(invalid(format!(
                "establishment only accepts created rules, found {:?} {} {}",
                rule.method,
                rule.kind(),
                rule.id()
            )));
        }
        if self.rule_ies(RuleKind::Pdr, None).next().is_none() {
            return Err(invalid("establishment needs at least one PDR"));
        }
        if self.rule_ies(RuleKind::Far, None).next().is_none() {
            return Err(invalid("establishment needs at least one FAR"));
        }
        self.check_unique_ids()?;

        let mut ies = vec![self.node_id.to_ie(), fseid.to_ie()];
        let mut rules = Vec::with_capacity(self.rules.len());
        for kind in [RuleKind::Pdr, RuleKind::Far, RuleKind::Qer] {
            for rule in self.rule_ies(kind, None) {
                ies.push(rule.ie.clone());
                rules.push(rule.clone());
            }
        }
        if let Some(pdn_type) = self.pdn_type {
            ies.push(pdn_type.to_ie());
        }

        debug!(seid = fseid.seid, rules = rules.len(), "Built session establishment");
        Ok(SessionRequest {
            kind: SessionRequestKind::Establishment,
            seid: 0,
            ies,
            rules,
        })
    }

    pub fn build_modification(&self) -> Result<SessionRequest, RuleError> {
        let fseid = self.require_local_fseid()?;
        let remote_seid = self.require_remote_seid()?;
        self.check_unique_ids()?;

        let mut ies = Vec::with_capacity(self.rules.len());
        let mut rules = Vec::with_capacity(self.rules.len());
        for method in [IeMethod::Delete, IeMethod::Create, IeMethod::Update] {
            for kind in [RuleKind::Pdr, RuleKind::Far, RuleKind::Qer] {
                for rule in self.rule_ies(kind, Some(method)) {
                    ies.push(rule.ie.clone());
                    rules.push(rule.clone());
                }
            }
        }

        debug!(seid = fseid.seid, remote_seid, rules = rules.len(), "Built session modification");
        Ok(SessionRequest {
            kind: SessionRequestKind::Modification,
            seid: remote_seid,
            ies,
            rules,
        })
    }

    pub fn build_deletion(&self) -> Result<SessionRequest, RuleError> {
        self.require_local_fseid()?;
        let remote_seid = self.require_remote_seid()?;
        if !self.rules.is_empty() {
            return Err(invalid("deletion does not carry rules"));
        }

        Ok(SessionRequest {
            kind: SessionRequestKind::Deletion,
            seid: remote_seid,
            ies: Vec::new(),
            rules: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FarBuilder, PdrBuilder, QerBuilder};
    use pfcpsim_core::{ApplyAction, GateStatus, Interface};
    use pfcpsim_shared::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn node() -> NodeId {
        NodeId::Ipv4(Ipv4Addr::new(10, 0, 0, 2))
    }

    fn fseid() -> FSeid {
        FSeid::new(1, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)))
    }

    fn pdr(id: u32) -> BuiltRule {
        PdrBuilder::downlink(id, 100, Ipv4Addr::new(17, 0, 0, 1))
            .with_far_id(1)
            .build(IeMethod::Create)
            .unwrap()
    }

    fn far(id: u32, method: IeMethod) -> BuiltRule {
        FarBuilder::new()
            .with_id(id)
            .with_action(ApplyAction::FORWARD)
            .with_dst_interface(Interface::Access)
            .build(method)
            .unwrap()
    }

    fn qer(id: u32) -> BuiltRule {
        QerBuilder::new()
            .with_id(id)
            .with_gate_status(GateStatus::OPEN)
            .build(IeMethod::Create)
            .unwrap()
    }

    #[test]
    fn test_establishment_ie_order() {
        let request = SessionBuilder::new(node())
            .with_local_fseid(fseid())
            .with_pdn_type(PdnType::Ipv4)
            .add_rule(qer(1))
            .add_rule(far(1, IeMethod::Create))
            .add_rule(pdr(1))
            .build_establishment()
            .unwrap();

        let types: Vec<u16> = request.ies.iter().map(|ie| ie.ie_type).collect();
        assert_eq!(
            types,
            vec![IE_NODE_ID, IE_F_SEID, IE_CREATE_PDR, IE_CREATE_FAR, IE_CREATE_QER, IE_PDN_TYPE]
        );
        assert_eq!(request.seid, 0);
        assert_eq!(request.message_type(), MessageType::SessionEstablishmentRequest);

        let packet = request.to_packet(42);
        assert_eq!(packet.sequence_number(), 42);
        assert_eq!(packet.header.seid, Some(0));
    }

    #[test]
    fn test_establishment_requirements() {
        let base = SessionBuilder::new(node()).with_local_fseid(fseid());

        assert!(base.clone().add_rule(pdr(1)).build_establishment().is_err());
        assert!(base
            .clone()
            .add_rule(far(1, IeMethod::Create))
            .build_establishment()
            .is_err());
        assert!(SessionBuilder::new(node())
            .add_rules([pdr(1), far(1, IeMethod::Create)])
            .build_establishment()
            .is_err());
        assert!(base
            .clone()
            .add_rules([pdr(1), far(1, IeMethod::Update)])
            .build_establishment()
            .is_err());
    }

    #[test]
    fn test_duplicate_rule_ids_rejected() {
        let err = SessionBuilder::new(node())
            .with_local_fseid(fseid())
            .add_rules([pdr(1), far(1, IeMethod::Create), far(1, IeMethod::Create)])
            .build_establishment()
            .unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidSessionRequest("FAR 1 appears more than once".to_string())
        );
    }

    #[test]
    fn test_modification_orders_by_method() {
        let request = SessionBuilder::new(node())
            .with_local_fseid(fseid())
            .with_remote_seid(0x8000)
            .add_rule(far(2, IeMethod::Update))
            .add_rule(qer(3))
            .add_rule(far(1, IeMethod::Delete))
            .build_modification()
            .unwrap();

        let types: Vec<u16> = request.ies.iter().map(|ie| ie.ie_type).collect();
        assert_eq!(types, vec![IE_REMOVE_FAR, IE_CREATE_QER, IE_UPDATE_FAR]);
        assert_eq!(request.seid, 0x8000);
    }

    #[test]
    fn test_modification_needs_remote_seid() {
        let result = SessionBuilder::new(node())
            .with_local_fseid(fseid())
            .build_modification();
        assert!(result.is_err());
    }

    #[test]
    fn test_deletion() {
        let builder = SessionBuilder::new(node())
            .with_local_fseid(fseid())
            .with_remote_seid(9);
        let request = builder.build_deletion().unwrap();
        assert!(request.ies.is_empty());
        assert_eq!(request.seid, 9);
        assert_eq!(request.message_type(), MessageType::SessionDeletionRequest);

        assert!(builder.add_rule(qer(1)).build_deletion().is_err());
    }
}
