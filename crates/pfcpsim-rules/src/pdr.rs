use std::net::Ipv4Addr;

use pfcpsim_core::{FTeid, Interface, PfcpsimError, Result, SdfFilter, UeIpAddress};
use pfcpsim_shared::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RuleError;
use crate::rule::{envelope_of, BuiltRule, IeMethod, RuleDefinition, RuleKind};
use crate::validation::{check_id, check_interface, reject};

/// PDR field to overwrite with a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdrFuzz {
    #[default]
    NoFuzz,
    WithPrecedence,
    WithSourceInterface,
    WithTeid,
    WithFarId,
}

/// Packet Detection Information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pdi {
    pub source_interface: Option<u8>,
    pub local_fteid: Option<FTeid>,
    pub ue_address: Option<Ipv4Addr>,
    pub sdf_filter: Option<String>,
    pub network_instance: Option<String>,
}

impl Pdi {
    pub fn new(source_interface: Interface) -> Self {
        Self {
            source_interface: Some(source_interface.into()),
            ..Self::default()
        }
    }

    pub fn to_ie(&self) -> Ie {
        let mut children = Vec::new();
        if let Some(iface) = self.source_interface {
            children.push(Ie::from_u8(IE_SOURCE_INTERFACE, iface));
        }
        if let Some(fteid) = &self.local_fteid {
            children.push(fteid.to_ie());
        }
        if let Some(instance) = &self.network_instance {
            children.push(Ie::raw(IE_NETWORK_INSTANCE, instance.clone().into_bytes()));
        }
        if let Some(ue) = self.ue_address {
            // Downlink PDRs match the UE address as destination
            let ue = UeIpAddress {
                ipv4: ue,
                destination: self.source_interface == Some(INTERFACE_CORE),
            };
            children.push(ue.to_ie());
        }
        if let Some(filter) = &self.sdf_filter {
            let sdf = SdfFilter {
                flow_description: filter.clone(),
            };
            children.push(sdf.to_ie());
        }
        Ie::grouped(IE_PDI, children)
    }

    pub fn from_ie(ie: &Ie) -> Result<Self> {
        if ie.ie_type != IE_PDI {
            return Err(PfcpsimError::UnexpectedIe {
                expected: IE_PDI,
                found: ie.ie_type,
            });
        }
        Ok(Self {
            source_interface: ie.find(IE_SOURCE_INTERFACE).and_then(Ie::as_u8),
            local_fteid: ie.find(IE_F_TEID).map(FTeid::from_ie).transpose()?,
            ue_address: ie
                .find(IE_UE_IP_ADDRESS)
                .map(UeIpAddress::from_ie)
                .transpose()?
                .map(|ue| ue.ipv4),
            sdf_filter: ie
                .find(IE_SDF_FILTER)
                .map(SdfFilter::from_ie)
                .transpose()?
                .map(|sdf| sdf.flow_description),
            network_instance: ie
                .find(IE_NETWORK_INSTANCE)
                .and_then(Ie::data)
                .map(|d| String::from_utf8_lossy(d).into_owned()),
        })
    }
}

/// Packet Detection Rule fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdrConfig {
    /// Carried in a 2 byte IE on the wire
    pub id: u32,
    pub precedence: Option<u32>,
    pub pdi: Option<Pdi>,
    pub far_id: Option<u32>,
    pub qer_ids: Vec<u32>,
    pub outer_header_removal: Option<u8>,
}

impl PdrConfig {
    pub fn to_ie(&self, method: IeMethod) -> Ie {
        let pdr_id = Ie::from_u16(IE_PDR_ID, self.id as u16);
        if method == IeMethod::Delete {
            return Ie::grouped(IE_REMOVE_PDR, vec![pdr_id]);
        }

        let mut children = vec![pdr_id];
        if let Some(precedence) = self.precedence {
            children.push(Ie::from_u32(IE_PRECEDENCE, precedence));
        }
        if let Some(pdi) = &self.pdi {
            children.push(pdi.to_ie());
        }
        if let Some(removal) = self.outer_header_removal {
            children.push(Ie::from_u8(IE_OUTER_HEADER_REMOVAL, removal));
        }
        if let Some(far_id) = self.far_id {
            children.push(Ie::from_u32(IE_FAR_ID, far_id));
        }
        for qer_id in &self.qer_ids {
            children.push(Ie::from_u32(IE_QER_ID, *qer_id));
        }

        Ie::grouped(RuleKind::Pdr.envelope(method), children)
    }

    pub fn from_ie(ie: &Ie) -> Result<(IeMethod, Self)> {
        let method = envelope_of(ie, RuleKind::Pdr)?;
        let id = ie
            .find(IE_PDR_ID)
            .ok_or(PfcpsimError::MissingIe(IE_PDR_ID))?
            .as_u16()
            .ok_or_else(|| PfcpsimError::InvalidIeValue {
                ie_type: IE_PDR_ID,
                reason: "expected 2 bytes".to_string(),
            })?;

        let mut config = Self {
            id: id as u32,
            ..Self::default()
        };
        if method == IeMethod::Delete {
            return Ok((method, config));
        }

        config.precedence = ie.find(IE_PRECEDENCE).and_then(Ie::as_u32);
        config.pdi = ie.find(IE_PDI).map(Pdi::from_ie).transpose()?;
        config.outer_header_removal = ie.find(IE_OUTER_HEADER_REMOVAL).and_then(Ie::as_u8);
        config.far_id = ie.find(IE_FAR_ID).and_then(Ie::as_u32);
        config.qer_ids = ie.find_all(IE_QER_ID).filter_map(Ie::as_u32).collect();

        Ok((method, config))
    }
}

/// Builder for Create/Update/Remove PDR IEs
#[derive(Debug, Clone)]
pub struct PdrBuilder {
    config: PdrConfig,
    fuzz: PdrFuzz,
    validate: bool,
}

impl Default for PdrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdrBuilder {
    pub fn new() -> Self {
        Self {
            config: PdrConfig::default(),
            fuzz: PdrFuzz::NoFuzz,
            validate: true,
        }
    }

    pub fn from_config(config: PdrConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    /// Uplink PDR matching GTP-U traffic on the N3 tunnel and stripping the outer header
    pub fn uplink(id: u32, precedence: u32, teid: u32, n3_address: Ipv4Addr) -> Self {
        Self::new()
            .with_id(id)
            .with_precedence(precedence)
            .with_source_interface(Interface::Access)
            .with_local_fteid(FTeid::new(teid, n3_address))
            .with_gtpu_outer_header_removal()
    }

    /// Downlink PDR matching traffic towards the UE address
    pub fn downlink(id: u32, precedence: u32, ue_address: Ipv4Addr) -> Self {
        Self::new()
            .with_id(id)
            .with_precedence(precedence)
            .with_source_interface(Interface::Core)
            .with_ue_address(ue_address)
    }

    fn pdi_mut(&mut self) -> &mut Pdi {
        self.config.pdi.get_or_insert_with(Pdi::default)
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.config.id = id;
        self
    }

    pub fn with_precedence(mut self, precedence: u32) -> Self {
        self.config.precedence = Some(precedence);
        self
    }

    pub fn with_pdi(mut self, pdi: Pdi) -> Self {
        self.config.pdi = Some(pdi);
        self
    }

    pub fn with_source_interface(mut self, iface: Interface) -> Self {
        self.pdi_mut().source_interface = Some(iface.into());
        self
    }

    pub fn with_local_fteid(mut self, fteid: FTeid) -> Self {
        self.pdi_mut().local_fteid = Some(fteid);
        self
    }

    pub fn with_ue_address(mut self, ue_address: Ipv4Addr) -> Self {
        self.pdi_mut().ue_address = Some(ue_address);
        self
    }

    pub fn with_sdf_filter(mut self, flow_description: impl Into<String>) -> Self {
        self.pdi_mut().sdf_filter = Some(flow_description.into());
        self
    }

    pub fn with_network_instance(mut self, instance: impl Into<String>) -> Self {
        self.pdi_mut().network_instance = Some(instance.into());
        self
    }

    pub fn with_far_id(mut self, far_id: u32) -> Self {
        self.config.far_id = Some(far_id);
        self
    }

    pub fn add_qer_id(mut self, qer_id: u32) -> Self {
        if !self.config.qer_ids.contains(&qer_id) {
            self.config.qer_ids.push(qer_id);
        }
        self
    }

    pub fn with_gtpu_outer_header_removal(mut self) -> Self {
        self.config.outer_header_removal = Some(OUTER_HEADER_REMOVAL_GTPU_UDP_IPV4);
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Overwrite one field with a raw value, bypassing the typed setters.
    pub fn fuzz(mut self, field: PdrFuzz, raw: u32) -> Self {
        match field {
            PdrFuzz::NoFuzz => return self,
            PdrFuzz::WithPrecedence => self.config.precedence = Some(raw),
            PdrFuzz::WithSourceInterface => self.pdi_mut().source_interface = Some(raw as u8),
            PdrFuzz::WithTeid => {
                let pdi = self.pdi_mut();
                match pdi.local_fteid.as_mut() {
                    Some(fteid) => fteid.teid = raw,
                    None => {
                        pdi.local_fteid = Some(FTeid {
                            teid: raw,
                            ipv4: None,
                            ipv6: None,
                            choose: false,
                            choose_id: None,
                        })
                    }
                }
            }
            PdrFuzz::WithFarId => self.config.far_id = Some(raw),
        }
        info!(rule = "PDR", id = self.config.id, field = ?field, raw, "Injecting fuzzed field");
        self.fuzz = field;
        self
    }

    pub fn config(&self) -> &PdrConfig {
        &self.config
    }

    pub fn validate(&self, method: IeMethod) -> std::result::Result<(), RuleError> {
        let id = self.config.id;
        check_id(RuleKind::Pdr, id)?;
        if id > u16::MAX as u32 {
            return Err(reject(RuleKind::Pdr, id, "PDR ID does not fit in 16 bits"));
        }
        if method == IeMethod::Delete {
            return Ok(());
        }

        if self.fuzz != PdrFuzz::WithPrecedence && self.config.precedence.is_none() {
            return Err(reject(RuleKind::Pdr, id, "tried building PDR without setting a precedence"));
        }

        let pdi = self
            .config
            .pdi
            .as_ref()
            .ok_or_else(|| reject(RuleKind::Pdr, id, "tried building PDR without setting a PDI"))?;
        if self.fuzz != PdrFuzz::WithSourceInterface {
            check_interface(RuleKind::Pdr, id, "source interface", pdi.source_interface)?;
        }

        Ok(())
    }

    pub fn build(&self, method: IeMethod) -> std::result::Result<BuiltRule, RuleError> {
        if self.validate {
            self.validate(method)?;
        }

        // Unvalidated IDs above 16 bits are truncated on the wire; record what the peer sees
        let mut config = self.config.clone();
        config.id = u32::from(config.id as u16);
        if config.id != self.config.id {
            info!(rule = "PDR", id = self.config.id, wire_id = config.id, "Truncating PDR ID");
        }

        Ok(BuiltRule {
            method,
            ie: config.to_ie(method),
            definition: RuleDefinition::Pdr(config),
        })
    }
}
