use std::net::Ipv4Addr;

use pfcpsim_core::{ApplyAction, Interface, OuterHeaderCreation, Result};
use pfcpsim_shared::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RuleError;
use crate::rule::{envelope_of, required_u32, BuiltRule, IeMethod, RuleDefinition, RuleKind};
use crate::validation::{check_id, check_interface, reject, ActionRuleSet};

/// FAR field to overwrite with a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarFuzz {
    #[default]
    NoFuzz,
    WithAction,
    WithTeid,
    WithDstInterface,
}

/// Forwarding Action Rule fields, stored at wire level so fuzzed values survive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarConfig {
    pub id: u32,
    pub apply_action: Option<u8>,
    pub dst_interface: Option<u8>,
    pub teid: u32,
    pub downlink_ip: Option<Ipv4Addr>,
    /// Outer header creation with TEID 0 and address 0.0.0.0
    pub zero_based_outer_header: bool,
}

impl FarConfig {
    pub fn action(&self) -> Option<ApplyAction> {
        self.apply_action.map(ApplyAction)
    }

    /// Tunnel endpoint carried in the forwarding parameters
    pub fn outer_header_creation(&self) -> Option<OuterHeaderCreation> {
        if self.zero_based_outer_header {
            Some(OuterHeaderCreation::zero_based())
        } else {
            self.downlink_ip
                .map(|ip| OuterHeaderCreation::gtpu(self.teid, ip))
        }
    }

    pub fn to_ie(&self, method: IeMethod) -> Ie {
        let far_id = Ie::from_u32(IE_FAR_ID, self.id);
        if method == IeMethod::Delete {
            return Ie::grouped(IE_REMOVE_FAR, vec![far_id]);
        }

        let mut params = Vec::new();
        if let Some(iface) = self.dst_interface {
            params.push(Ie::from_u8(IE_DESTINATION_INTERFACE, iface));
        }
        if let Some(ohc) = self.outer_header_creation() {
            params.push(ohc.to_ie());
        }
        let params_type = match method {
            IeMethod::Update => IE_UPDATE_FORWARDING_PARAMETERS,
            _ => IE_FORWARDING_PARAMETERS,
        };

        let mut children = vec![far_id];
        if let Some(action) = self.apply_action {
            children.push(Ie::from_u8(IE_APPLY_ACTION, action));
        }
        children.push(Ie::grouped(params_type, params));

        Ie::grouped(RuleKind::Far.envelope(method), children)
    }

    pub fn from_ie(ie: &Ie) -> Result<(IeMethod, Self)> {
        let method = envelope_of(ie, RuleKind::Far)?;
        let mut config = Self {
            id: required_u32(ie, IE_FAR_ID)?,
            ..Self::default()
        };
        if method == IeMethod::Delete {
            return Ok((method, config));
        }

        config.apply_action = ie.find(IE_APPLY_ACTION).and_then(Ie::as_u8);

        let params = ie
            .find(IE_FORWARDING_PARAMETERS)
            .or_else(|| ie.find(IE_UPDATE_FORWARDING_PARAMETERS));
        if let Some(params) = params {
            config.dst_interface = params.find(IE_DESTINATION_INTERFACE).and_then(Ie::as_u8);
            if let Some(ohc) = params.find(IE_OUTER_HEADER_CREATION) {
                let ohc = OuterHeaderCreation::from_ie(ohc)?;
                if ohc.teid == 0 && ohc.ipv4.is_unspecified() {
                    config.zero_based_outer_header = true;
                } else {
                    config.teid = ohc.teid;
                    config.downlink_ip = Some(ohc.ipv4);
                }
            }
        }

        Ok((method, config))
    }
}

/// Builder for Create/Update/Remove FAR IEs
#[derive(Debug, Clone)]
pub struct FarBuilder {
    config: FarConfig,
    fuzz: FarFuzz,
    validate: bool,
    action_rules: ActionRuleSet,
}

impl Default for FarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FarBuilder {
    pub fn new() -> Self {
        Self {
            config: FarConfig::default(),
            fuzz: FarFuzz::NoFuzz,
            validate: true,
            action_rules: ActionRuleSet::default(),
        }
    }

    pub fn from_config(config: FarConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.config.id = id;
        self
    }

    pub fn with_action(mut self, action: ApplyAction) -> Self {
        self.config.apply_action = Some(action.bits());
        self
    }

    pub fn with_dst_interface(mut self, iface: Interface) -> Self {
        self.config.dst_interface = Some(iface.into());
        self
    }

    pub fn with_teid(mut self, teid: u32) -> Self {
        self.config.teid = teid;
        self
    }

    pub fn with_downlink_ip(mut self, ip: Ipv4Addr) -> Self {
        self.config.downlink_ip = Some(ip);
        self
    }

    pub fn with_zero_based_outer_header_creation(mut self) -> Self {
        self.config.zero_based_outer_header = true;
        self
    }

    pub fn with_action_rules(mut self, rules: ActionRuleSet) -> Self {
        self.action_rules = rules;
        self
    }

    /// Skip every check in [`FarBuilder::build`]
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Overwrite one field with a raw value, bypassing the typed setters.
    /// Validation keeps running for every other field.
    pub fn fuzz(mut self, field: FarFuzz, raw: u32) -> Self {
        match field {
            FarFuzz::NoFuzz => return self,
            FarFuzz::WithAction => self.config.apply_action = Some(raw as u8),
            FarFuzz::WithTeid => self.config.teid = raw,
            FarFuzz::WithDstInterface => self.config.dst_interface = Some(raw as u8),
        }
        info!(rule = "FAR", id = self.config.id, field = ?field, raw, "Injecting fuzzed field");
        self.fuzz = field;
        self
    }

    pub fn config(&self) -> &FarConfig {
        &self.config
    }

    pub fn validate(&self, method: IeMethod) -> std::result::Result<(), RuleError> {
        let id = self.config.id;
        check_id(RuleKind::Far, id)?;
        if method == IeMethod::Delete {
            return Ok(());
        }

        if self.fuzz != FarFuzz::WithDstInterface {
            check_interface(
                RuleKind::Far,
                id,
                "destination interface",
                self.config.dst_interface,
            )?;
        }

        if self.fuzz != FarFuzz::WithAction {
            let action = self
                .config
                .action()
                .ok_or_else(|| reject(RuleKind::Far, id, "tried building FAR without setting an action"))?;
            self.action_rules
                .check(action)
                .map_err(|reason| reject(RuleKind::Far, id, reason))?;
        }

        Ok(())
    }

    pub fn build(&self, method: IeMethod) -> std::result::Result<BuiltRule, RuleError> {
        if self.validate {
            self.validate(method)?;
        }

        Ok(BuiltRule {
            method,
            definition: RuleDefinition::Far(self.config.clone()),
            ie: self.config.to_ie(method),
        })
    }
}
