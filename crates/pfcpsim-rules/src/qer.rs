use pfcpsim_core::{Bitrate, GateStatus, PfcpsimError, Result};
use pfcpsim_shared::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RuleError;
use crate::rule::{envelope_of, required_u32, BuiltRule, IeMethod, RuleDefinition, RuleKind};
use crate::validation::{check_id, reject};

const MAX_QFI: u8 = 0x3F;
const MAX_GATE_STATUS: u8 = 0x0F;

/// QER field to overwrite with a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QerFuzz {
    #[default]
    NoFuzz,
    WithQfi,
    WithGateStatus,
    WithMbr,
}

/// QoS Enforcement Rule fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QerConfig {
    pub id: u32,
    /// Raw Gate Status octet
    pub gate_status: Option<u8>,
    pub mbr: Option<Bitrate>,
    pub gbr: Option<Bitrate>,
    pub qfi: Option<u8>,
}

impl QerConfig {
    pub fn gate(&self) -> Option<GateStatus> {
        self.gate_status.map(GateStatus::from_bits)
    }

    pub fn to_ie(&self, method: IeMethod) -> Ie {
        let qer_id = Ie::from_u32(IE_QER_ID, self.id);
        if method == IeMethod::Delete {
            return Ie::grouped(IE_REMOVE_QER, vec![qer_id]);
        }

        let mut children = vec![qer_id];
        if let Some(gate) = self.gate_status {
            children.push(Ie::from_u8(IE_GATE_STATUS, gate));
        }
        if let Some(mbr) = self.mbr {
            children.push(mbr.to_ie(IE_MBR));
        }
        if let Some(gbr) = self.gbr {
            children.push(gbr.to_ie(IE_GBR));
        }
        if let Some(qfi) = self.qfi {
            children.push(Ie::from_u8(IE_QFI, qfi));
        }

        Ie::grouped(RuleKind::Qer.envelope(method), children)
    }

    pub fn from_ie(ie: &Ie) -> Result<(IeMethod, Self)> {
        let method = envelope_of(ie, RuleKind::Qer)?;
        let mut config = Self {
            id: required_u32(ie, IE_QER_ID)?,
            ..Self::default()
        };
        if method == IeMethod::Delete {
            return Ok((method, config));
        }

        config.gate_status = ie.find(IE_GATE_STATUS).and_then(Ie::as_u8);
        config.mbr = ie.find(IE_MBR).map(Bitrate::from_ie).transpose()?;
        config.gbr = ie.find(IE_GBR).map(Bitrate::from_ie).transpose()?;
        config.qfi = match ie.find(IE_QFI) {
            Some(qfi) => Some(qfi.as_u8().ok_or_else(|| PfcpsimError::InvalidIeValue {
                ie_type: IE_QFI,
                reason: "empty QFI".to_string(),
            })?),
            None => None,
        };

        Ok((method, config))
    }
}

/// Builder for Create/Update/Remove QER IEs
#[derive(Debug, Clone)]
pub struct QerBuilder {
    config: QerConfig,
    fuzz: QerFuzz,
    validate: bool,
}

impl Default for QerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QerBuilder {
    pub fn new() -> Self {
        Self {
            config: QerConfig::default(),
            fuzz: QerFuzz::NoFuzz,
            validate: true,
        }
    }

    pub fn from_config(config: QerConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.config.id = id;
        self
    }

    pub fn with_gate_status(mut self, gate: GateStatus) -> Self {
        self.config.gate_status = Some(gate.bits());
        self
    }

    /// Uplink and downlink MBR in kbps
    pub fn with_mbr(mut self, uplink: u64, downlink: u64) -> Self {
        self.config.mbr = Some(Bitrate::new(uplink, downlink));
        self
    }

    pub fn with_gbr(mut self, uplink: u64, downlink: u64) -> Self {
        self.config.gbr = Some(Bitrate::new(uplink, downlink));
        self
    }

    pub fn with_qfi(mut self, qfi: u8) -> Self {
        self.config.qfi = Some(qfi);
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Overwrite one field with a raw value. `WithMbr` sets both directions.
    pub fn fuzz(mut self, field: QerFuzz, raw: u64) -> Self {
        match field {
            QerFuzz::NoFuzz => return self,
            QerFuzz::WithQfi => self.config.qfi = Some(raw as u8),
            QerFuzz::WithGateStatus => self.config.gate_status = Some(raw as u8),
            QerFuzz::WithMbr => self.config.mbr = Some(Bitrate::new(raw, raw)),
        }
        info!(rule = "QER", id = self.config.id, field = ?field, raw, "Injecting fuzzed field");
        self.fuzz = field;
        self
    }

    pub fn config(&self) -> &QerConfig {
        &self.config
    }

    pub fn validate(&self, method: IeMethod) -> std::result::Result<(), RuleError> {
        let id = self.config.id;
        check_id(RuleKind::Qer, id)?;
        if method == IeMethod::Delete {
            return Ok(());
        }

        let c = &self.config;
        if c.gate_status.is_none() && c.mbr.is_none() && c.gbr.is_none() && c.qfi.is_none() {
            return Err(reject(RuleKind::Qer, id, "QER has no enforcement parameters"));
        }

        if self.fuzz != QerFuzz::WithQfi {
            if let Some(qfi) = c.qfi {
                if qfi > MAX_QFI {
                    return Err(reject(RuleKind::Qer, id, format!("QFI {qfi} exceeds 6 bits")));
                }
            }
        }
        if self.fuzz != QerFuzz::WithGateStatus {
            if let Some(gate) = c.gate_status {
                if gate > MAX_GATE_STATUS {
                    return Err(reject(
                        RuleKind::Qer,
                        id,
                        format!("gate status {gate:#04x} sets spare bits"),
                    ));
                }
            }
        }
        if self.fuzz != QerFuzz::WithMbr {
            if let Some(mbr) = c.mbr {
                if mbr.uplink > Bitrate::MAX || mbr.downlink > Bitrate::MAX {
                    return Err(reject(RuleKind::Qer, id, "MBR does not fit in 40 bits"));
                }
            }
        }
        if let Some(gbr) = c.gbr {
            if gbr.uplink > Bitrate::MAX || gbr.downlink > Bitrate::MAX {
                return Err(reject(RuleKind::Qer, id, "GBR does not fit in 40 bits"));
            }
        }

        Ok(())
    }

    pub fn build(&self, method: IeMethod) -> std::result::Result<BuiltRule, RuleError> {
        if self.validate {
            self.validate(method)?;
        }

        Ok(BuiltRule {
            method,
            definition: RuleDefinition::Qer(self.config.clone()),
            ie: self.config.to_ie(method),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_core::Gate;

    #[test]
    fn test_open_gate_with_qfi() {
        let rule = QerBuilder::new()
            .with_id(1)
            .with_gate_status(GateStatus::OPEN)
            .with_qfi(9)
            .build(IeMethod::Create)
            .unwrap();

        assert_eq!(rule.ie.ie_type, IE_CREATE_QER);
        assert_eq!(rule.ie.find(IE_GATE_STATUS).and_then(Ie::as_u8), Some(0));
        assert_eq!(rule.ie.find(IE_QFI).and_then(Ie::as_u8), Some(9));
    }

    #[test]
    fn test_closed_uplink_gate() {
        let gate = GateStatus {
            uplink: Gate::Closed,
            downlink: Gate::Open,
        };
        let rule = QerBuilder::new()
            .with_id(2)
            .with_gate_status(gate)
            .build(IeMethod::Update)
            .unwrap();
        assert_eq!(rule.ie.ie_type, IE_UPDATE_QER);
        assert_eq!(rule.ie.find(IE_GATE_STATUS).and_then(Ie::as_u8), Some(0x04));
        assert_eq!(
            QerConfig::from_ie(&rule.ie).unwrap().1.gate(),
            Some(gate)
        );
    }

    #[test]
    fn test_bitrates() {
        let rule = QerBuilder::new()
            .with_id(3)
            .with_mbr(50_000, 100_000)
            .with_gbr(10_000, 20_000)
            .build(IeMethod::Create)
            .unwrap();
        let (_, config) = QerConfig::from_ie(&rule.ie).unwrap();
        assert_eq!(config.mbr, Some(Bitrate::new(50_000, 100_000)));
        assert_eq!(config.gbr, Some(Bitrate::new(10_000, 20_000)));
    }

    #[test]
    fn test_empty_qer_rejected() {
        let err = QerBuilder::new().with_id(1).build(IeMethod::Create).unwrap_err();
        assert!(matches!(
            err,
            RuleError::InvalidRuleConfig { rule: RuleKind::Qer, id: 1, .. }
        ));
        assert!(QerBuilder::new().build(IeMethod::Delete).is_err());
    }

    #[test]
    fn test_qfi_range_and_fuzz() {
        let builder = QerBuilder::new().with_id(1).with_qfi(64);
        assert!(builder.build(IeMethod::Create).is_err());

        let fuzzed = QerBuilder::new()
            .with_id(1)
            .fuzz(QerFuzz::WithQfi, 0xFF)
            .build(IeMethod::Create)
            .unwrap();
        assert_eq!(fuzzed.ie.find(IE_QFI).and_then(Ie::as_u8), Some(0xFF));
    }

    #[test]
    fn test_fuzzed_gate_keeps_qfi_check() {
        let result = QerBuilder::new()
            .with_id(1)
            .with_qfi(70)
            .fuzz(QerFuzz::WithGateStatus, 0xFF)
            .build(IeMethod::Create);
        assert!(result.is_err());
    }

    #[test]
    fn test_remove_qer() {
        let rule = QerBuilder::new().with_id(7).build(IeMethod::Delete).unwrap();
        assert_eq!(rule.ie.ie_type, IE_REMOVE_QER);
        assert_eq!(QerConfig::from_ie(&rule.ie).unwrap().1.id, 7);
    }
}
