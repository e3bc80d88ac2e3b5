use pfcpsim_core::{PfcpsimError, Result};
use pfcpsim_shared::*;
use serde::{Deserialize, Serialize};

use crate::far::FarConfig;
use crate::pdr::PdrConfig;
use crate::qer::QerConfig;

/// Which envelope a builder terminal emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IeMethod {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Pdr,
    Far,
    Qer,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdr => write!(f, "PDR"),
            Self::Far => write!(f, "FAR"),
            Self::Qer => write!(f, "QER"),
        }
    }
}

impl RuleKind {
    /// IE type of the envelope for this kind and method
    pub fn envelope(&self, method: IeMethod) -> u16 {
        match (self, method) {
            (Self::Pdr, IeMethod::Create) => IE_CREATE_PDR,
            (Self::Pdr, IeMethod::Update) => IE_UPDATE_PDR,
            (Self::Pdr, IeMethod::Delete) => IE_REMOVE_PDR,
            (Self::Far, IeMethod::Create) => IE_CREATE_FAR,
            (Self::Far, IeMethod::Update) => IE_UPDATE_FAR,
            (Self::Far, IeMethod::Delete) => IE_REMOVE_FAR,
            (Self::Qer, IeMethod::Create) => IE_CREATE_QER,
            (Self::Qer, IeMethod::Update) => IE_UPDATE_QER,
            (Self::Qer, IeMethod::Delete) => IE_REMOVE_QER,
        }
    }

    /// Reverse of [`RuleKind::envelope`]
    pub fn from_envelope(ie_type: u16) -> Option<(RuleKind, IeMethod)> {
        let found = match ie_type {
            IE_CREATE_PDR => (Self::Pdr, IeMethod::Create),
            IE_UPDATE_PDR => (Self::Pdr, IeMethod::Update),
            IE_REMOVE_PDR => (Self::Pdr, IeMethod::Delete),
            IE_CREATE_FAR => (Self::Far, IeMethod::Create),
            IE_UPDATE_FAR => (Self::Far, IeMethod::Update),
            IE_REMOVE_FAR => (Self::Far, IeMethod::Delete),
            IE_CREATE_QER => (Self::Qer, IeMethod::Create),
            IE_UPDATE_QER => (Self::Qer, IeMethod::Update),
            IE_REMOVE_QER => (Self::Qer, IeMethod::Delete),
            _ => return None,
        };
        Some(found)
    }
}

/// Config snapshot a rule was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDefinition {
    Pdr(PdrConfig),
    Far(FarConfig),
    Qer(QerConfig),
}

impl RuleDefinition {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Pdr(_) => RuleKind::Pdr,
            Self::Far(_) => RuleKind::Far,
            Self::Qer(_) => RuleKind::Qer,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::Pdr(pdr) => pdr.id,
            Self::Far(far) => far.id,
            Self::Qer(qer) => qer.id,
        }
    }
}

/// Output of a builder terminal: the encoded IE plus what produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRule {
    pub method: IeMethod,
    pub definition: RuleDefinition,
    pub ie: Ie,
}

impl BuiltRule {
    pub fn kind(&self) -> RuleKind {
        self.definition.kind()
    }

    pub fn id(&self) -> u32 {
        self.definition.id()
    }

    /// Decode a rule envelope back into its config
    pub fn decode(ie: &Ie) -> Result<Self> {
        let (kind, method) =
            RuleKind::from_envelope(ie.ie_type).ok_or_else(|| PfcpsimError::InvalidIeValue {
                ie_type: ie.ie_type,
                reason: "not a rule envelope".to_string(),
            })?;

        let definition = match kind {
            RuleKind::Pdr => RuleDefinition::Pdr(PdrConfig::from_ie(ie)?.1),
            RuleKind::Far => RuleDefinition::Far(FarConfig::from_ie(ie)?.1),
            RuleKind::Qer => RuleDefinition::Qer(QerConfig::from_ie(ie)?.1),
        };

        Ok(Self {
            method,
            definition,
            ie: ie.clone(),
        })
    }
}

/// Read a mandatory u32 child of a grouped IE
pub(crate) fn required_u32(group: &Ie, ie_type: u16) -> Result<u32> {
    group
        .find(ie_type)
        .ok_or(PfcpsimError::MissingIe(ie_type))?
        .as_u32()
        .ok_or_else(|| PfcpsimError::InvalidIeValue {
            ie_type,
            reason: "expected 4 bytes".to_string(),
        })
}

pub(crate) fn envelope_of(ie: &Ie, kind: RuleKind) -> Result<IeMethod> {
    match RuleKind::from_envelope(ie.ie_type) {
        Some((found, method)) if found == kind => Ok(method),
        _ => Err(PfcpsimError::UnexpectedIe {
            expected: kind.envelope(IeMethod::Create),
            found: ie.ie_type,
        }),
    }
}
