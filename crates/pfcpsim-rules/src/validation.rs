use pfcpsim_core::ApplyAction;
use pfcpsim_shared::INTERFACE_CP_FUNCTION;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{RuleError, PROGRAMMER_ERROR_TARGET};
use crate::rule::RuleKind;

/// A single constraint on FAR Apply Action flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConstraint {
    /// Both flags may not be set together
    MutuallyExclusive {
        first: ApplyAction,
        second: ApplyAction,
    },
    /// `flag` is only meaningful together with `requires`
    Requires {
        flag: ApplyAction,
        requires: ApplyAction,
    },
}

impl ActionConstraint {
    pub fn check(&self, action: ApplyAction) -> Result<(), String> {
        match *self {
            Self::MutuallyExclusive { first, second } => {
                if action.contains(first) && action.contains(second) {
                    return Err(format!("{first} and {second} are mutually exclusive"));
                }
            }
            Self::Requires { flag, requires } => {
                if action.contains(flag) && !action.contains(requires) {
                    return Err(format!("{flag} requires {requires}"));
                }
            }
        }
        Ok(())
    }
}

/// Extensible set of Apply Action constraints.
///
/// The default set only rejects DROP together with FORW. [`ActionRuleSet::strict`]
/// adds the combinations TS 29.244 describes as meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRuleSet {
    constraints: Vec<ActionConstraint>,
}

impl Default for ActionRuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionRuleSet {
    /// No constraints at all
    pub fn empty() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty().with(ActionConstraint::MutuallyExclusive {
            first: ApplyAction::DROP,
            second: ApplyAction::FORWARD,
        })
    }

    pub fn strict() -> Self {
        Self::standard()
            .with(ActionConstraint::MutuallyExclusive {
                first: ApplyAction::DROP,
                second: ApplyAction::BUFFER,
            })
            .with(ActionConstraint::MutuallyExclusive {
                first: ApplyAction::DROP,
                second: ApplyAction::DUPLICATE,
            })
            .with(ActionConstraint::Requires {
                flag: ApplyAction::NOTIFY_CP,
                requires: ApplyAction::BUFFER,
            })
    }

    pub fn with(mut self, constraint: ActionConstraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn constraints(&self) -> &[ActionConstraint] {
        &self.constraints
    }

    /// First violated constraint, if any
    pub fn check(&self, action: ApplyAction) -> Result<(), String> {
        self.constraints.iter().try_for_each(|c| c.check(action))
    }
}

/// Build the error for a rejected rule and log it on the dedicated target
pub(crate) fn reject(rule: RuleKind, id: u32, reason: impl Into<String>) -> RuleError {
    let reason = reason.into();
    error!(
        target: PROGRAMMER_ERROR_TARGET,
        rule = %rule,
        id,
        reason = %reason,
        "Rejected rule configuration"
    );
    RuleError::InvalidRuleConfig { rule, id, reason }
}

pub(crate) fn check_id(rule: RuleKind, id: u32) -> Result<(), RuleError> {
    if id == 0 {
        return Err(reject(rule, id, format!("tried building {rule} without setting an ID")));
    }
    Ok(())
}

pub(crate) fn check_interface(
    rule: RuleKind,
    id: u32,
    field: &str,
    value: Option<u8>,
) -> Result<(), RuleError> {
    match value {
        None => Err(reject(rule, id, format!("{field} is not set"))),
        Some(v) if v > INTERFACE_CP_FUNCTION => {
            Err(reject(rule, id, format!("{field} value {v} is out of range")))
        }
        Some(_) => Ok(()),
    }
}
