use thiserror::Error;

use crate::rule::RuleKind;

/// Log target for rejected rule and session configurations.
/// These are harness bugs, kept apart from network failures in the logs.
pub const PROGRAMMER_ERROR_TARGET: &str = "pfcpsim::programmer_error";

/// Errors raised while assembling rules and session requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid {rule} configuration (id {id}): {reason}")]
    InvalidRuleConfig {
        rule: RuleKind,
        id: u32,
        reason: String,
    },

    #[error("Invalid session request: {0}")]
    InvalidSessionRequest(String),
}

impl RuleError {
    /// Every rule error is a configuration mistake on the caller's side
    pub fn is_programmer_error(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuleError::InvalidRuleConfig {
            rule: RuleKind::Far,
            id: 3,
            reason: "destination interface is not set".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid FAR configuration (id 3): destination interface is not set"
        );
        assert!(err.is_programmer_error());
    }
}
