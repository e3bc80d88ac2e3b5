use pfcpsim_client_core::SequenceExhausted;
use pfcpsim_core::{Cause, ErrorSeverity, MessageType, PfcpsimError};
use pfcpsim_rules::RuleError;
use thiserror::Error;

/// Errors surfaced by client operations
#[derive(Error, Debug)]
pub enum ClientError {
    // ========================================
    // Association
    // ========================================
    #[error("Not associated with the peer")]
    NotAssociated,

    #[error("Association setup failed: {reason}")]
    AssociationFailed { reason: String },

    #[error("Association lost")]
    AssociationLost,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // ========================================
    // Sessions
    // ========================================
    #[error("Request rejected by peer: {cause}")]
    SessionRejected { cause: Cause },

    #[error("Request {sequence} timed out after {attempts} attempts")]
    RequestTimedOut { sequence: u32, attempts: u32 },

    #[error("Session not found: SEID {0:#x}")]
    SessionNotFound(u64),

    #[error("Session busy: SEID {0:#x}")]
    SessionBusy(u64),

    #[error("Sequence numbers exhausted")]
    SequenceExhausted,

    #[error(transparent)]
    InvalidRuleConfig(#[from] RuleError),

    // ========================================
    // Wire
    // ========================================
    #[error("Protocol error: {0}")]
    Protocol(PfcpsimError),

    #[error("Socket error: {0}")]
    Io(std::io::Error),

    #[error("Unexpected response to {request}: {reason}")]
    UnexpectedResponse {
        request: MessageType,
        reason: String,
    },

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Client is shutting down")]
    ShuttingDown,
}

impl From<PfcpsimError> for ClientError {
    fn from(err: PfcpsimError) -> Self {
        match err {
            PfcpsimError::Io(e) => Self::Io(e),
            other => Self::Protocol(other),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SequenceExhausted> for ClientError {
    fn from(_: SequenceExhausted) -> Self {
        Self::SequenceExhausted
    }
}

impl ClientError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::SessionRejected { .. } | Self::SessionBusy(_) | Self::SessionNotFound(_) => {
                ErrorSeverity::Warning
            }
            Self::RequestTimedOut { .. }
            | Self::NotAssociated
            | Self::InvalidState(_)
            | Self::UnexpectedResponse { .. }
            | Self::Protocol(_)
            | Self::SequenceExhausted => ErrorSeverity::Error,
            Self::AssociationFailed { .. }
            | Self::AssociationLost
            | Self::InvalidRuleConfig(_)
            | Self::InvalidConfig(_)
            | Self::Io(_) => ErrorSeverity::Critical,
            Self::ShuttingDown => ErrorSeverity::Info,
        }
    }

    /// Harness bug rather than a network or peer condition
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::InvalidRuleConfig(_) | Self::InvalidConfig(_))
    }

    /// Check if the operation may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimedOut { .. } | Self::SessionBusy(_) | Self::SequenceExhausted
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_rules::RuleKind;

    #[test]
    fn test_io_keeps_its_variant() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy");
        let err: ClientError = PfcpsimError::Io(io).into();
        assert!(matches!(err, ClientError::Io(_)));

        let err: ClientError = PfcpsimError::MissingIe(19).into();
        assert!(matches!(err, ClientError::Protocol(PfcpsimError::MissingIe(19))));
    }

    #[test]
    fn test_programmer_error() {
        let err: ClientError = RuleError::InvalidRuleConfig {
            rule: RuleKind::Far,
            id: 0,
            reason: "tried building FAR without setting an ID".to_string(),
        }
        .into();
        assert!(err.is_programmer_error());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!ClientError::AssociationLost.is_programmer_error());
    }

    #[test]
    fn test_rejection_display() {
        let err = ClientError::SessionRejected {
            cause: Cause::RULE_CREATION_MODIFICATION_FAILURE,
        };
        assert!(err.to_string().contains("(73)"));
        assert!(!err.is_retryable());
    }
}
