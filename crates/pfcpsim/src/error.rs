use std::net::SocketAddr;

use pfcpsim_client::ClientError;
use pfcpsim_config::ConfigError;
use pfcpsim_proto::StatusCode;
use pfcpsim_rules::RuleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not associated, call associate first")]
    NotAssociated,

    #[error("Already associated with {0}")]
    AlreadyAssociated(SocketAddr),

    #[error("Session {0} not found")]
    SessionNotFound(u32),

    #[error("Session {0} already exists")]
    SessionExists(u32),

    #[error("UE address pool {0} exhausted")]
    PoolExhausted(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) | Self::Rule(_) => StatusCode::InvalidArgument,
            Self::NotAssociated => StatusCode::FailedPrecondition,
            Self::AlreadyAssociated(_) | Self::SessionExists(_) => StatusCode::AlreadyExists,
            Self::SessionNotFound(_) => StatusCode::NotFound,
            Self::PoolExhausted(_) => StatusCode::ResourceExhausted,
            Self::Client(e) => client_status(e),
        }
    }
}

fn client_status(err: &ClientError) -> StatusCode {
    match err {
        ClientError::NotAssociated | ClientError::InvalidState(_) => StatusCode::FailedPrecondition,
        ClientError::AssociationFailed { .. }
        | ClientError::AssociationLost
        | ClientError::ShuttingDown => StatusCode::Unavailable,
        ClientError::SessionRejected { .. } | ClientError::SessionBusy(_) => StatusCode::Aborted,
        ClientError::RequestTimedOut { .. } => StatusCode::DeadlineExceeded,
        ClientError::SessionNotFound(_) => StatusCode::NotFound,
        ClientError::SequenceExhausted => StatusCode::ResourceExhausted,
        ClientError::InvalidRuleConfig(_) | ClientError::InvalidConfig(_) => {
            StatusCode::InvalidArgument
        }
        ClientError::Protocol(_) | ClientError::Io(_) | ClientError::UnexpectedResponse { .. } => {
            StatusCode::Internal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcpsim_core::Cause;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::SessionNotFound(3).status_code(),
            StatusCode::NotFound
        );
        assert_eq!(
            ServiceError::from(ClientError::RequestTimedOut {
                sequence: 1,
                attempts: 4
            })
            .status_code(),
            StatusCode::DeadlineExceeded
        );
        assert_eq!(
            ServiceError::from(ClientError::SessionRejected {
                cause: Cause::RULE_CREATION_MODIFICATION_FAILURE
            })
            .status_code(),
            StatusCode::Aborted
        );
        assert_eq!(
            ServiceError::from(ClientError::AssociationLost).status_code(),
            StatusCode::Unavailable
        );
    }
}
