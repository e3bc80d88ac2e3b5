use thiserror::Error;

/// Main error type for the PFCP codec and transport
#[derive(Error, Debug)]
pub enum PfcpsimError {
    // ========================================
    // Codec Errors
    // ========================================
    #[error("Buffer too short: needed {needed} bytes, {available} available")]
    BufferTooShort { needed: usize, available: usize },

    #[error("Unsupported PFCP version: {0}")]
    VersionNotSupported(u8),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("Invalid PFCP packet: {0}")]
    InvalidPacket(String),

    // ========================================
    // IE Errors
    // ========================================
    #[error("Missing mandatory IE: {0}")]
    MissingIe(u16),

    #[error("Invalid value for IE {ie_type}: {reason}")]
    InvalidIeValue { ie_type: u16, reason: String },

    #[error("Expected IE {expected}, found {found}")]
    UnexpectedIe { expected: u16, found: u16 },

    // ========================================
    // Network Errors
    // ========================================
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl PfcpsimError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::BufferTooShort { .. }
            | Self::UnknownMessageType(_)
            | Self::InvalidPacket(_)
            | Self::UnexpectedIe { .. } => ErrorSeverity::Warning,
            Self::VersionNotSupported(_) | Self::MissingIe(_) | Self::InvalidIeValue { .. } => {
                ErrorSeverity::Error
            }
            Self::Io(_) => ErrorSeverity::Critical,
            Self::InvalidAddress(_) => ErrorSeverity::Error,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Result type alias for codec and transport operations
pub type Result<T> = std::result::Result<T, PfcpsimError>;
