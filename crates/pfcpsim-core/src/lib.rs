// Error types module
pub mod error;

// PFCP wire codec
pub mod header;
pub mod ie;
pub mod packet;

// Typed IE values and message constructors
pub mod types;
pub mod message;

// Datagram transport abstraction
pub mod transport;

// Re-export commonly used types
pub use error::{ErrorSeverity, PfcpsimError, Result};
pub use header::{MessageType, PfcpHeader};
pub use packet::PfcpPacket;
pub use transport::Transport;
pub use types::{
    ApplyAction, Bitrate, Cause, FSeid, FTeid, Gate, GateStatus, Interface, NodeId,
    OuterHeaderCreation, PdnType, RecoveryTimeStamp, SdfFilter, UeIpAddress,
};
pub use pfcpsim_shared::{Ie, IeValue};
