//! Runtime-free state of the PFCP client: sequence numbers, the association
//! state machine, session lifecycle and retransmission bookkeeping.

pub mod association;
pub mod pending;
pub mod sequence;
pub mod session;

pub use association::{
    AssociationAction, AssociationEvent, AssociationFsm, AssociationState, InvalidTransition,
};
pub use pending::{Backoff, PendingRequest, RetryPolicy};
pub use sequence::{SequenceAllocator, SequenceExhausted};
pub use session::{RuleSet, Session, SessionState, TransitionError};
