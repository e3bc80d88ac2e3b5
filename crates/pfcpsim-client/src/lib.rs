//! Asynchronous PFCP client: association, heartbeat and session operations
//! over a single UDP socket.

pub mod client;
pub mod config;
pub mod error;

mod association;
mod session;
mod store;

pub use client::{ClientEvent, PfcpClient};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use session::SessionSpec;

pub use pfcpsim_client_core::{AssociationState, Backoff, RetryPolicy, Session, SessionState};
