//! Control surface of the PFCP simulator.
//!
//! [`PfcpSimService`] owns one [`pfcpsim_client::PfcpClient`] at a time and
//! turns operator requests into rule builder calls.

pub mod error;
pub mod plan;
pub mod service;
pub mod settings;

pub use error::ServiceError;
pub use service::PfcpSimService;
pub use settings::client_config;
